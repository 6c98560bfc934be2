use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "CHAPTERVAULT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/chaptervault.toml";
const ENV_PREFIX: &str = "CHAPTERVAULT";
const ENV_SEPARATOR: &str = "__";

/// File named by `CHAPTERVAULT_CONFIG`, else `config/chaptervault.toml`
pub fn config_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Layer the sources, lowest priority first:
/// 1. Defaults (embedded in structs)
/// 2. TOML file at `config_path`, when present
/// 3. `CHAPTERVAULT__SECTION__KEY` variables, `.env` included
/// 4. `ANILIST_TOKEN`
pub fn load(config_path: PathBuf) -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();

    let mut builder = config::Config::builder();
    if config_path.exists() {
        tracing::info!(path = %config_path.display(), "Loading configuration");
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            path = %config_path.display(),
            "Configuration file not found, using defaults and environment overrides"
        );
    }

    // CHAPTERVAULT__DOWNLOADS__DOWNLOAD_AS_CBZ -> downloads.download_as_cbz
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let mut config: Config = builder.build()?.try_deserialize()?;
    if let Some(token) = env::var("ANILIST_TOKEN").ok().filter(|t| !t.trim().is_empty()) {
        config.metadata.token = Some(token);
    }
    Ok(config)
}
