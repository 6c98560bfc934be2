use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Folder name template '{field}' must not be empty")]
    EmptyTemplate { field: String },

    #[error("Metadata cache retention must be positive: cache_retention_days = {0}")]
    InvalidRetention(u32),

    #[error("cache_root must differ from downloads_root ({0})")]
    CacheRootIsDownloadsRoot(String),

    #[error("Folder name template '{field}' must contain one of {expected}")]
    MissingPlaceholder { field: String, expected: String },

    #[error("Metadata endpoint must be an http(s) URL: {0}")]
    InvalidEndpoint(String),

    #[error("default_uncertain_action must be 'skip' or 'use', got '{0}'")]
    InvalidUncertainAction(String),
}

/// Placeholders that tell chapters of one manga apart
const CHAPTER_PLACEHOLDERS: &[&str] = &["{name}", "{number}", "{number_padded}", "{number_padded3}"];
const MANGA_PLACEHOLDERS: &[&str] = &["{title}"];

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_templates(config)?;
    validate_paths(config)?;
    validate_metadata(config)?;
    Ok(())
}

fn validate_templates(config: &Config) -> Result<(), ValidationError> {
    let templates = [
        ("manga_folder_format", &config.downloads.manga_folder_format),
        ("chapter_folder_format", &config.downloads.chapter_folder_format),
        ("cbz_file_format", &config.downloads.cbz_file_format),
    ];

    for (field, template) in templates {
        if template.trim().is_empty() {
            return Err(ValidationError::EmptyTemplate {
                field: field.to_string(),
            });
        }
    }

    let required = [
        ("manga_folder_format", &config.downloads.manga_folder_format, MANGA_PLACEHOLDERS),
        ("chapter_folder_format", &config.downloads.chapter_folder_format, CHAPTER_PLACEHOLDERS),
        ("cbz_file_format", &config.downloads.cbz_file_format, CHAPTER_PLACEHOLDERS),
    ];

    for (field, template, placeholders) in required {
        if !placeholders.iter().any(|p| template.contains(p)) {
            return Err(ValidationError::MissingPlaceholder {
                field: field.to_string(),
                expected: placeholders.join(", "),
            });
        }
    }
    Ok(())
}

/// Staging under the downloads root would make half-fetched archives look like folders
fn validate_paths(config: &Config) -> Result<(), ValidationError> {
    if config.paths.cache_root == config.paths.downloads_root {
        return Err(ValidationError::CacheRootIsDownloadsRoot(
            config.paths.downloads_root.display().to_string(),
        ));
    }
    Ok(())
}

fn validate_metadata(config: &Config) -> Result<(), ValidationError> {
    if config.metadata.cache_retention_days == 0 {
        return Err(ValidationError::InvalidRetention(0));
    }

    let action = config.metadata.default_uncertain_action.trim();
    if !(action.eq_ignore_ascii_case("skip") || action.eq_ignore_ascii_case("use")) {
        return Err(ValidationError::InvalidUncertainAction(action.to_string()));
    }

    let endpoint = &config.metadata.endpoint;
    if config.metadata.use_anilist
        && !(endpoint.starts_with("https://") || endpoint.starts_with("http://"))
    {
        return Err(ValidationError::InvalidEndpoint(endpoint.clone()));
    }
    Ok(())
}
