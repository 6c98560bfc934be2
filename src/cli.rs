use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chaptervault")]
#[command(about = "Download, store and tag manga chapters", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a chapter and write its ComicInfo.xml
    Download(JobArgs),
    /// Rewrite ComicInfo.xml of an already stored chapter
    Package(JobArgs),
    /// Delete a stored chapter
    Delete(JobArgs),
    /// Write a stored chapter out as a .cbz
    Export(ExportArgs),
    /// Move a manga's stored chapters after its title changed
    Rename(RenameArgs),
    /// AniList metadata cache
    #[command(subcommand)]
    Metadata(MetadataCommand),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct JobArgs {
    /// JSON file holding `{"manga": {...}, "chapter": {...}}`
    #[arg(long)]
    pub job: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub job: JobArgs,
    /// Directory the archive is written into
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct RenameArgs {
    #[command(flatten)]
    pub job: JobArgs,
    /// New manga title
    #[arg(long)]
    pub title: String,
}

#[derive(Subcommand, Debug)]
pub enum MetadataCommand {
    /// Look up a series on AniList (cache first)
    Lookup(LookupArgs),
    /// Show cache statistics
    Stats,
    /// Drop every cached entry
    Clear,
}

#[derive(clap::Args, Debug)]
pub struct LookupArgs {
    /// AniList media ID
    #[arg(long, conflicts_with = "title", required_unless_present = "title")]
    pub id: Option<i64>,
    /// Series title
    #[arg(long)]
    pub title: Option<String>,
    /// Manga URL, matched like a download would (ID in URL, then title)
    #[arg(long, requires = "title")]
    pub url: Option<String>,
}
