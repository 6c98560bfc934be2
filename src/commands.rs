use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::cli::{ExportArgs, JobArgs, LookupArgs, MetadataCommand, RenameArgs};
use chaptervault::downloader::DownloadUnit;
use chaptervault::metadata::Enrichment;
use chaptervault::records::{ChapterRecord, MangaRecord};
use chaptervault::state::AppState;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A manga/chapter pair as handed over by the persistence layer
#[derive(Debug, Deserialize)]
pub struct ChapterJob {
    pub manga: MangaRecord,
    pub chapter: ChapterRecord,
}

impl ChapterJob {
    pub async fn read(path: &Path) -> Result<Self, AnyError> {
        let raw = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

pub async fn download(state: &AppState, args: JobArgs) -> Result<(), AnyError> {
    let job = ChapterJob::read(&args.job).await?;
    let mut unit = DownloadUnit::for_chapter(&job.chapter);

    let mut progress = |unit: &DownloadUnit, finished: bool| {
        if finished {
            info!(chapter_id = unit.chapter_id, state = ?unit.state, "Download finished");
        } else {
            info!(
                chapter_id = unit.chapter_id,
                page = unit.completed_pages,
                total = unit.pages.len(),
                percent = (unit.progress() * 100.0).round(),
                "Page downloaded"
            );
        }
    };

    let ok = state
        .downloader
        .download(&job.manga, &job.chapter, &mut unit, &mut progress)
        .await;
    if !ok {
        return Err(format!(
            "download of chapter {} stopped after {} of {} pages",
            job.chapter.id,
            unit.completed_pages,
            unit.pages.len()
        )
        .into());
    }
    Ok(())
}

pub async fn package(state: &AppState, args: JobArgs) -> Result<(), AnyError> {
    let job = ChapterJob::read(&args.job).await?;
    state.downloader.package(&job.manga, &job.chapter).await;
    Ok(())
}

pub async fn delete(state: &AppState, args: JobArgs) -> Result<(), AnyError> {
    let job = ChapterJob::read(&args.job).await?;
    if !state.downloader.delete(&job.manga, &job.chapter).await? {
        warn!(chapter_id = job.chapter.id, "Nothing to delete");
    }
    Ok(())
}

pub async fn export(state: &AppState, args: ExportArgs) -> Result<(), AnyError> {
    let job = ChapterJob::read(&args.job.job).await?;
    let mut archive = state
        .downloader
        .archive_for_download(&job.manga, &job.chapter)
        .await?;

    tokio::fs::create_dir_all(&args.out).await?;
    let target = args.out.join(&archive.file_name);
    let mut file = tokio::fs::File::create(&target).await?;
    let written = tokio::io::copy(&mut archive.stream, &mut file).await?;

    info!(path = %target.display(), size = archive.size, written, "Exported chapter archive");
    Ok(())
}

pub async fn rename(state: &AppState, args: RenameArgs) -> Result<(), AnyError> {
    let job = ChapterJob::read(&args.job.job).await?;
    if !state.downloader.rename_manga(&job.manga, &args.title).await? {
        warn!(manga_id = job.manga.id, "Manga folder not moved");
    }
    Ok(())
}

pub async fn metadata(state: &AppState, command: MetadataCommand) -> Result<(), AnyError> {
    match command {
        MetadataCommand::Lookup(args) => lookup(state, args).await,
        MetadataCommand::Stats => {
            let stats = state.enricher.cache_stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        MetadataCommand::Clear => {
            state.enricher.clear_cache().await;
            Ok(())
        }
    }
}

async fn lookup(state: &AppState, args: LookupArgs) -> Result<(), AnyError> {
    let (record, confidence) = match (args.id, args.title) {
        (Some(id), _) => (state.enricher.lookup_by_id(id).await, None),
        (None, Some(title)) => {
            let url = args.url.unwrap_or_default();
            match state.enricher.find_match(&url, &title).await {
                Enrichment::Matched(m) => (Some(m.record), Some(m.confidence)),
                Enrichment::Unavailable => (None, None),
            }
        }
        (None, None) => return Err("either --id or --title is required".into()),
    };

    let Some(record) = record else {
        return Err("no AniList match".into());
    };
    if let Some(confidence) = confidence {
        info!(
            anilist_id = record.id,
            title = record.display_title().unwrap_or_default(),
            confidence = confidence.as_str(),
            "AniList match"
        );
    }
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub fn show_config(state: &AppState) -> Result<(), AnyError> {
    println!("{}", toml::to_string_pretty(state.config.as_ref())?);
    Ok(())
}
