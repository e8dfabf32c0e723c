use anyhow::Result;
use log::info;

use crate::{
    history::ReadingHistoryStore,
    model::{parse_chapter_number, HistoryWork, ReadingHistoryEntry, WorkId},
    source::{model::HasRelationships, MangaSource, SourceError},
    util::{display_title, resolve_cover_url, UNTITLED},
};

pub fn get_reading_history(store: &ReadingHistoryStore) -> Vec<ReadingHistoryEntry> {
    store.entries()
}

pub fn add_to_reading_history(
    store: &ReadingHistoryStore,
    work: HistoryWork,
    chapter: f64,
) -> Result<Vec<ReadingHistoryEntry>> {
    store.add(work, chapter)
}

pub fn clear_reading_history(store: &ReadingHistoryStore) -> Result<()> {
    store.clear()
}

/// Marks a chapter as read: looks up the work it belongs to and that work's
/// cover, then moves the work to the top of the reading history.
pub async fn record_chapter_read<S: MangaSource + ?Sized>(
    source: &S,
    store: &ReadingHistoryStore,
    chapter_id: &str,
) -> Result<ReadingHistoryEntry, Error> {
    let chapter = source
        .get_chapter(chapter_id)
        .await
        .map_err(Error::SourceError)?;
    let manga_id = chapter
        .relationship("manga")
        .map(|relationship| relationship.id.clone())
        .ok_or_else(|| Error::MissingWork(chapter_id.to_owned()))?;
    let manga = source
        .get_manga(&manga_id)
        .await
        .map_err(Error::SourceError)?;

    let cover_url = resolve_cover_url(source, &manga).await;
    let number = chapter
        .attributes
        .chapter
        .as_deref()
        .and_then(parse_chapter_number)
        .unwrap_or_default();

    info!("recording chapter {chapter_id} ({number}) of {manga_id} as read");

    let work_id = WorkId::new(manga_id);
    let work = HistoryWork {
        work_id: work_id.clone(),
        title: display_title(&manga, &["en"]).unwrap_or_else(|| UNTITLED.to_owned()),
        cover_url: cover_url.map(String::from).unwrap_or_default(),
    };

    let entries = store
        .add(work, number)
        .map_err(|e| Error::StorageError(e.into()))?;

    entries
        .into_iter()
        .find(|entry| entry.work_id == work_id)
        .ok_or_else(|| Error::MissingWork(chapter_id.to_owned()))
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("an error occurred while fetching the chapter's work from the source")]
    SourceError(#[source] SourceError),
    #[error("chapter {0} does not belong to any work")]
    MissingWork(String),
    #[error("an error occurred while saving the reading history")]
    StorageError(#[source] Box<dyn std::error::Error + Send + Sync>),
}
