use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::{
    clock::Clock,
    model::{HistoryWork, ReadingHistoryEntry},
};

/// Key the history is stored under; the file is `<key>.json` in the data directory.
pub const HISTORY_KEY: &str = "manga_reading_history";
pub const MAX_HISTORY_ITEMS: usize = 10;

/// The most recently read works, newest first, persisted as one JSON array.
pub struct ReadingHistoryStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl ReadingHistoryStore {
    pub fn new(data_dir: &Path, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: data_dir.join(format!("{HISTORY_KEY}.json")),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored entries, most recent first. Content that cannot be read back is
    /// treated as an empty history.
    pub fn entries(&self) -> Vec<ReadingHistoryEntry> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return vec![],
            Err(e) => {
                warn!("could not read reading history at {}: {}", self.path.display(), e);
                return vec![];
            }
        };

        match serde_json::from_slice::<Vec<ReadingHistoryEntry>>(&contents) {
            Ok(mut entries) => {
                sort_most_recent_first(&mut entries);
                entries
            }
            Err(e) => {
                warn!("ignoring unreadable reading history at {}: {}", self.path.display(), e);
                vec![]
            }
        }
    }

    /// Records that `chapter` of `work` was just read. An existing entry for the
    /// work is replaced; past the cap the oldest entries are dropped.
    pub fn add(&self, work: HistoryWork, chapter: f64) -> Result<Vec<ReadingHistoryEntry>> {
        let mut entries = self.entries();
        entries.retain(|entry| entry.work_id != work.work_id);
        // front of the list, so it stays ahead of entries read at the same instant
        entries.insert(
            0,
            ReadingHistoryEntry {
                work_id: work.work_id,
                title: work.title,
                cover_url: work.cover_url,
                last_read_chapter: chapter,
                last_read_time: self.clock.now(),
            },
        );

        sort_most_recent_first(&mut entries);
        if entries.len() > MAX_HISTORY_ITEMS {
            debug!(
                "dropping {} oldest reading history entries",
                entries.len() - MAX_HISTORY_ITEMS
            );
            entries.truncate(MAX_HISTORY_ITEMS);
        }

        self.write(&entries)?;

        Ok(entries)
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("while clearing reading history at {}", self.path.display())),
        }
    }

    fn write(&self, entries: &[ReadingHistoryEntry]) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("while creating {}", parent.display()))?;

        let mut file = NamedTempFile::new_in(parent)?;
        serde_json::to_writer(&mut file, entries)?;
        file.flush()?;
        file.persist(&self.path)
            .with_context(|| format!("while saving reading history to {}", self.path.display()))?;

        Ok(())
    }
}

fn sort_most_recent_first(entries: &mut [ReadingHistoryEntry]) {
    entries.sort_by(|a, b| b.last_read_time.cmp(&a.last_read_time));
}
