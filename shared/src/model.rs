use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::source::model::{AggregateChapter, AggregateDocument};

/// Placeholder the upstream uses as the key for chapters/volumes without a label.
const UNLABELED: &str = "none";

#[derive(Clone, Eq, PartialEq, Hash, Deserialize, Debug, Serialize)]
#[serde(transparent)]
pub struct WorkId {
    work_id: String,
}

impl WorkId {
    pub fn new(value: String) -> Self {
        Self { work_id: value }
    }

    pub fn value(&self) -> &String {
        &self.work_id
    }

    pub fn is_empty(&self) -> bool {
        self.work_id.trim().is_empty()
    }
}

impl From<&str> for WorkId {
    fn from(value: &str) -> Self {
        Self::new(value.to_owned())
    }
}

/// One published chapter of a work in one language, after flattening.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterRecord {
    pub id: String,
    pub chapter_label: Option<String>,
    pub volume_label: Option<String>,
    /// Only used for ordering; several records may share a value.
    pub numeric_chapter_value: Option<f64>,
    /// Ids of alternative uploads (other scanlation groups) of the same chapter.
    pub others: Vec<String>,
    pub count: u32,
}

impl ChapterRecord {
    pub fn from_aggregate(key: &str, volume_label: Option<&str>, chapter: AggregateChapter) -> Self {
        let chapter_label = chapter
            .chapter
            .or_else(|| Some(key.to_owned()))
            .filter(|label| label != UNLABELED);
        let numeric_chapter_value = chapter_label.as_deref().and_then(parse_chapter_number);

        Self {
            id: chapter.id,
            chapter_label,
            volume_label: volume_label
                .filter(|label| *label != UNLABELED)
                .map(str::to_owned),
            numeric_chapter_value,
            others: chapter.others,
            count: chapter.count,
        }
    }
}

/// Parses a decimal chapter label such as `"12.5"`. Labels like `"Extra"` (and
/// non-finite values) have no numeric value.
pub fn parse_chapter_number(label: &str) -> Option<f64> {
    label
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// What the chapter list cache holds per `(work, language)`: the document as the
/// upstream sent it and the flattened records built from it.
#[derive(Clone, Debug, Default)]
pub struct ChapterListing {
    pub raw: AggregateDocument,
    pub records: Vec<ChapterRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub cover_url: Option<Url>,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingManga {
    pub id: String,
    pub title: String,
    pub cover_url: Option<Url>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingHistoryEntry {
    #[serde(alias = "mangaId")]
    pub work_id: WorkId,
    pub title: String,
    #[serde(alias = "manga_cover", default)]
    pub cover_url: String,
    pub last_read_chapter: f64,
    pub last_read_time: DateTime<Utc>,
}

/// The work being read, as handed to the history store.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryWork {
    pub work_id: WorkId,
    pub title: String,
    pub cover_url: String,
}
