use std::{collections::HashSet, sync::Arc};

use chrono::TimeDelta;
use log::{debug, warn};
use ordered_float::OrderedFloat;

use crate::{
    cache::ResultCache,
    model::{ChapterListing, ChapterRecord, WorkId},
    source::{
        model::{AggregateChapter, AggregateDocument},
        MangaSource, SourceError,
    },
};

/// Result of a chapter list fetch. `error` being set does not mean `records` is
/// empty: the last good listing is kept visible when a refresh fails.
#[derive(Clone, Debug, Default)]
pub struct ChapterList {
    pub records: Vec<ChapterRecord>,
    pub raw: Option<AggregateDocument>,
    pub error: Option<Error>,
}

pub struct ChapterAggregator<S> {
    source: Arc<S>,
    cache: Arc<ResultCache<ChapterListing>>,
    freshness: TimeDelta,
}

impl<S: MangaSource> ChapterAggregator<S> {
    pub fn new(source: Arc<S>, cache: Arc<ResultCache<ChapterListing>>, freshness: TimeDelta) -> Self {
        Self {
            source,
            cache,
            freshness,
        }
    }

    pub async fn fetch_chapters(&self, work_id: &WorkId, language: &str) -> ChapterList {
        self.load(work_id, language, false).await
    }

    /// Same as [`ChapterAggregator::fetch_chapters`] but always goes to the network.
    pub async fn refetch(&self, work_id: &WorkId, language: &str) -> ChapterList {
        self.load(work_id, language, true).await
    }

    /// Whatever is cached for the key, fresh or not, without touching the network.
    pub fn cached(&self, work_id: &WorkId, language: &str) -> Option<ChapterListing> {
        self.cache
            .get(&cache_key(work_id, language))
            .map(|entry| entry.data)
    }

    async fn load(&self, work_id: &WorkId, language: &str, force: bool) -> ChapterList {
        if work_id.is_empty() {
            return ChapterList::default();
        }

        let key = cache_key(work_id, language);
        let cached = self.cache.get(&key);

        if let Some(entry) = &cached {
            if !force && self.cache.is_fresh(entry, self.freshness) {
                debug!("fetch_chapters: cache hit for `{key}`");

                return ChapterList {
                    records: entry.data.records.clone(),
                    raw: Some(entry.data.raw.clone()),
                    error: None,
                };
            }
        }

        match self
            .source
            .get_chapter_aggregate(work_id.value(), language)
            .await
        {
            Ok(document) => {
                let records = flatten_aggregate(&document);
                self.cache.set(
                    key,
                    ChapterListing {
                        raw: document.clone(),
                        records: records.clone(),
                    },
                );

                ChapterList {
                    records,
                    raw: Some(document),
                    error: None,
                }
            }
            Err(e) => {
                warn!("failed to fetch chapters for {}: {}", work_id.value(), e);

                let (records, raw) = cached
                    .map(|entry| (entry.data.records, Some(entry.data.raw)))
                    .unwrap_or_default();

                ChapterList {
                    records,
                    raw,
                    error: Some(Error::SourceError(e)),
                }
            }
        }
    }
}

pub fn cache_key(work_id: &WorkId, language: &str) -> String {
    format!("{}-{}", work_id.value(), language)
}

/// Flattens the volume -> chapter document into one record per chapter label.
///
/// Volumes and chapters are visited in payload order and the first record seen
/// for a label wins. The result is ordered by numeric chapter value; labels
/// without one (e.g. `"Extra"`) go last, keeping their first-seen order.
pub fn flatten_aggregate(document: &AggregateDocument) -> Vec<ChapterRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for (volume_key, bucket) in document.volumes.iter() {
        let volume_label = bucket.volume.as_deref().unwrap_or(volume_key);

        for (chapter_key, value) in bucket.chapters.iter() {
            if seen.contains(chapter_key.as_str()) {
                continue;
            }

            let chapter = match serde_json::from_value::<AggregateChapter>(value.clone()) {
                Ok(chapter) => chapter,
                Err(e) => {
                    warn!("skipping malformed chapter `{chapter_key}` in volume `{volume_key}`: {e}");
                    continue;
                }
            };

            seen.insert(chapter_key.as_str());
            records.push(ChapterRecord::from_aggregate(
                chapter_key,
                Some(volume_label),
                chapter,
            ));
        }
    }

    // stable: equal numbers and unnumbered labels keep traversal order
    records.sort_by_key(|record| {
        (
            record.numeric_chapter_value.is_none(),
            record.numeric_chapter_value.map(OrderedFloat),
        )
    });

    records
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("an error occurred while fetching the chapter list from the source")]
    SourceError(#[source] SourceError),
}
