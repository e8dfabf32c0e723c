use std::{sync::Arc, time::Duration};

use async_stream::stream;
use chrono::TimeDelta;
use futures::{future::join_all, Stream};
use log::{debug, warn};
use tokio::sync::watch;

use crate::{
    cache::ResultCache,
    model::SearchResult,
    source::{model::MangaData, MangaSource, SourceError},
    util::{display_title, resolve_cover_url},
};

#[derive(Clone, Debug, Default)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub error: Option<Error>,
}

#[derive(Clone, Debug)]
pub struct SearchUpdate {
    pub query: String,
    pub outcome: SearchOutcome,
}

pub struct SearchAggregator<S> {
    source: Arc<S>,
    cache: Arc<ResultCache<Vec<SearchResult>>>,
    freshness: TimeDelta,
    debounce: Duration,
    limit: usize,
}

impl<S: MangaSource> SearchAggregator<S> {
    pub fn new(
        source: Arc<S>,
        cache: Arc<ResultCache<Vec<SearchResult>>>,
        freshness: TimeDelta,
        debounce: Duration,
        limit: usize,
    ) -> Self {
        Self {
            source,
            cache,
            freshness,
            debounce,
            limit,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Searches works by title. The raw query is the cache key; results expire
    /// once they are older than the freshness window.
    pub async fn search(&self, query: &str) -> SearchOutcome {
        if query.trim().is_empty() {
            return SearchOutcome::default();
        }

        if let Some(results) = self.cache.take_fresh(query, self.freshness) {
            debug!("search: cache hit for `{query}`");

            return SearchOutcome {
                results,
                error: None,
            };
        }

        match self.source.search_mangas(query, self.limit).await {
            Ok(mangas) => {
                let results = join_all(mangas.iter().map(|manga| self.to_search_result(manga))).await;
                self.cache.set(query, results.clone());

                SearchOutcome {
                    results,
                    error: None,
                }
            }
            Err(e) => {
                warn!("failed to search mangas for `{query}`: {e}");

                SearchOutcome {
                    results: vec![],
                    error: Some(Error::SourceError(e)),
                }
            }
        }
    }

    /// Runs a search for every query that stays unchanged for the debounce
    /// interval. Edits arriving faster than that restart the wait, so typing
    /// never floods the source. Ends once the sender goes away.
    pub fn search_as_you_type(
        &self,
        mut queries: watch::Receiver<String>,
    ) -> impl Stream<Item = SearchUpdate> + '_ {
        stream! {
            let mut closed = false;

            while !closed {
                if queries.changed().await.is_err() {
                    break;
                }

                loop {
                    tokio::select! {
                        changed = queries.changed() => {
                            if changed.is_err() {
                                closed = true;
                                break;
                            }
                        }
                        _ = tokio::time::sleep(self.debounce) => break,
                    }
                }

                let query = queries.borrow_and_update().clone();
                let outcome = self.search(&query).await;

                yield SearchUpdate { query, outcome };
            }
        }
    }

    async fn to_search_result(&self, manga: &MangaData) -> SearchResult {
        let cover_url = resolve_cover_url(self.source.as_ref(), manga).await;

        SearchResult {
            id: manga.id.clone(),
            title: display_title(manga, &["en"]).unwrap_or_default(),
            cover_url,
            description: manga
                .attributes
                .description
                .pick(&["en"])
                .unwrap_or_default()
                .to_owned(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("an error occurred while fetching search results from the source")]
    SourceError(#[source] SourceError),
}
