use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{Arc, Mutex, PoisonError},
};

use futures::future::join_all;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    cache::ResultCache,
    model::TrendingManga,
    source::{model::MangaData, MangaSource, SourceError},
    util::{display_title, resolve_cover_url, UNTITLED},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendingPeriod {
    Today,
    Weekly,
    Monthly,
    AllTime,
}

impl TrendingPeriod {
    pub fn days_ago(self) -> u32 {
        match self {
            Self::Today => 3,
            Self::Weekly => 7,
            Self::Monthly => 60,
            Self::AllTime => 365,
        }
    }
}

impl fmt::Display for TrendingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Today => "today",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::AllTime => "all-time",
        };

        f.write_str(name)
    }
}

impl FromStr for TrendingPeriod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "all-time" | "all_time" | "all time" => Ok(Self::AllTime),
            other => Err(format!("unknown trending period `{other}`")),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TrendingList {
    pub mangas: Vec<TrendingManga>,
    pub error: Option<Error>,
}

pub struct TrendingAggregator<S> {
    source: Arc<S>,
    covers: Arc<ResultCache<Url>>,
    last_good: Mutex<HashMap<TrendingPeriod, Vec<TrendingManga>>>,
}

impl<S: MangaSource> TrendingAggregator<S> {
    pub fn new(source: Arc<S>, covers: Arc<ResultCache<Url>>) -> Self {
        Self {
            source,
            covers,
            last_good: Mutex::default(),
        }
    }

    pub async fn fetch_trending(&self, period: TrendingPeriod) -> TrendingList {
        match self.source.get_trending_mangas(period.days_ago()).await {
            Ok(mangas) => {
                let mangas = join_all(mangas.iter().map(|manga| self.to_trending_manga(manga))).await;

                self.last_good
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(period, mangas.clone());

                TrendingList {
                    mangas,
                    error: None,
                }
            }
            Err(e) => {
                warn!("failed to fetch {period} trending mangas: {e}");

                let mangas = self
                    .last_good
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(&period)
                    .cloned()
                    .unwrap_or_default();

                TrendingList {
                    mangas,
                    error: Some(Error::from_source(e)),
                }
            }
        }
    }

    async fn to_trending_manga(&self, manga: &MangaData) -> TrendingManga {
        let cover_url = match self.covers.get(&manga.id) {
            Some(entry) => {
                debug!("fetch_trending: cover cache hit for {}", manga.id);
                Some(entry.data)
            }
            None => {
                let cover_url = resolve_cover_url(self.source.as_ref(), manga).await;
                if let Some(url) = &cover_url {
                    self.covers.set(manga.id.as_str(), url.clone());
                }

                cover_url
            }
        };

        TrendingManga {
            id: manga.id.clone(),
            title: display_title(manga, &["vi", "en"]).unwrap_or_else(|| UNTITLED.to_owned()),
            cover_url,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("the server is having trouble right now, please try again later")]
    ServerError(#[source] SourceError),
    #[error("an error occurred while fetching trending mangas from the source")]
    SourceError(#[source] SourceError),
}

impl Error {
    fn from_source(e: SourceError) -> Self {
        match e.status() {
            Some(500) => Self::ServerError(e),
            _ => Self::SourceError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::TimeDelta;
    use serde_json::json;

    use super::*;
    use crate::{
        clock::ManualClock,
        test_support::{manga, FakeSource},
    };

    fn aggregator(source: &Arc<FakeSource>) -> TrendingAggregator<FakeSource> {
        let clock = Arc::new(ManualClock::default());
        let covers = Arc::new(ResultCache::new(clock, 16, TimeDelta::hours(1)));

        TrendingAggregator::new(source.clone(), covers)
    }

    #[test]
    fn test_period_windows() {
        assert_eq!(TrendingPeriod::Today.days_ago(), 3);
        assert_eq!(TrendingPeriod::Weekly.days_ago(), 7);
        assert_eq!(TrendingPeriod::Monthly.days_ago(), 60);
        assert_eq!(TrendingPeriod::AllTime.days_ago(), 365);
        assert_eq!("all time".parse::<TrendingPeriod>(), Ok(TrendingPeriod::AllTime));
        assert!("yearly".parse::<TrendingPeriod>().is_err());
    }

    #[tokio::test]
    async fn test_titles_prefer_vietnamese_then_english() {
        let source = Arc::new(FakeSource::default());
        source.set_trending(Ok(vec![
            manga("m1", json!({"en": "Attack", "vi": "Tấn công"}), None),
            manga("m2", json!({"en": "Frieren", "ja": "Furīren"}), None),
            manga("m3", json!({"ja": "Nisekoi"}), None),
            manga("m4", json!({}), None),
        ]));
        let aggregator = aggregator(&source);

        let list = aggregator.fetch_trending(TrendingPeriod::Weekly).await;

        let titles: Vec<_> = list.mangas.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["Tấn công", "Frieren", "Nisekoi", "Untitled"]);
    }

    #[tokio::test]
    async fn test_cached_covers_are_not_looked_up_again() {
        let source = Arc::new(FakeSource::default());
        source.set_trending(Ok(vec![
            manga("m1", json!({"en": "A"}), Some("c1")),
            manga("m2", json!({"en": "B"}), Some("missing")),
        ]));
        source.add_cover("c1", "a.jpg");
        let aggregator = aggregator(&source);

        let first = aggregator.fetch_trending(TrendingPeriod::Today).await;
        assert_eq!(source.cover_calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            first.mangas[0].cover_url.as_ref().map(|u| u.as_str()),
            Some("https://covers.test/m1/a.jpg")
        );
        assert!(first.mangas[1].cover_url.is_none());

        let second = aggregator.fetch_trending(TrendingPeriod::Monthly).await;
        // m1 comes from the cover cache, m2 is retried
        assert_eq!(source.cover_calls.load(Ordering::SeqCst), 3);
        assert_eq!(second.mangas[0].cover_url, first.mangas[0].cover_url);
    }

    #[tokio::test]
    async fn test_failure_keeps_the_last_list_of_that_period() {
        let source = Arc::new(FakeSource::default());
        source.set_trending(Ok(vec![manga("m1", json!({"en": "A"}), None)]));
        let aggregator = aggregator(&source);

        aggregator.fetch_trending(TrendingPeriod::Weekly).await;
        source.set_trending(Err(500));

        let weekly = aggregator.fetch_trending(TrendingPeriod::Weekly).await;
        assert_eq!(weekly.mangas.len(), 1);
        assert!(matches!(weekly.error, Some(Error::ServerError(_))));

        let monthly = aggregator.fetch_trending(TrendingPeriod::Monthly).await;
        assert!(monthly.mangas.is_empty());
        assert!(matches!(monthly.error, Some(Error::ServerError(_))));
    }

    #[tokio::test]
    async fn test_other_statuses_are_source_errors() {
        let source = Arc::new(FakeSource::default());
        source.set_trending(Err(502));
        let aggregator = aggregator(&source);

        let list = aggregator.fetch_trending(TrendingPeriod::AllTime).await;

        assert!(matches!(list.error, Some(Error::SourceError(_))));
        assert_eq!(source.trending_calls.load(Ordering::SeqCst), 1);
    }
}
