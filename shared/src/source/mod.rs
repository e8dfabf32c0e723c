use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::TimeDelta;
use log::debug;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use url::Url;

use crate::{clock::Clock, settings::Settings};

use self::model::{
    AggregateDocument, AtHomeServer, ChapterData, Collection, CoverData, Entity, MangaData,
};

pub mod model;

const USER_AGENT: &str = concat!("manga-reader/", env!("CARGO_PKG_VERSION"));
const TRENDING_LIMIT: &str = "10";

/// The upstream catalog everything else is built on.
///
/// Implementations only translate requests and responses; caching, deduplication
/// and degradation all live in the use-cases.
#[async_trait]
pub trait MangaSource: Send + Sync {
    async fn get_chapter_aggregate(
        &self,
        work_id: &str,
        language: &str,
    ) -> Result<AggregateDocument, SourceError>;

    async fn search_mangas(&self, title: &str, limit: usize) -> Result<Vec<MangaData>, SourceError>;

    async fn get_cover(&self, cover_id: &str) -> Result<CoverData, SourceError>;

    async fn get_trending_mangas(&self, days_ago: u32) -> Result<Vec<MangaData>, SourceError>;

    async fn get_chapter(&self, chapter_id: &str) -> Result<ChapterData, SourceError>;

    async fn get_manga(&self, work_id: &str) -> Result<MangaData, SourceError>;

    async fn get_at_home_server(&self, chapter_id: &str) -> Result<AtHomeServer, SourceError>;

    fn cover_image_url(&self, work_id: &str, file_name: &str) -> Option<Url>;
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum SourceError {
    #[error("request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: Arc<reqwest::Error>,
    },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("unexpected response body from {url}")]
    Malformed {
        url: String,
        #[source]
        source: Arc<serde_json::Error>,
    },
}

impl SourceError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub struct HttpSource {
    client: Client,
    clock: Arc<dyn Clock>,
    api_base_url: Url,
    covers_base_url: Url,
    proxy_base_url: Option<Url>,
}

impl HttpSource {
    pub fn new(settings: &Settings, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers);
        if let Some(seconds) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(seconds));
        }

        let client = builder
            .build()
            .context("while building the upstream HTTP client")?;

        Ok(Self {
            client,
            clock,
            api_base_url: settings.api_base_url.clone(),
            covers_base_url: settings.covers_base_url.clone(),
            proxy_base_url: settings.proxy_base_url.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        debug!("GET {url}");

        let network_error = |source| SourceError::Network {
            url: url.to_string(),
            source: Arc::new(source),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(network_error)?;

        serde_json::from_slice(&body).map_err(|source| SourceError::Malformed {
            url: url.to_string(),
            source: Arc::new(source),
        })
    }
}

#[async_trait]
impl MangaSource for HttpSource {
    async fn get_chapter_aggregate(
        &self,
        work_id: &str,
        language: &str,
    ) -> Result<AggregateDocument, SourceError> {
        let mut url = endpoint(&self.api_base_url, &["manga", work_id, "aggregate"]);
        url.query_pairs_mut()
            .append_pair("translatedLanguage[]", language);

        self.get_json(url).await
    }

    async fn search_mangas(&self, title: &str, limit: usize) -> Result<Vec<MangaData>, SourceError> {
        let mut url = endpoint(&self.api_base_url, &["manga"]);
        url.query_pairs_mut()
            .append_pair("title", title)
            .append_pair("limit", &limit.to_string());

        let collection: Collection<MangaData> = self.get_json(url).await?;

        Ok(collection.data)
    }

    async fn get_cover(&self, cover_id: &str) -> Result<CoverData, SourceError> {
        let url = match &self.proxy_base_url {
            Some(proxy) => endpoint(proxy, &["api", "mangadex", cover_id, "cover"]),
            None => endpoint(&self.api_base_url, &["cover", cover_id]),
        };

        let entity: Entity<CoverData> = self.get_json(url).await?;

        Ok(entity.data)
    }

    async fn get_trending_mangas(&self, days_ago: u32) -> Result<Vec<MangaData>, SourceError> {
        let url = match &self.proxy_base_url {
            Some(proxy) => {
                let mut url = endpoint(proxy, &["api", "mangadex", "trending"]);
                url.query_pairs_mut()
                    .append_pair("daysAgo", &days_ago.to_string());
                url
            }
            None => {
                let since = self.clock.now() - TimeDelta::days(days_ago.into());
                let mut url = endpoint(&self.api_base_url, &["manga"]);
                url.query_pairs_mut()
                    .append_pair("limit", TRENDING_LIMIT)
                    .append_pair("order[followedCount]", "desc")
                    .append_pair(
                        "createdAtSince",
                        &since.format("%Y-%m-%dT%H:%M:%S").to_string(),
                    )
                    .append_pair("hasAvailableChapters", "true");
                url
            }
        };

        let collection: Collection<MangaData> = self.get_json(url).await?;

        Ok(collection.data)
    }

    async fn get_chapter(&self, chapter_id: &str) -> Result<ChapterData, SourceError> {
        let url = endpoint(&self.api_base_url, &["chapter", chapter_id]);
        let entity: Entity<ChapterData> = self.get_json(url).await?;

        Ok(entity.data)
    }

    async fn get_manga(&self, work_id: &str) -> Result<MangaData, SourceError> {
        let url = endpoint(&self.api_base_url, &["manga", work_id]);
        let entity: Entity<MangaData> = self.get_json(url).await?;

        Ok(entity.data)
    }

    async fn get_at_home_server(&self, chapter_id: &str) -> Result<AtHomeServer, SourceError> {
        let url = endpoint(&self.api_base_url, &["at-home", "server", chapter_id]);

        self.get_json(url).await
    }

    fn cover_image_url(&self, work_id: &str, file_name: &str) -> Option<Url> {
        if file_name.is_empty() {
            return None;
        }

        Some(endpoint(&self.covers_base_url, &[work_id, file_name]))
    }
}

/// Appends percent-encoded path segments to `base`, keeping any path it already has.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }

    url
}
