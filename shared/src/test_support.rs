use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use crate::source::{
    model::{AggregateDocument, AtHomeServer, ChapterData, CoverData, MangaData},
    MangaSource, SourceError,
};

/// In-memory source. Unconfigured endpoints answer HTTP 404; `Err(code)` makes an
/// endpoint answer with that status.
#[derive(Default)]
pub struct FakeSource {
    pub aggregate_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub cover_calls: AtomicUsize,
    pub trending_calls: AtomicUsize,
    aggregate: Mutex<Option<Result<AggregateDocument, u16>>>,
    aggregate_delay: Mutex<Option<Duration>>,
    search: Mutex<Option<Result<Vec<MangaData>, u16>>>,
    trending: Mutex<Option<Result<Vec<MangaData>, u16>>>,
    covers: Mutex<HashMap<String, String>>,
    chapters: Mutex<HashMap<String, ChapterData>>,
    mangas: Mutex<HashMap<String, MangaData>>,
    at_home: Mutex<Option<AtHomeServer>>,
}

impl FakeSource {
    pub fn set_aggregate(&self, response: Result<AggregateDocument, u16>) {
        *self.aggregate.lock().unwrap() = Some(response);
    }

    pub fn set_aggregate_delay(&self, delay: Duration) {
        *self.aggregate_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_search(&self, response: Result<Vec<MangaData>, u16>) {
        *self.search.lock().unwrap() = Some(response);
    }

    pub fn set_trending(&self, response: Result<Vec<MangaData>, u16>) {
        *self.trending.lock().unwrap() = Some(response);
    }

    pub fn add_cover(&self, cover_id: &str, file_name: &str) {
        self.covers
            .lock()
            .unwrap()
            .insert(cover_id.to_owned(), file_name.to_owned());
    }

    pub fn add_chapter(&self, chapter: ChapterData) {
        self.chapters
            .lock()
            .unwrap()
            .insert(chapter.id.clone(), chapter);
    }

    pub fn add_manga(&self, manga: MangaData) {
        self.mangas.lock().unwrap().insert(manga.id.clone(), manga);
    }

    pub fn set_at_home(&self, server: AtHomeServer) {
        *self.at_home.lock().unwrap() = Some(server);
    }
}

fn status(endpoint: &str, status: u16) -> SourceError {
    SourceError::Status {
        url: format!("fake://{endpoint}"),
        status,
    }
}

fn respond<T: Clone>(endpoint: &str, slot: &Mutex<Option<Result<T, u16>>>) -> Result<T, SourceError> {
    match slot.lock().unwrap().clone() {
        Some(Ok(value)) => Ok(value),
        Some(Err(code)) => Err(status(endpoint, code)),
        None => Err(status(endpoint, 404)),
    }
}

#[async_trait]
impl MangaSource for FakeSource {
    async fn get_chapter_aggregate(
        &self,
        work_id: &str,
        _language: &str,
    ) -> Result<AggregateDocument, SourceError> {
        self.aggregate_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.aggregate_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        respond(&format!("manga/{work_id}/aggregate"), &self.aggregate)
    }

    async fn search_mangas(&self, _title: &str, _limit: usize) -> Result<Vec<MangaData>, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        respond("manga", &self.search)
    }

    async fn get_cover(&self, cover_id: &str) -> Result<CoverData, SourceError> {
        self.cover_calls.fetch_add(1, Ordering::SeqCst);

        let file_name = self.covers.lock().unwrap().get(cover_id).cloned();
        match file_name {
            Some(file_name) => Ok(serde_json::from_value(json!({
                "id": cover_id,
                "attributes": {"fileName": file_name}
            }))
            .unwrap()),
            None => Err(status(&format!("cover/{cover_id}"), 404)),
        }
    }

    async fn get_trending_mangas(&self, _days_ago: u32) -> Result<Vec<MangaData>, SourceError> {
        self.trending_calls.fetch_add(1, Ordering::SeqCst);

        respond("trending", &self.trending)
    }

    async fn get_chapter(&self, chapter_id: &str) -> Result<ChapterData, SourceError> {
        let chapter = self.chapters.lock().unwrap().get(chapter_id).cloned();

        chapter.ok_or_else(|| status(&format!("chapter/{chapter_id}"), 404))
    }

    async fn get_manga(&self, work_id: &str) -> Result<MangaData, SourceError> {
        let manga = self.mangas.lock().unwrap().get(work_id).cloned();

        manga.ok_or_else(|| status(&format!("manga/{work_id}"), 404))
    }

    async fn get_at_home_server(&self, chapter_id: &str) -> Result<AtHomeServer, SourceError> {
        let server = self.at_home.lock().unwrap().clone();

        server.ok_or_else(|| status(&format!("at-home/server/{chapter_id}"), 404))
    }

    fn cover_image_url(&self, work_id: &str, file_name: &str) -> Option<Url> {
        Url::parse(&format!("https://covers.test/{work_id}/{file_name}")).ok()
    }
}

/// Builds an aggregate document; chapters are `(label, id)` pairs. Keys keep the
/// order they are given in, like a payload straight off the wire.
pub fn aggregate(volumes: Vec<(&str, Vec<(&str, &str)>)>) -> AggregateDocument {
    let volumes = volumes
        .into_iter()
        .map(|(volume, chapters)| {
            let count = chapters.len();
            let chapters = chapters
                .into_iter()
                .map(|(label, id)| format!("{}:{}", json!(label), json!({"chapter": label, "id": id})))
                .collect::<Vec<_>>()
                .join(",");

            format!(
                r#"{}:{{"volume":{},"count":{},"chapters":{{{}}}}}"#,
                json!(volume),
                json!(volume),
                count,
                chapters
            )
        })
        .collect::<Vec<_>>()
        .join(",");

    serde_json::from_str(&format!(r#"{{"result":"ok","volumes":{{{volumes}}}}}"#)).unwrap()
}

pub fn manga(id: &str, titles: Value, cover_id: Option<&str>) -> MangaData {
    let relationships: Vec<Value> = cover_id
        .map(|cover_id| json!({"id": cover_id, "type": "cover_art"}))
        .into_iter()
        .collect();

    serde_json::from_value(json!({
        "id": id,
        "attributes": {
            "title": titles,
            "description": {"en": format!("about {id}")}
        },
        "relationships": relationships
    }))
    .unwrap()
}
