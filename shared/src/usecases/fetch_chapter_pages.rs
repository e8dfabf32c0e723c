use url::Url;

use crate::source::{model::AtHomeServer, MangaSource, SourceError};

/// Image URLs of every page of a chapter, in reading order.
pub async fn fetch_chapter_pages<S: MangaSource + ?Sized>(
    source: &S,
    chapter_id: &str,
    data_saver: bool,
) -> Result<Vec<Url>, Error> {
    let server = source
        .get_at_home_server(chapter_id)
        .await
        .map_err(Error::SourceError)?;

    page_urls(&server, data_saver)
}

pub fn page_urls(server: &AtHomeServer, data_saver: bool) -> Result<Vec<Url>, Error> {
    let (quality, files) = if data_saver {
        ("data-saver", &server.chapter.data_saver)
    } else {
        ("data", &server.chapter.data)
    };
    let base_url = server.base_url.trim_end_matches('/');

    files
        .iter()
        .map(|file| {
            let url = format!("{base_url}/{quality}/{}/{file}", server.chapter.hash);
            Url::parse(&url).map_err(|e| Error::InvalidPageUrl { url, source: e })
        })
        .collect()
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("an error occurred while fetching the image server from the source")]
    SourceError(#[source] SourceError),
    #[error("the image server produced an invalid page URL: {url}")]
    InvalidPageUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
