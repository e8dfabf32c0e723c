use log::warn;
use url::Url;

use crate::source::{
    model::{HasRelationships, MangaData},
    MangaSource,
};

pub const UNTITLED: &str = "Untitled";

/// Looks up the cover art of `manga` and builds its image URL.
///
/// A work without cover art, or whose cover lookup fails, has no cover; the
/// failure is logged and never bubbles up to the caller.
pub async fn resolve_cover_url<S: MangaSource + ?Sized>(source: &S, manga: &MangaData) -> Option<Url> {
    let cover_art = manga.relationship("cover_art")?;

    match source.get_cover(&cover_art.id).await {
        Ok(cover) => source.cover_image_url(&manga.id, &cover.attributes.file_name),
        Err(e) => {
            warn!("failed to fetch cover {} for manga {}: {}", cover_art.id, manga.id, e);
            None
        }
    }
}

/// Title in the first of `preferred` languages that has one, else any title.
pub fn display_title(manga: &MangaData, preferred: &[&str]) -> Option<String> {
    manga.attributes.title.pick(preferred).map(str::to_owned)
}
