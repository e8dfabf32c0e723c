pub mod fetch_chapter_list;
pub mod fetch_chapter_pages;
pub mod fetch_trending_mangas;
pub mod reading_history;
pub mod search_mangas;
pub mod update_settings;

pub use fetch_chapter_list::{flatten_aggregate, ChapterAggregator, ChapterList};
pub use fetch_chapter_pages::fetch_chapter_pages;
pub use fetch_trending_mangas::{TrendingAggregator, TrendingList, TrendingPeriod};
pub use reading_history::{
    add_to_reading_history, clear_reading_history, get_reading_history, record_chapter_read,
};
pub use search_mangas::{SearchAggregator, SearchOutcome, SearchUpdate};
pub use update_settings::{update_settings, UpdateableSettings};
