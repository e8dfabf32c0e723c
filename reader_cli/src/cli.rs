use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use shared::usecases::TrendingPeriod;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "manga-reader", author, version, about)]
pub struct Cli {
    /// Directory holding settings and reading history.
    #[arg(long, global = true, default_value = ".manga-reader")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the chapters of a work, in reading order.
    Chapters(ChaptersArgs),
    /// Search works by title.
    Search(SearchArgs),
    /// Show the most followed recent works.
    Trending(TrendingArgs),
    /// Print the page image URLs of a chapter.
    Pages(PagesArgs),
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Debug, Args)]
pub struct ChaptersArgs {
    pub work_id: String,

    /// Translation language; defaults to the configured one.
    #[arg(long)]
    pub language: Option<String>,

    /// Print the aggregate document as received instead of the flattened list.
    #[arg(long)]
    pub raw: bool,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Query to search for. Without one, every stdin line is treated as an
    /// edit of the query and results are printed as typing settles.
    pub query: Option<String>,
}

#[derive(Debug, Args)]
pub struct TrendingArgs {
    /// today, weekly, monthly or all-time.
    #[arg(long, default_value_t = TrendingPeriod::Weekly)]
    pub period: TrendingPeriod,
}

#[derive(Debug, Args)]
pub struct PagesArgs {
    pub chapter_id: String,

    /// Also record the chapter in the reading history.
    #[arg(long)]
    pub record: bool,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    List,
    Add(HistoryAddArgs),
    Clear,
}

#[derive(Debug, Args)]
pub struct HistoryAddArgs {
    pub work_id: String,

    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub cover_url: String,

    #[arg(long)]
    pub chapter: f64,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    Set(SettingsSetArgs),
}

#[derive(Debug, Args)]
pub struct SettingsSetArgs {
    #[arg(long)]
    pub api_base_url: Option<Url>,

    #[arg(long)]
    pub covers_base_url: Option<Url>,

    #[arg(long, conflicts_with = "no_proxy")]
    pub proxy_base_url: Option<Url>,

    /// Stop going through the proxy.
    #[arg(long)]
    pub no_proxy: bool,

    #[arg(long)]
    pub language: Option<String>,

    #[arg(long)]
    pub search_limit: Option<usize>,

    #[arg(long)]
    pub search_debounce_ms: Option<u64>,

    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    #[arg(long)]
    pub data_saver: Option<bool>,
}
