use std::{
    io::Write as _,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context as _, Result};
use futures::StreamExt as _;
use serde::Serialize;
use serde_json::json;
use shared::{
    cache::ResultCache,
    clock::{Clock, SystemClock},
    history::ReadingHistoryStore,
    job::ChapterListJob,
    model::{HistoryWork, WorkId},
    settings::{Settings, SETTINGS_FILE_NAME},
    source::HttpSource,
    usecases::{
        add_to_reading_history, clear_reading_history, fetch_chapter_pages, get_reading_history,
        record_chapter_read, update_settings, ChapterAggregator, SearchAggregator,
        TrendingAggregator, UpdateableSettings,
    },
};
use tokio::{
    io::{AsyncBufReadExt as _, BufReader},
    sync::watch,
};

use crate::cli::{
    ChaptersArgs, HistoryCommand, PagesArgs, SearchArgs, SettingsCommand, SettingsSetArgs,
    TrendingArgs,
};

pub struct App {
    data_dir: PathBuf,
    settings_path: PathBuf,
    settings: Settings,
    clock: Arc<dyn Clock>,
}

impl App {
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join(SETTINGS_FILE_NAME);
        let settings = Settings::from_file(&settings_path)?;

        Ok(Self {
            data_dir: data_dir.to_owned(),
            settings_path,
            settings,
            clock: Arc::new(SystemClock),
        })
    }

    pub async fn chapters(self, args: ChaptersArgs) -> Result<()> {
        let language = args
            .language
            .unwrap_or_else(|| self.settings.language.clone());
        let work_id = WorkId::new(args.work_id);
        let aggregator = Arc::new(ChapterAggregator::new(
            self.source()?,
            self.cache(),
            self.settings.chapter_list_freshness(),
        ));

        if args.raw {
            let list = aggregator.fetch_chapters(&work_id, &language).await;
            if let Some(err) = list.error {
                return Err(err.into());
            }

            return print_json(&list.raw);
        }

        let job = ChapterListJob::spawn_new(aggregator, work_id, language);
        let state = job.settled().await;

        match state.error {
            Some(err) if state.records.is_empty() => return Err(err.into()),
            Some(err) => tracing::warn!("showing previous chapter list: {err:#}"),
            None => {}
        }

        print_json(&state.records)
    }

    pub async fn search(self, args: SearchArgs) -> Result<()> {
        let aggregator = SearchAggregator::new(
            self.source()?,
            self.cache(),
            self.settings.search_freshness(),
            self.settings.search_debounce(),
            self.settings.search_limit,
        );

        if let Some(query) = args.query {
            let outcome = aggregator.search(&query).await;
            if let Some(err) = outcome.error {
                return Err(err.into());
            }

            return print_json(&outcome.results);
        }

        let (tx, rx) = watch::channel(String::new());
        let typing = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tx.send_replace(line);
            }
        });

        let updates = aggregator.search_as_you_type(rx);
        tokio::pin!(updates);

        while let Some(update) = updates.next().await {
            if let Some(err) = &update.outcome.error {
                tracing::warn!("search for `{}` failed: {err:#}", update.query);
                continue;
            }

            print_json(&json!({
                "query": update.query,
                "results": update.outcome.results,
            }))?;
        }

        typing.await.context("read queries from stdin")?;

        Ok(())
    }

    pub async fn trending(self, args: TrendingArgs) -> Result<()> {
        let aggregator = TrendingAggregator::new(self.source()?, self.cache());
        let list = aggregator.fetch_trending(args.period).await;

        if let Some(err) = list.error {
            return Err(err.into());
        }

        print_json(&list.mangas)
    }

    pub async fn pages(self, args: PagesArgs) -> Result<()> {
        let source = self.source()?;
        let pages =
            fetch_chapter_pages(source.as_ref(), &args.chapter_id, self.settings.data_saver).await?;

        if args.record {
            let entry =
                record_chapter_read(source.as_ref(), &self.history_store(), &args.chapter_id)
                    .await?;
            tracing::info!("added {} to the reading history", entry.title);
        }

        print_json(&pages)
    }

    pub fn history(self, command: HistoryCommand) -> Result<()> {
        let store = self.history_store();

        match command {
            HistoryCommand::List => print_json(&get_reading_history(&store)),
            HistoryCommand::Add(args) => {
                let work = HistoryWork {
                    work_id: WorkId::new(args.work_id),
                    title: args.title,
                    cover_url: args.cover_url,
                };

                print_json(&add_to_reading_history(&store, work, args.chapter)?)
            }
            HistoryCommand::Clear => clear_reading_history(&store),
        }
    }

    pub fn settings(mut self, command: SettingsCommand) -> Result<()> {
        if let SettingsCommand::Set(args) = command {
            update_settings(&mut self.settings, &self.settings_path, args.into())?;
        }

        print_json(&self.settings)
    }

    fn source(&self) -> Result<Arc<HttpSource>> {
        Ok(Arc::new(HttpSource::new(&self.settings, self.clock.clone())?))
    }

    fn cache<V: Clone>(&self) -> Arc<ResultCache<V>> {
        Arc::new(ResultCache::new(
            self.clock.clone(),
            self.settings.cache_capacity,
            self.settings.cache_retention(),
        ))
    }

    fn history_store(&self) -> ReadingHistoryStore {
        ReadingHistoryStore::new(&self.data_dir, self.clock.clone())
    }
}

impl From<SettingsSetArgs> for UpdateableSettings {
    fn from(args: SettingsSetArgs) -> Self {
        let proxy_base_url = match (args.no_proxy, args.proxy_base_url) {
            (true, _) => Some(None),
            (false, Some(url)) => Some(Some(url)),
            (false, None) => None,
        };

        Self {
            api_base_url: args.api_base_url,
            covers_base_url: args.covers_base_url,
            proxy_base_url,
            language: args.language,
            search_limit: args.search_limit,
            search_debounce_ms: args.search_debounce_ms,
            request_timeout_secs: args.request_timeout_secs,
            data_saver: args.data_saver,
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("write output")?;
    writeln!(stdout).context("write output")?;

    Ok(())
}
