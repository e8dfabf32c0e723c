use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    model::{ChapterRecord, WorkId},
    source::MangaSource,
    usecases::fetch_chapter_list::{ChapterAggregator, Error},
};

/// What a chapter list view renders.
#[derive(Clone, Debug, Default)]
pub struct ChapterListState {
    pub records: Vec<ChapterRecord>,
    pub loading: bool,
    pub error: Option<Error>,
}

struct RunningLoad {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Loads the chapter list of one work in the background and publishes every
/// state change. Dropping the job cancels any load still in flight, so its
/// result never reaches the channel.
pub struct ChapterListJob<S> {
    aggregator: Arc<ChapterAggregator<S>>,
    work_id: WorkId,
    language: String,
    tx: watch::Sender<ChapterListState>,
    rx: watch::Receiver<ChapterListState>,
    running: Mutex<Option<RunningLoad>>,
}

impl<S: MangaSource + 'static> ChapterListJob<S> {
    pub fn spawn_new(
        aggregator: Arc<ChapterAggregator<S>>,
        work_id: WorkId,
        language: impl Into<String>,
    ) -> Self {
        let language = language.into();
        let (tx, rx) = watch::channel(ChapterListState::default());

        let job = Self {
            aggregator,
            work_id,
            language,
            tx,
            rx,
            running: Mutex::new(None),
        };

        if !job.work_id.is_empty() {
            let stale = job
                .aggregator
                .cached(&job.work_id, &job.language)
                .map(|listing| listing.records)
                .unwrap_or_default();
            job.tx.send_modify(|state| state.records = stale);
            job.start(false);
        }

        job
    }

    /// Loads the list again, ignoring how fresh the cached copy is.
    pub fn refetch(&self) {
        if self.work_id.is_empty() {
            return;
        }

        self.start(true);
    }

    pub fn poll(&self) -> ChapterListState {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChapterListState> {
        self.rx.clone()
    }

    /// Waits until no load is in flight and returns the state at that point.
    pub async fn settled(&self) -> ChapterListState {
        let mut rx = self.rx.clone();

        let state = match rx.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.poll(),
        };

        state
    }

    fn start(&self, force: bool) {
        self.tx.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let aggregator = self.aggregator.clone();
        let work_id = self.work_id.clone();
        let language = self.language.clone();
        let tx = self.tx.clone();
        let cancel_token = CancellationToken::new();
        let task_token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let load = async {
                if force {
                    aggregator.refetch(&work_id, &language).await
                } else {
                    aggregator.fetch_chapters(&work_id, &language).await
                }
            };

            let list = tokio::select! {
                _ = task_token.cancelled() => {
                    debug!("chapter list load for {} was canceled", work_id.value());
                    return;
                }
                list = load => list,
            };

            tx.send_replace(ChapterListState {
                records: list.records,
                loading: false,
                error: list.error,
            });
        });

        let previous = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(RunningLoad {
                cancel_token,
                handle,
            });
        if let Some(previous) = previous {
            previous.cancel();
        }
    }
}

impl RunningLoad {
    fn cancel(self) {
        self.cancel_token.cancel();
        self.handle.abort();
    }
}

impl<S> Drop for ChapterListJob<S> {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(running) = running {
            running.cancel();
        }
    }
}
