use anyhow::{anyhow, Context as _};
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset. The HTTP stack is noisy at `info`.
const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,reqwest=warn";

/// Sends both `tracing` events and the library's `log` records to stderr, keeping
/// stdout free for command output.
pub fn init() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter()?)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("a global subscriber is already installed: {err}"))
}

fn filter() -> anyhow::Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
            .with_context(|| format!("invalid {} directives `{directives}`", EnvFilter::DEFAULT_ENV)),
        _ => EnvFilter::try_new(DEFAULT_DIRECTIVES).context("default log directives"),
    }
}
