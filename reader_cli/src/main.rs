use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

mod cli;
mod commands;
mod logging;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    logging::init().context("init logging")?;

    let cli = cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let app = commands::App::load(&cli.data_dir).context("load settings")?;

    match cli.command {
        cli::Command::Chapters(args) => app.chapters(args).await.context("chapters")?,
        cli::Command::Search(args) => app.search(args).await.context("search")?,
        cli::Command::Trending(args) => app.trending(args).await.context("trending")?,
        cli::Command::Pages(args) => app.pages(args).await.context("pages")?,
        cli::Command::History { command } => app.history(command).context("history")?,
        cli::Command::Settings { command } => app.settings(command).context("settings")?,
    }

    Ok(())
}
