mod cli;
mod logging;
mod persistence;
mod telegram;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use carscout_engine::{
    ChatController, ChatRouter, ExtractorRegistry, FileDiagnosticSink, ReqwestFetcher, Scheduler,
};
use clap::Parser;
use scout_logging::{scout_error, scout_info, scout_warn};

use crate::cli::Cli;
use crate::persistence::RonFileStore;
use crate::telegram::{TelegramClient, UpdatePoller};

/// Pause after a failed `getUpdates` call.
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log.into(), scout_logging::default_level(cli.verbose));
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let telegram = Arc::new(TelegramClient::new(cli.token.clone()).context("creating Telegram client")?);
    let bot = telegram
        .validate()
        .await
        .context("checking the bot token with Telegram")?;
    scout_info!("Authenticated as @{}", bot);

    let store = Arc::new(
        RonFileStore::open(&cli.state_file)
            .with_context(|| format!("opening state file {:?}", cli.state_file))?,
    );
    scout_info!("Chat sessions are kept in {:?}", store.path());
    let registry = ExtractorRegistry::with_default_adapters(Arc::new(FileDiagnosticSink::new(
        cli.diagnostics_dir.clone(),
    )));
    let fetcher = ReqwestFetcher::new(cli.fetch_settings()).context("building HTTP client")?;
    let scheduler = Scheduler::new(
        cli.scheduler_settings(),
        Arc::new(fetcher),
        registry,
        store,
        telegram.clone(),
    );
    let armed = scheduler.restore().context("restoring chat sessions")?;
    scout_info!(
        "Polling every {}s, {} chats with active queries",
        cli.interval_seconds,
        armed
    );

    let router = ChatRouter::new(ChatController::new(scheduler.clone()));
    let mut poller = UpdatePoller::new(telegram);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let batch = tokio::select! {
            _ = &mut shutdown => break,
            batch = poller.next_batch() => batch,
        };
        match batch {
            Ok(events) => {
                for event in events {
                    router.route(event);
                }
            }
            Err(err) => {
                scout_warn!("Fetching updates failed: {}", err);
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }

    scout_info!("Shutting down");
    router.shutdown().await;
    scheduler.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(err) => {
                scout_error!("Cannot listen for SIGTERM: {}", err);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
