// src/pipeline/poll.rs

//! Fetch → apply poll loop.

use std::path::Path;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{Config, Seed};
use crate::services::{FeedFetcher, StateSynchronizer, StatusClassifier};
use crate::storage::{LocalStorage, StateStorage};
use crate::utils::http::Transport;
use crate::utils::report;

/// Outcome of one fetch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub fetched: usize,
    pub applied: usize,
    /// Messages that changed at least one alert
    pub changed: usize,
    /// High-water mark after the cycle
    pub last_message_id: u64,
}

/// Open the synchronizer over the configured states file and seed.
pub async fn open_synchronizer(
    config: &Config,
    base: &Path,
) -> Result<StateSynchronizer<LocalStorage>> {
    let seed_path = config.storage.seed_path(base);
    let seed = Seed::load_or_bundled(seed_path.as_deref())?;
    seed.validate()?;

    let storage = LocalStorage::new(config.storage.states_path(base));
    let classifier = StatusClassifier::from_config(&config.classifier);
    StateSynchronizer::open(storage, classifier, seed).await
}

/// Fetch once and apply the messages in id order.
///
/// Stops after the message in flight when shutdown is requested. A failed
/// save ends the cycle with an error.
pub async fn run_cycle<T: Transport, S: StateStorage>(
    fetcher: &mut FeedFetcher<T>,
    synchronizer: &mut StateSynchronizer<S>,
    shutdown: &CancellationToken,
) -> Result<CycleStats> {
    let messages = fetcher.fetch_messages().await;
    let mut stats = CycleStats {
        fetched: messages.len(),
        ..CycleStats::default()
    };

    for message in &messages {
        if shutdown.is_cancelled() {
            log::info!(
                "Shutdown requested, {} message(s) left unapplied",
                messages.len() - stats.applied
            );
            break;
        }

        log::debug!("{}", message.summary());
        if synchronizer.parse_message(message).await? {
            stats.changed += 1;
        }
        stats.applied += 1;
    }

    stats.last_message_id = fetcher.last_message_id();
    Ok(stats)
}

/// Load the backlog, then poll for new messages until shutdown.
pub async fn run_poller<T: Transport, S: StateStorage>(
    config: &Config,
    fetcher: &mut FeedFetcher<T>,
    synchronizer: &mut StateSynchronizer<S>,
    shutdown: &CancellationToken,
) -> Result<()> {
    report::header(&format!("Polling channel \"{}\"", config.feed.channel));

    let started = Instant::now();
    let backlog = run_cycle(fetcher, synchronizer, shutdown).await?;
    if backlog.fetched == 0 {
        log::error!("No messages fetched");
    } else {
        report::summary(
            "Backlog loaded",
            &[
                ("Messages", backlog.applied.to_string()),
                ("Changed", backlog.changed.to_string()),
                ("Last message ID", backlog.last_message_id.to_string()),
                ("Alerting regions", synchronizer.hierarchy().alerting_count().to_string()),
                ("Elapsed", format!("{:.2?}", started.elapsed())),
            ],
        );
    }

    let interval = config.poll.interval();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let stats = run_cycle(fetcher, synchronizer, shutdown).await?;
        if stats.fetched > 0 {
            log::info!(
                "Applied {} new message(s), {} changed state. Last message ID: {}",
                stats.applied,
                stats.changed,
                stats.last_message_id
            );
        } else {
            log::debug!("No new messages at this time");
        }

        if shutdown.is_cancelled() {
            break;
        }
    }

    log::info!("Poller stopped at message ID {}", fetcher.last_message_id());
    Ok(())
}

/// Cancel `shutdown` on Ctrl+C.
pub fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Ctrl+C received, shutting down");
                shutdown.cancel();
            }
            Err(e) => log::error!("Unable to listen for Ctrl+C: {}", e),
        }
    });
}
