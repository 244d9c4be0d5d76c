use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::sources::StateSource;
use crate::state::RawPayload;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(5000);

const EVENT_BUFFER: usize = 8;

pub type PollEvent = Result<RawPayload, FetchError>;

/// Counters shared between the poll task and its handle.
#[derive(Debug, Default)]
pub struct PollerStats {
    ticks: AtomicU64,
    failures: AtomicU64,
    skipped_ticks: AtomicU64,
}

impl PollerStats {
    /// Ticks that issued a request.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Ticks dropped because a request was still outstanding.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks.load(Ordering::Relaxed)
    }
}

pub struct StatePoller {
    source: Arc<dyn StateSource>,
    refresh_interval: Duration,
}

impl StatePoller {
    pub fn new(source: Arc<dyn StateSource>, refresh_interval: Duration) -> Self {
        Self {
            source,
            refresh_interval,
        }
    }

    /// Spawns the poll task. The first request goes out immediately, then one
    /// per `refresh_interval`, never more than one at a time.
    pub fn start(self) -> PollerHandle {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let stats = Arc::new(PollerStats::default());

        info!(
            source = %self.source.describe(),
            interval_ms = self.refresh_interval.as_millis() as u64,
            "starting state poller"
        );

        let task = tokio::spawn(poll_loop(
            self.source,
            self.refresh_interval,
            tx,
            cancel.clone(),
            Arc::clone(&stats),
        ));

        PollerHandle {
            events: rx,
            cancel,
            task: Some(task),
            stats,
        }
    }
}

async fn poll_loop(
    source: Arc<dyn StateSource>,
    period: Duration,
    tx: mpsc::Sender<PollEvent>,
    cancel: CancellationToken,
    stats: Arc<PollerStats>,
) {
    // interval() panics on a zero period
    let period = period.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let started = Instant::now();
        stats.ticks.fetch_add(1, Ordering::Relaxed);
        debug!(tick = stats.ticks(), "polling state");

        // Dropping the fetch future on cancel discards the in-flight request.
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = source.fetch() => result,
        };

        let elapsed = started.elapsed();
        let missed = (elapsed.as_nanos() / period.as_nanos()) as u64;
        if missed > 0 {
            stats.skipped_ticks.fetch_add(missed, Ordering::Relaxed);
            debug!(
                missed,
                elapsed_ms = elapsed.as_millis() as u64,
                "skipped ticks while request was in flight"
            );
        }

        match &result {
            Ok(_) => debug!(elapsed_ms = elapsed.as_millis() as u64, "state fetched"),
            Err(_) => {
                stats.failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        if cancel.is_cancelled() || tx.send(result).await.is_err() {
            break;
        }
    }

    debug!("poll loop exited");
}

/// Owns a running poll task. Dropping the handle stops the task.
pub struct PollerHandle {
    events: mpsc::Receiver<PollEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    stats: Arc<PollerStats>,
}

impl PollerHandle {
    /// Next tick's outcome, or `None` once stopped.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    /// Non-blocking variant of [`next_event`](Self::next_event).
    pub fn try_next_event(&mut self) -> Option<PollEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.events.try_recv().ok()
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub fn stats(&self) -> &PollerStats {
        &self.stats
    }

    /// Stops ticking and waits for the task to finish. Results of a request
    /// still in flight, or already buffered, are never delivered.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        self.events.close();
        while self.events.try_recv().is_ok() {}
        if let Some(task) = self.task.take() {
            let _ = task.await;
            info!("state poller stopped");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
