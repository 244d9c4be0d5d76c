use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::error::{FetchError, ShapeError};
use crate::state::model::ClusterState;
use crate::state::normalizer::{normalize, RawPayload};

/// Why the most recent tick did not update the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum TickFailure {
    Fetch(String),
    Shape(ShapeError),
}

impl std::fmt::Display for TickFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickFailure::Fetch(msg) => write!(f, "fetch failed: {msg}"),
            TickFailure::Shape(err) => write!(f, "{err}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellStatus<'a> {
    NoDataYet,
    Fresh,
    Stale(&'a TickFailure),
}

/// Holds the current snapshot for the view. There is exactly one writer, the
/// poll pipeline, and it replaces the snapshot on success and keeps it on
/// failure.
#[derive(Debug, Default)]
pub struct StateCell {
    current: Option<ClusterState>,
    last_failure: Option<TickFailure>,
    updated_at: Option<DateTime<Local>>,
    updates: u64,
    failures: u64,
}

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: Result<RawPayload, FetchError>) {
        match event {
            Ok(raw) => match normalize(&raw) {
                Ok(state) => self.replace(state),
                Err(err) => {
                    warn!(error = %err, "discarding payload with unrecognized shape");
                    self.fail(TickFailure::Shape(err));
                }
            },
            Err(err) => {
                warn!(error = %err, "state fetch failed, keeping last snapshot");
                self.fail(TickFailure::Fetch(err.to_string()));
            }
        }
    }

    fn replace(&mut self, state: ClusterState) {
        info!(
            servers = state.servers().len(),
            ring_size = state.ring_size(),
            "cluster snapshot updated"
        );
        self.current = Some(state);
        self.last_failure = None;
        self.updated_at = Some(Local::now());
        self.updates += 1;
    }

    fn fail(&mut self, failure: TickFailure) {
        self.last_failure = Some(failure);
        self.failures += 1;
    }

    pub fn current(&self) -> Option<&ClusterState> {
        self.current.as_ref()
    }

    pub fn status(&self) -> CellStatus<'_> {
        match (&self.current, &self.last_failure) {
            (None, _) => CellStatus::NoDataYet,
            (Some(_), Some(failure)) => CellStatus::Stale(failure),
            (Some(_), None) => CellStatus::Fresh,
        }
    }

    pub fn last_failure(&self) -> Option<&TickFailure> {
        self.last_failure.as_ref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Local>> {
        self.updated_at
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}
