//! Tuning run - one execution of the two-stage search

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a tuning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Created, not started
    Pending,
    /// Search in progress
    Running,
    /// Final model fitted
    Success,
    /// Aborted by an error
    Failed,
}

/// Lifecycle record of a tuning run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TuningRun {
    run_id: String,
    tag: Option<char>,
    status: RunStatus,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl TuningRun {
    /// Create a run in Pending status.
    ///
    /// `tag` is the property being modelled, `None` for a dry run.
    #[must_use]
    pub fn new(run_id: impl Into<String>, tag: Option<char>) -> Self {
        Self {
            run_id: run_id.into(),
            tag,
            status: RunStatus::Pending,
            started_at: None,
            ended_at: None,
        }
    }

    /// Run identifier.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Property tag, if known.
    #[must_use]
    pub const fn tag(&self) -> Option<char> {
        self.tag
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Start timestamp, once started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// End timestamp, once completed.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Move to Running and stamp the start time.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Move to a final status and stamp the end time.
    pub fn complete(&mut self, status: RunStatus) {
        self.status = status;
        self.ended_at = Some(Utc::now());
    }
}
