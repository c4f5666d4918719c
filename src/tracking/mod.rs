//! Tuning run tracking
//!
//! ```text
//! TuningRun (1) ──< TrialRecord (N)   [one per evaluated candidate]
//! ```
//!
//! A [`TuningRun`] follows the lifecycle Pending → Running → Success/Failed.
//! Every candidate evaluation of the two-stage search is appended to a
//! [`TrialLog`] as a [`TrialRecord`] keyed by stage and parameter value.
//!
//! ```rust
//! use crystal_props::tracking::{RunStatus, TrialLog, TrialRecord, TuningRun, TuningStage};
//!
//! let mut run = TuningRun::new("z-20260101", Some('z'));
//! run.start();
//!
//! let mut log = TrialLog::new();
//! log.add_trial(TrialRecord::new(run.run_id(), TuningStage::TreeCount, 20, 4.1, 0.82));
//!
//! run.complete(RunStatus::Success);
//! assert_eq!(log.trials_for_stage(TuningStage::TreeCount).len(), 1);
//! ```

mod log;
mod run;
mod trial;

pub use log::TrialLog;
pub use run::{RunStatus, TuningRun};
pub use trial::{TrialRecord, TuningStage};
