//! Donor outreach: recipient filtering, batch sending, and the drip sweep.

pub mod engine;
pub mod filter;
mod manual;
mod sweep;

pub use engine::{SendEngine, SendEngineConfig, SendError, SendFailure, SendReport, SendRequest};
pub use manual::{send_manual, ManualSendError, ManualSendRequest};
pub use sweep::{AthleteOutcome, DripScheduler, DripSchedulerConfig, SweepError, SweepStats};
