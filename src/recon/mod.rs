//! Ledger consumers: reconciliation against the payment processor and the
//! daily rollup materialization. Reconciliation never mutates either side;
//! rollups are write-once per (org, day).

mod reconcile;
mod rollup;

pub use reconcile::{reconcile, LedgerMismatch, ReconError, ReconciliationReport};
pub use rollup::{run_daily_rollup, RollupError, RollupOutcome};
