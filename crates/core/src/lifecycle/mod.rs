//! Periodic lifecycle sweeps.

pub mod cleanup;


pub use cleanup::{LifecyclePolicy, SweepFailure, SweepReport, CANCELLATION_COMMENT};
