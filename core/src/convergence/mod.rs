//! Convergence engine — one sequential pass over the declared settings.
//!
//! The `run` module stands in for the host's run loop: it walks the ordered
//! declaration list, dispatches each requested action to the provider, then
//! commits the shared config file and fans the result back out.

pub mod run;

pub use run::{ConvergenceRun, RunReport, SettingStatus};
