//! The sysctl provider proper.
//!
//! `applier` enforces single settings (`set`). `aggregator`, `registry`,
//! `file` and `write_path` together implement `write`: render every persisted
//! declaration into one body, register the output file once per run, commit
//! it, and notify the participants.

pub mod aggregator;
pub mod applier;
pub mod file;
pub mod registry;
pub mod write_path;

pub use aggregator::{ConfigAggregator, Rendered, HEADER};
pub use applier::{Outcome, SettingApplier};
pub use file::{FileOutcome, FileWriter, LocalFileWriter, MemoryFileWriter};
pub use registry::{FileAttrs, FileDeclaration, FileRegistry, Registration};
pub use write_path::{FileCommit, WritePath, WritePhase};

use crate::errors::Result;

/// Where live parameter values are read from and written to.
pub trait ParameterBackend {
    /// Current value. Read failures come back as an empty string.
    fn read(&self, name: &str) -> String;

    /// Set a value. Failures are fatal to the caller.
    fn write(&self, name: &str, value: &str) -> Result<()>;
}
