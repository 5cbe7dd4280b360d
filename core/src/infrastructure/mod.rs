//! Infrastructure for reaching the tuning utility.
//!
//! Provides the `CommandRunner` trait with a shell implementation (production)
//! and mock implementations (testing), plus the OS dialect hook that picks the
//! utility's flags.

pub mod mock;
pub mod platform;
pub mod runner;

pub use platform::{DialectHook, OsFamily, StaticDialect};
pub use runner::{CommandOutput, CommandRunner, ShellRunner};
