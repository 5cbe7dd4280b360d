//! Sysctl provider core: reconciles kernel parameters against declared
//! settings and persists them to a single managed config file.
//!
//! Two actions per declaration:
//!
//! - `set`: read the live value through the tuning utility and write it when
//!   its whitespace-normalized tokens differ from the declared value.
//! - `write`: fold every persisted declaration (last definition of a name
//!   wins) into one sorted config file, registered once per run and committed
//!   after all declarations have been walked.

pub mod convergence;
pub mod errors;
pub mod host;
pub mod infrastructure;
pub mod provider;
pub mod sysctl;
pub mod types;

pub use errors::{ProviderError, Result};
