//! State owned by the orchestration host rather than the provider.

pub mod state;

pub use state::{HostState, SYSCTL_NAMESPACE};
