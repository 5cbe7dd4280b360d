pub mod config;
pub mod setting;

pub use config::{Manifest, ProviderConfig};
pub use setting::{Action, DesiredValue, Setting};
