//! Command dialect selection.
//!
//! `sysctl -e` (ignore unknown keys) only exists on Linux; elsewhere reads
//! fall back to the baseline flag set.

use std::fmt;

/// Operating system family, as far as the tuning utility cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    Other(String),
}

impl OsFamily {
    /// Map an OS name as reported by a host (`uname -s`, `std::env::consts::OS`,
    /// node attributes) onto a family.
    pub fn from_name(name: &str) -> Self {
        match name {
            "GNU/Linux" | "Linux" | "linux" => OsFamily::Linux,
            other => OsFamily::Other(other.to_string()),
        }
    }

    /// Family of the platform this binary was built for.
    pub fn detect() -> Self {
        OsFamily::from_name(std::env::consts::OS)
    }

    /// Flags passed on every read and write.
    pub fn read_flags(&self) -> &'static str {
        match self {
            OsFamily::Linux => "-n -e",
            OsFamily::Other(_) => "-n",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsFamily::Linux => f.write_str("linux"),
            OsFamily::Other(name) => f.write_str(name),
        }
    }
}

/// Hook for hosts that detect the platform themselves.
pub trait DialectHook {
    fn os_family(&self) -> OsFamily;
}

/// Uses an explicit OS name when given, otherwise the build target.
pub struct StaticDialect {
    pub os: Option<String>,
}

impl DialectHook for StaticDialect {
    fn os_family(&self) -> OsFamily {
        match &self.os {
            Some(name) => OsFamily::from_name(name),
            None => OsFamily::detect(),
        }
    }
}
