use std::path::PathBuf;

/// Unified error type for the sysctl provider.
///
/// Read failures of the tuning utility never show up here: they are tolerated
/// and treated as an empty current value. Everything else aborts the pass.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The tuning utility could not be located on PATH at initialization.
    #[error("failed to locate sysctl on this system: STDOUT: {stdout}\nSTDERR: {stderr}")]
    ToolNotFound { stdout: String, stderr: String },

    /// A command ran but exited unsuccessfully.
    #[error("command `{command}` failed with status {}: {stderr}", status_text(.status))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// A command could not be started at all.
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A declaration is malformed (empty name, illegal characters).
    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting { name: String, reason: String },

    /// Manifest or provider configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// Filesystem error on a specific path.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Host-state cache could not be read or written.
    #[error("host state error: {0}")]
    State(String),

    /// A report or state document could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Owner or group of the managed file could not be resolved or applied.
    #[error("ownership error on {}: {reason}", .path.display())]
    Ownership { path: PathBuf, reason: String },
}

fn status_text(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "signal".into(),
    }
}

impl ProviderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProviderError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
