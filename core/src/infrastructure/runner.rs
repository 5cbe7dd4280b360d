//! Command runner abstraction for executing shell commands.
//!
//! `CommandRunner` is the trait the provider uses to reach the tuning utility.
//! `ShellRunner` is the production implementation that spawns `sh -c`.
//! `MockRunner` is the test double that records calls and returns preset responses.

use std::cell::RefCell;
use std::process::Command;

use crate::errors::{ProviderError, Result};

/// Exit status and captured streams of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: &str) -> Self {
        CommandOutput {
            status: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failed(status: i32, stderr: &str) -> Self {
        CommandOutput {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a non-zero exit into `ProviderError::CommandFailed`.
    pub fn into_result(self, command: &str) -> Result<CommandOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(ProviderError::CommandFailed {
                command: command.to_string(),
                status: self.status,
                stderr: self.stderr.trim_end().to_string(),
            })
        }
    }
}

/// Trait for executing shell command strings.
///
/// `Err` means the command could not be started; a command that ran and
/// failed comes back as `Ok` with a non-zero status.
pub trait CommandRunner {
    fn run(&self, cmd: &str) -> Result<CommandOutput>;
}

/// Production runner that spawns `sh -c <cmd>`.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, cmd: &str) -> Result<CommandOutput> {
        tracing::trace!(command = cmd, "spawning");
        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .output()
            .map_err(|e| ProviderError::Spawn {
                command: cmd.to_string(),
                source: e,
            })?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Test-double runner that records commands and returns pre-configured responses.
pub struct MockRunner {
    responses: RefCell<Vec<CommandOutput>>,
    commands: RefCell<Vec<String>>,
}

impl MockRunner {
    pub fn with_responses(responses: Vec<CommandOutput>) -> Self {
        let mut reversed = responses;
        reversed.reverse();
        MockRunner {
            responses: RefCell::new(reversed),
            commands: RefCell::new(Vec::new()),
        }
    }

    pub fn new() -> Self {
        MockRunner {
            responses: RefCell::new(Vec::new()),
            commands: RefCell::new(Vec::new()),
        }
    }

    pub fn executed_commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &str) -> Result<CommandOutput> {
        self.commands.borrow_mut().push(cmd.to_string());
        let mut responses = self.responses.borrow_mut();
        Ok(responses.pop().unwrap_or_else(|| CommandOutput::ok("")))
    }
}
