//! Mock kernel for testing.
//!
//! Understands the handful of command lines the provider emits (`which
//! sysctl`, reads, and `-w` writes) and serves them from an in-memory
//! parameter table, making it easy to write deterministic tests for the
//! convergence pass.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::runner::{CommandOutput, CommandRunner};
use crate::errors::Result;

pub const MOCK_TOOL_PATH: &str = "/sbin/sysctl";

/// A test-double that records commands and answers them from a parameter table.
pub struct MockKernel {
    params: RefCell<HashMap<String, String>>,
    commands: RefCell<Vec<String>>,
    tool_present: bool,
    unreadable: HashSet<String>,
    read_only: HashSet<String>,
}

impl MockKernel {
    pub fn new() -> Self {
        MockKernel {
            params: RefCell::new(HashMap::new()),
            commands: RefCell::new(Vec::new()),
            tool_present: true,
            unreadable: HashSet::new(),
            read_only: HashSet::new(),
        }
    }

    /// Create a kernel with some parameters already set.
    pub fn with_params(params: &[(&str, &str)]) -> Self {
        let kernel = MockKernel::new();
        for (name, value) in params {
            kernel.set_param(name, value);
        }
        kernel
    }

    /// Make `which sysctl` fail.
    pub fn without_tool(mut self) -> Self {
        self.tool_present = false;
        self
    }

    /// Make reads of `name` fail.
    pub fn unreadable(mut self, name: &str) -> Self {
        self.unreadable.insert(name.to_string());
        self
    }

    /// Make writes of `name` fail.
    pub fn read_only(mut self, name: &str) -> Self {
        self.read_only.insert(name.to_string());
        self
    }

    pub fn set_param(&self, name: &str, value: &str) {
        self.params
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.params.borrow().get(name).cloned()
    }

    pub fn executed_commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    /// Commands that wrote a value.
    pub fn writes(&self) -> Vec<String> {
        self.commands
            .borrow()
            .iter()
            .filter(|c| c.contains(" -w "))
            .cloned()
            .collect()
    }

    fn which(&self) -> CommandOutput {
        if self.tool_present {
            CommandOutput::ok(&format!("{}\n", MOCK_TOOL_PATH))
        } else {
            CommandOutput::failed(1, "which: no sysctl in (/usr/bin:/bin)")
        }
    }

    fn read(&self, name: &str) -> CommandOutput {
        if self.unreadable.contains(name) {
            return CommandOutput::failed(255, &format!("sysctl: permission denied on key '{}'", name));
        }
        match self.params.borrow().get(name) {
            Some(value) => CommandOutput::ok(&format!("{}\n", value)),
            None => CommandOutput::failed(
                255,
                &format!("sysctl: cannot stat /proc/sys/{}: No such file or directory", name.replace('.', "/")),
            ),
        }
    }

    fn write(&self, assignment: &str) -> CommandOutput {
        let Some((name, quoted)) = assignment.split_once('=') else {
            return CommandOutput::failed(255, "sysctl: malformed setting");
        };
        if self.read_only.contains(name) {
            return CommandOutput::failed(255, &format!("sysctl: permission denied on key '{}'", name));
        }
        let value = unquote(quoted);
        self.set_param(name, &value);
        CommandOutput::ok(&format!("{}\n", value))
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for MockKernel {
    fn run(&self, cmd: &str) -> Result<CommandOutput> {
        self.commands.borrow_mut().push(cmd.to_string());
        if cmd == "which sysctl" {
            return Ok(self.which());
        }
        if let Some((_, assignment)) = cmd.split_once(" -w ") {
            return Ok(self.write(assignment));
        }
        match cmd.split_whitespace().last() {
            Some(name) => Ok(self.read(name)),
            None => Ok(CommandOutput::failed(127, "sh: empty command")),
        }
    }
}

/// Undo single-quote shell quoting, including the `'\''` escape.
fn unquote(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(quoted);
    inner.replace("'\\''", "'")
}
