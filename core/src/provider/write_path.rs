//! Drives the `write` action from render to notification.
//!
//! ```text
//! Idle -> Rendering -> AwaitingFileCommit -> Notifying -> Idle
//! ```
//!
//! `request` covers the first two transitions for one declaration; the file
//! itself is committed once per path after the whole declaration list has
//! been walked (`commit_all`), and a content change fans out to every
//! subscriber of that file, whether or not its own value moved.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::aggregator::ConfigAggregator;
use super::file::{FileOutcome, FileWriter};
use super::registry::{FileAttrs, FileRegistry, Registration};
use crate::errors::Result;
use crate::types::setting::Setting;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    Idle,
    Rendering,
    AwaitingFileCommit,
    Notifying,
}

impl fmt::Display for WritePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WritePhase::Idle => "idle",
            WritePhase::Rendering => "rendering",
            WritePhase::AwaitingFileCommit => "awaiting_file_commit",
            WritePhase::Notifying => "notifying",
        };
        f.write_str(name)
    }
}

/// Result of committing one managed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCommit {
    pub path: PathBuf,
    pub outcome: FileOutcome,
    /// Declarations to mark changed. Empty when the content was unchanged.
    pub notified: BTreeSet<usize>,
    pub participants: BTreeSet<usize>,
    pub contributions: usize,
}

/// The write path for one convergence run.
pub struct WritePath {
    phase: WritePhase,
    history: Vec<WritePhase>,
    registry: FileRegistry,
}

impl WritePath {
    pub fn new() -> Self {
        WritePath {
            phase: WritePhase::Idle,
            history: Vec::new(),
            registry: FileRegistry::new(),
        }
    }

    pub fn phase(&self) -> WritePhase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn transitions(&self) -> &[WritePhase] {
        &self.history
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    fn transition(&mut self, to: WritePhase) {
        tracing::debug!(from = %self.phase, to = %to, "write path");
        self.phase = to;
        self.history.push(to);
    }

    /// Handle a `write` action for the declaration at `index`: render the
    /// whole list and attach the body to the single declaration of `target`.
    pub fn request(
        &mut self,
        declarations: &[Setting],
        index: usize,
        target: &Path,
        attrs: FileAttrs,
    ) -> Registration {
        self.transition(WritePhase::Rendering);
        let rendered = ConfigAggregator::render(declarations);

        let registration = self.registry.declare(target, attrs);
        self.registry.attach(target, rendered.body, &rendered.participants);
        tracing::debug!(
            setting = %declarations.get(index).map(|s| s.name.as_str()).unwrap_or_default(),
            path = %target.display(),
            registration = ?registration,
            entries = rendered.participants.len(),
            "content attached"
        );
        self.transition(WritePhase::AwaitingFileCommit);
        registration
    }

    /// Commit every registered file once and return who to notify.
    pub fn commit_all(&mut self, writer: &mut dyn FileWriter) -> Result<Vec<FileCommit>> {
        let mut commits = Vec::new();
        for decl in self.registry.drain() {
            let outcome = match writer.commit(&decl) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.transition(WritePhase::Idle);
                    return Err(e);
                }
            };
            self.transition(WritePhase::Notifying);
            let notified = match outcome {
                FileOutcome::Changed => decl.subscribers.clone(),
                FileOutcome::Unchanged => BTreeSet::new(),
            };
            commits.push(FileCommit {
                path: decl.path,
                outcome,
                notified,
                participants: decl.subscribers,
                contributions: decl.contributions,
            });
        }
        if self.phase != WritePhase::Idle {
            self.transition(WritePhase::Idle);
        }
        Ok(commits)
    }
}

impl Default for WritePath {
    fn default() -> Self {
        Self::new()
    }
}
