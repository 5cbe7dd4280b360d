//! Per-run registry of managed output files.
//!
//! Every declaration with a `write` action triggers a render, but the shared
//! output file must be declared exactly once per run. The first request for a
//! path creates its declaration; later requests attach their content and
//! participants to that same declaration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Ownership and permission metadata for a managed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttrs {
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mode: u32,
}

/// A single managed file and the content it should hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDeclaration {
    pub path: PathBuf,
    pub attrs: FileAttrs,
    /// Latest rendered body; every request in a run renders the same list,
    /// so this is identical across attachments.
    pub content: String,
    /// Declarations notified when the file content changes.
    pub subscribers: BTreeSet<usize>,
    /// How many content requests were merged into this declaration.
    pub contributions: usize,
}

/// Whether a declare call created a new target or found the existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    New,
    Existing,
}

#[derive(Debug, Default)]
pub struct FileRegistry {
    files: BTreeMap<PathBuf, FileDeclaration>,
}

impl FileRegistry {
    pub fn new() -> Self {
        FileRegistry::default()
    }

    /// Register `path` if it is not known yet. Attributes of an existing
    /// declaration are kept as first declared.
    pub fn declare(&mut self, path: &Path, attrs: FileAttrs) -> Registration {
        if self.files.contains_key(path) {
            return Registration::Existing;
        }
        self.files.insert(
            path.to_path_buf(),
            FileDeclaration {
                path: path.to_path_buf(),
                attrs,
                content: String::new(),
                subscribers: BTreeSet::new(),
                contributions: 0,
            },
        );
        Registration::New
    }

    /// Attach a content update and its subscribers to a declared path.
    /// Returns false when `path` was never declared.
    pub fn attach(&mut self, path: &Path, content: String, subscribers: &BTreeSet<usize>) -> bool {
        match self.files.get_mut(path) {
            Some(decl) => {
                decl.content = content;
                decl.subscribers.extend(subscribers.iter().copied());
                decl.contributions += 1;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, path: &Path) -> Option<&FileDeclaration> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Hand out every declaration, leaving the registry empty.
    pub fn drain(&mut self) -> Vec<FileDeclaration> {
        std::mem::take(&mut self.files).into_values().collect()
    }
}
