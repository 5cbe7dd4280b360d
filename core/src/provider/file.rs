//! Writers that bring a managed file in line with its declaration.

use std::collections::HashMap;
use std::ffi::CString;
use std::fs::Permissions;
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::registry::FileDeclaration;
use crate::errors::{ProviderError, Result};

/// Whether a commit altered the file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    Changed,
    Unchanged,
}

/// Trait for file commit backends.
pub trait FileWriter {
    /// Make the file at `decl.path` hold `decl.content` with `decl.attrs`.
    fn commit(&mut self, decl: &FileDeclaration) -> Result<FileOutcome>;
}

/// Writes to the local filesystem. Content is replaced atomically and only
/// when it differs; mode and ownership are enforced on every commit.
#[derive(Debug, Default)]
pub struct LocalFileWriter;

impl FileWriter for LocalFileWriter {
    fn commit(&mut self, decl: &FileDeclaration) -> Result<FileOutcome> {
        let path = decl.path.as_path();
        let existing = match std::fs::read_to_string(path) {
            Ok(c) => Some(c),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) if e.kind() == ErrorKind::InvalidData => None,
            Err(e) => return Err(ProviderError::io(path, e)),
        };

        let outcome = if existing.as_deref() == Some(decl.content.as_str()) {
            FileOutcome::Unchanged
        } else {
            replace_contents(path, &decl.content, decl.attrs.mode)?;
            tracing::info!(path = %path.display(), bytes = decl.content.len(), "wrote config file");
            FileOutcome::Changed
        };

        enforce_mode(path, decl.attrs.mode)?;
        enforce_ownership(path, decl.attrs.owner.as_deref(), decl.attrs.group.as_deref())?;
        Ok(outcome)
    }
}

fn replace_contents(path: &Path, content: &str, mode: u32) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| ProviderError::Config(format!("{} is not a file path", path.display())))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let staged = std::fs::write(&tmp, content)
        .and_then(|_| std::fs::set_permissions(&tmp, Permissions::from_mode(mode)))
        .map_err(|e| ProviderError::io(&tmp, e))
        .and_then(|_| std::fs::rename(&tmp, path).map_err(|e| ProviderError::io(path, e)));
    if staged.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    staged
}

fn enforce_mode(path: &Path, mode: u32) -> Result<()> {
    let meta = std::fs::metadata(path).map_err(|e| ProviderError::io(path, e))?;
    if meta.mode() & 0o7777 != mode {
        tracing::info!(path = %path.display(), mode = %format!("{:o}", mode), "fixing file mode");
        std::fs::set_permissions(path, Permissions::from_mode(mode)).map_err(|e| ProviderError::io(path, e))?;
    }
    Ok(())
}

fn enforce_ownership(path: &Path, owner: Option<&str>, group: Option<&str>) -> Result<()> {
    if owner.is_none() && group.is_none() {
        return Ok(());
    }
    let ownership_err = |reason: String| ProviderError::Ownership {
        path: path.to_path_buf(),
        reason,
    };
    let uid = owner
        .map(|name| lookup_uid(name).ok_or_else(|| ownership_err(format!("unknown user '{}'", name))))
        .transpose()?;
    let gid = group
        .map(|name| lookup_gid(name).ok_or_else(|| ownership_err(format!("unknown group '{}'", name))))
        .transpose()?;

    let meta = std::fs::metadata(path).map_err(|e| ProviderError::io(path, e))?;
    let uid_ok = uid.map_or(true, |u| u == meta.uid());
    let gid_ok = gid.map_or(true, |g| g == meta.gid());
    if uid_ok && gid_ok {
        return Ok(());
    }

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| ownership_err("path contains a NUL byte".into()))?;
    // -1 leaves that id untouched.
    let uid = uid.unwrap_or(libc::uid_t::MAX);
    let gid = gid.unwrap_or(libc::gid_t::MAX);
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    let ret = unsafe { libc::chown(c_path.as_ptr(), uid, gid) };
    if ret != 0 {
        return Err(ownership_err(std::io::Error::last_os_error().to_string()));
    }
    tracing::info!(path = %path.display(), uid, gid, "fixed file ownership");
    Ok(())
}

/// Resolve a user name (or numeric id) to a uid.
fn lookup_uid(name: &str) -> Option<libc::uid_t> {
    if let Ok(id) = name.parse::<libc::uid_t>() {
        return Some(id);
    }
    let c_name = CString::new(name).ok()?;
    // SAFETY: getpwnam returns null or a pointer to static storage valid until
    // the next getpw* call; the uid is copied out immediately.
    unsafe {
        let pw = libc::getpwnam(c_name.as_ptr());
        if pw.is_null() {
            None
        } else {
            Some((*pw).pw_uid)
        }
    }
}

/// Resolve a group name (or numeric id) to a gid.
fn lookup_gid(name: &str) -> Option<libc::gid_t> {
    if let Ok(id) = name.parse::<libc::gid_t>() {
        return Some(id);
    }
    let c_name = CString::new(name).ok()?;
    // SAFETY: as for getpwnam above.
    unsafe {
        let gr = libc::getgrnam(c_name.as_ptr());
        if gr.is_null() {
            None
        } else {
            Some((*gr).gr_gid)
        }
    }
}

/// In-memory writer that records commits. Used by tests and `render`-style
/// dry runs.
#[derive(Debug, Default)]
pub struct MemoryFileWriter {
    pub files: HashMap<PathBuf, String>,
    pub commits: Vec<PathBuf>,
}

impl MemoryFileWriter {
    pub fn new() -> Self {
        MemoryFileWriter::default()
    }

    /// Pre-load a file's existing content.
    pub fn with_file(mut self, path: &Path, content: &str) -> Self {
        self.files.insert(path.to_path_buf(), content.to_string());
        self
    }

    pub fn content(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }
}

impl FileWriter for MemoryFileWriter {
    fn commit(&mut self, decl: &FileDeclaration) -> Result<FileOutcome> {
        self.commits.push(decl.path.clone());
        if self.files.get(&decl.path) == Some(&decl.content) {
            return Ok(FileOutcome::Unchanged);
        }
        self.files.insert(decl.path.clone(), decl.content.clone());
        Ok(FileOutcome::Changed)
    }
}
