//! Handle on the kernel tuning utility.

use std::path::{Path, PathBuf};

use crate::errors::{ProviderError, Result};
use crate::infrastructure::{CommandRunner, OsFamily};
use crate::provider::ParameterBackend;

/// A located `sysctl` binary plus the flag dialect for this platform.
pub struct Sysctl<'a> {
    runner: &'a dyn CommandRunner,
    path: PathBuf,
    family: OsFamily,
}

impl<'a> Sysctl<'a> {
    /// Find the utility on PATH, or use `explicit` when configured.
    ///
    /// A failed lookup is fatal; the error carries both output streams.
    pub fn locate(
        runner: &'a dyn CommandRunner,
        family: OsFamily,
        explicit: Option<&Path>,
    ) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let out = runner.run("which sysctl")?;
                let found = out.stdout.trim();
                if !out.success() || found.is_empty() {
                    tracing::info!(stderr = %out.stderr.trim_end(), "failed to locate sysctl on this system");
                    return Err(ProviderError::ToolNotFound {
                        stdout: out.stdout,
                        stderr: out.stderr,
                    });
                }
                PathBuf::from(found)
            }
        };
        tracing::debug!(path = %path.display(), os = %family, "using sysctl");
        Ok(Sysctl { runner, path, family })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_command(&self, name: &str) -> String {
        format!("{} {} {}", self.path.display(), self.family.read_flags(), name)
    }

    pub fn write_command(&self, name: &str, value: &str) -> String {
        format!(
            "{} {} -w {}={}",
            self.path.display(),
            self.family.read_flags(),
            name,
            shell_quote(value)
        )
    }

    /// Current value of `name`. Failures are tolerated and read as empty.
    pub fn read(&self, name: &str) -> String {
        let cmd = self.read_command(name);
        match self.runner.run(&cmd) {
            Ok(out) if out.success() => out.stdout,
            Ok(out) => {
                tracing::warn!(setting = name, stderr = %out.stderr.trim_end(), "read failed, treating current value as empty");
                String::new()
            }
            Err(e) => {
                tracing::warn!(setting = name, error = %e, "read failed, treating current value as empty");
                String::new()
            }
        }
    }

    /// Set `name` to `value`. Any failure is returned to the caller.
    pub fn write(&self, name: &str, value: &str) -> Result<()> {
        let cmd = self.write_command(name, value);
        self.runner.run(&cmd)?.into_result(&cmd)?;
        Ok(())
    }
}

impl ParameterBackend for Sysctl<'_> {
    fn read(&self, name: &str) -> String {
        Sysctl::read(self, name)
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        Sysctl::write(self, name, value)
    }
}

/// Wrap in single quotes, escaping embedded single quotes.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
