//! Walks the declarations in order and drives the provider.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::errors::Result;
use crate::host::{HostState, SYSCTL_NAMESPACE};
use crate::infrastructure::{CommandRunner, DialectHook, StaticDialect};
use crate::provider::{
    FileAttrs, FileCommit, FileWriter, Outcome, ParameterBackend, SettingApplier, WritePath,
};
use crate::sysctl::Sysctl;
use crate::types::config::Manifest;
use crate::types::setting::{Action, Setting};

/// Per-declaration result of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingStatus {
    pub index: usize,
    pub name: String,
    pub value: String,
    /// Outcome of the `set` action, if it was requested.
    pub applied: Option<Outcome>,
    /// Marked changed by a rewrite of the shared file.
    pub notified: bool,
}

impl SettingStatus {
    pub fn changed(&self) -> bool {
        self.notified || self.applied.is_some_and(Outcome::changed)
    }
}

/// Outcome of a full convergence pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub settings: Vec<SettingStatus>,
    pub files: Vec<FileCommit>,
}

impl RunReport {
    pub fn changed_count(&self) -> usize {
        self.settings.iter().filter(|s| s.changed()).count()
    }

    pub fn changed_names(&self) -> Vec<&str> {
        self.settings
            .iter()
            .filter(|s| s.changed())
            .map(|s| s.name.as_str())
            .collect()
    }
}

/// One convergence pass over an ordered declaration list.
///
/// Declarations are processed strictly in the order given; a fatal error
/// aborts the pass without committing the shared file.
pub struct ConvergenceRun<'a> {
    backend: &'a dyn ParameterBackend,
    writer: &'a mut dyn FileWriter,
    target: PathBuf,
    attrs: FileAttrs,
}

impl<'a> ConvergenceRun<'a> {
    pub fn new(
        backend: &'a dyn ParameterBackend,
        writer: &'a mut dyn FileWriter,
        target: PathBuf,
        attrs: FileAttrs,
    ) -> Self {
        ConvergenceRun {
            backend,
            writer,
            target,
            attrs,
        }
    }

    pub fn converge(&mut self, settings: &[Setting], state: &mut HostState) -> Result<RunReport> {
        for setting in settings {
            setting.validate()?;
        }

        let applier = SettingApplier::new(self.backend);
        let mut write_path = WritePath::new();
        let mut statuses: Vec<SettingStatus> = settings
            .iter()
            .enumerate()
            .map(|(index, s)| SettingStatus {
                index,
                name: s.name.clone(),
                value: s.render_value(),
                applied: None,
                notified: false,
            })
            .collect();

        for (index, setting) in settings.iter().enumerate() {
            for action in &setting.actions {
                match action {
                    Action::Set => {
                        statuses[index].applied = Some(applier.apply(setting, state)?);
                    }
                    Action::Write => {
                        write_path.request(settings, index, &self.target, self.attrs.clone());
                    }
                    Action::Nothing => {}
                }
            }
        }

        let files = write_path.commit_all(&mut *self.writer)?;
        for commit in &files {
            for &index in &commit.notified {
                statuses[index].notified = true;
                let setting = &settings[index];
                if setting.save {
                    state.set(SYSCTL_NAMESPACE, &setting.name, Value::String(setting.render_value()));
                }
            }
        }

        let report = RunReport {
            settings: statuses,
            files,
        };
        tracing::info!(
            declarations = settings.len(),
            changed = report.changed_count(),
            files = report.files.len(),
            "convergence pass complete"
        );
        Ok(report)
    }
}

/// Locate the tuning utility for `manifest`'s platform and run one pass over
/// its declarations.
pub fn run_manifest(
    manifest: &Manifest,
    runner: &dyn CommandRunner,
    writer: &mut dyn FileWriter,
    state: &mut HostState,
) -> Result<RunReport> {
    let config = &manifest.config;
    let attrs = FileAttrs {
        owner: config.owner.clone(),
        group: config.group.clone(),
        mode: config.mode_bits()?,
    };
    let family = StaticDialect { os: config.os.clone() }.os_family();
    let sysctl = Sysctl::locate(runner, family, config.tool.as_deref())?;
    ConvergenceRun::new(&sysctl, writer, config.sysctl_file.clone(), attrs)
        .converge(&manifest.settings, state)
}
