//! The `set` action: read the live value, write when it differs.

use serde::Serialize;
use serde_json::Value;

use super::ParameterBackend;
use crate::errors::Result;
use crate::host::{HostState, SYSCTL_NAMESPACE};
use crate::types::setting::{values_match, Setting};

/// Result of enforcing one setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Changed,
    Unchanged,
}

impl Outcome {
    pub fn changed(self) -> bool {
        self == Outcome::Changed
    }
}

/// Enforces declared values against a parameter backend.
pub struct SettingApplier<'a> {
    backend: &'a dyn ParameterBackend,
}

impl<'a> SettingApplier<'a> {
    pub fn new(backend: &'a dyn ParameterBackend) -> Self {
        SettingApplier { backend }
    }

    /// Compare the live value with the declared one by token sequence and
    /// write on mismatch. Write failures are returned untouched.
    pub fn apply(&self, setting: &Setting, state: &mut HostState) -> Result<Outcome> {
        let current = self.backend.read(&setting.name);
        if values_match(&current, &setting.value) {
            tracing::debug!(setting = %setting.name, value = %setting.value, "already in desired state");
            return Ok(Outcome::Unchanged);
        }

        let desired = setting.render_value();
        self.backend.write(&setting.name, &desired)?;
        tracing::info!(
            setting = %setting.name,
            from = %current.trim(),
            to = %desired,
            "set kernel parameter"
        );
        if setting.save {
            state.set(SYSCTL_NAMESPACE, &setting.name, Value::String(desired));
        }
        Ok(Outcome::Changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::infrastructure::mock::MockKernel;
    use crate::infrastructure::OsFamily;
    use crate::sysctl::Sysctl;
    use crate::types::Manifest;
    use serde_json::json;

    #[test]
    fn second_apply_is_unchanged() {
        let kernel = MockKernel::with_params(&[("vm.swappiness", "60")]);
        let sysctl = Sysctl::locate(&kernel, OsFamily::Linux, None).unwrap();
        let applier = SettingApplier::new(&sysctl);
        let mut state = HostState::new();
        let setting = Setting::new("vm.swappiness", 10);

        assert_eq!(applier.apply(&setting, &mut state).unwrap(), Outcome::Changed);
        assert_eq!(kernel.param("vm.swappiness").as_deref(), Some("10"));
        assert_eq!(applier.apply(&setting, &mut state).unwrap(), Outcome::Unchanged);
        assert_eq!(kernel.writes().len(), 1);
    }

    #[test]
    fn whitespace_differences_are_unchanged() {
        let kernel = MockKernel::with_params(&[("net.ipv4.tcp_rmem", "4096\t87380\t6291456")]);
        let sysctl = Sysctl::locate(&kernel, OsFamily::Linux, None).unwrap();
        let applier = SettingApplier::new(&sysctl);
        let mut state = HostState::new();

        for desired in ["4096 87380 6291456", "  4096  87380 6291456  ", "4096\n87380 6291456"] {
            let setting = Setting::new("net.ipv4.tcp_rmem", desired);
            assert_eq!(applier.apply(&setting, &mut state).unwrap(), Outcome::Unchanged);
        }
        assert!(kernel.writes().is_empty());
    }

    #[test]
    fn empty_desired_against_empty_current_is_unchanged() {
        let kernel = MockKernel::with_params(&[("kernel.core_pattern", "")]);
        let sysctl = Sysctl::locate(&kernel, OsFamily::Linux, None).unwrap();
        let applier = SettingApplier::new(&sysctl);
        let setting = Setting::new("kernel.core_pattern", "");
        assert_eq!(applier.apply(&setting, &mut HostState::new()).unwrap(), Outcome::Unchanged);
    }

    #[test]
    fn read_failure_forces_write() {
        let kernel = MockKernel::new();
        let sysctl = Sysctl::locate(&kernel, OsFamily::Linux, None).unwrap();
        let applier = SettingApplier::new(&sysctl);
        let setting = Setting::new("net.core.somaxconn", 1024);
        assert_eq!(applier.apply(&setting, &mut HostState::new()).unwrap(), Outcome::Changed);
        assert_eq!(kernel.param("net.core.somaxconn").as_deref(), Some("1024"));
    }

    #[test]
    fn write_failure_surfaces_error() {
        let kernel = MockKernel::with_params(&[("kernel.ro", "0")]).read_only("kernel.ro");
        let sysctl = Sysctl::locate(&kernel, OsFamily::Linux, None).unwrap();
        let applier = SettingApplier::new(&sysctl);
        let mut state = HostState::new();
        let setting = Setting::new("kernel.ro", 1).saved();

        let err = applier.apply(&setting, &mut state).unwrap_err();
        assert!(matches!(err, ProviderError::CommandFailed { .. }));
        assert!(state.get(SYSCTL_NAMESPACE, "kernel.ro").is_none());
    }

    #[test]
    fn save_caches_value_after_change() {
        let kernel = MockKernel::with_params(&[("vm.swappiness", "60")]);
        let sysctl = Sysctl::locate(&kernel, OsFamily::Linux, None).unwrap();
        let applier = SettingApplier::new(&sysctl);
        let mut state = HostState::new();
        let setting = Setting::new("vm.swappiness", "10  ").saved();

        applier.apply(&setting, &mut state).unwrap();
        assert_eq!(state.get(SYSCTL_NAMESPACE, "vm.swappiness"), Some(&json!("10  ")));
    }

    #[test]
    fn unsaved_setting_never_cached() {
        let kernel = MockKernel::with_params(&[("vm.swappiness", "60")]);
        let sysctl = Sysctl::locate(&kernel, OsFamily::Linux, None).unwrap();
        let applier = SettingApplier::new(&sysctl);
        let mut state = HostState::new();

        let outcome = applier.apply(&Setting::new("vm.swappiness", 10), &mut state).unwrap();
        assert_eq!(outcome, Outcome::Changed);
        assert!(state.get(SYSCTL_NAMESPACE, "vm.swappiness").is_none());
    }

    #[test]
    fn unchanged_saved_setting_not_cached() {
        let kernel = MockKernel::with_params(&[("vm.swappiness", "10")]);
        let sysctl = Sysctl::locate(&kernel, OsFamily::Linux, None).unwrap();
        let applier = SettingApplier::new(&sysctl);
        let mut state = HostState::new();

        let outcome = applier.apply(&Setting::new("vm.swappiness", 10).saved(), &mut state).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert!(state.get(SYSCTL_NAMESPACE, "vm.swappiness").is_none());
    }

    #[test]
    fn large_unsigned_value_matches_exactly() {
        let yaml = "settings:\n  - name: kernel.shmmax\n    value: 18446744073692774399\n    save: true\n";
        let manifest = Manifest::parse(yaml).unwrap();
        let setting = &manifest.settings[0];
        assert_eq!(setting.render_value(), "18446744073692774399");

        let kernel = MockKernel::with_params(&[("kernel.shmmax", "18446744073692774399")]);
        let sysctl = Sysctl::locate(&kernel, OsFamily::Linux, None).unwrap();
        let mut state = HostState::new();
        let outcome = SettingApplier::new(&sysctl).apply(setting, &mut state).unwrap();

        assert_eq!(outcome, Outcome::Unchanged);
        assert!(kernel.writes().is_empty());
        assert_eq!(kernel.param("kernel.shmmax").as_deref(), Some("18446744073692774399"));
    }

    #[test]
    fn numeric_text_written_as_declared() {
        let manifest = Manifest::parse("settings:\n  - name: kernel.x\n    value: 0x10\n").unwrap();
        let kernel = MockKernel::with_params(&[("kernel.x", "0")]);
        let sysctl = Sysctl::locate(&kernel, OsFamily::Linux, None).unwrap();
        let outcome = SettingApplier::new(&sysctl)
            .apply(&manifest.settings[0], &mut HostState::new())
            .unwrap();
        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(kernel.param("kernel.x").as_deref(), Some("0x10"));
    }
}
