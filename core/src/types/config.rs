//! Provider configuration and the YAML manifest that carries it.
//!
//! A manifest holds the provider configuration together with the ordered
//! list of declared settings. Declaration order is significant: it decides
//! which of several same-named `write` declarations ends up in the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ProviderError, Result};
use crate::types::setting::Setting;


/// Provider-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Shared config file written by the `write` action.
    pub sysctl_file: PathBuf,

    /// Owner of the config file. `None` leaves ownership untouched.
    pub owner: Option<String>,

    /// Group of the config file. `None` leaves ownership untouched.
    pub group: Option<String>,

    /// Octal permission bits of the config file, e.g. `"0644"`.
    pub mode: String,

    /// OS family override for the command dialect (e.g. `"linux"`).
    pub os: Option<String>,

    /// Explicit path to the tuning utility; skips the PATH lookup.
    pub tool: Option<PathBuf>,

    /// Where host-wide state is persisted between runs.
    pub state_file: Option<PathBuf>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            sysctl_file: PathBuf::from("/etc/sysctl.conf"),
            owner: Some("root".into()),
            group: Some("root".into()),
            mode: "0644".into(),
            os: None,
            tool: None,
            state_file: None,
        }
    }
}

impl ProviderConfig {
    /// Permission bits parsed from the octal `mode` string.
    pub fn mode_bits(&self) -> Result<u32> {
        let bits = u32::from_str_radix(self.mode.trim_start_matches("0o"), 8)
            .map_err(|_| ProviderError::Config(format!("invalid file mode '{}'", self.mode)))?;
        if bits > 0o7777 {
            return Err(ProviderError::Config(format!("file mode '{}' out of range", self.mode)));
        }
        Ok(bits)
    }
}


/// Top-level manifest: configuration plus ordered declarations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    #[serde(default)]
    pub config: ProviderConfig,

    #[serde(default)]
    pub settings: Vec<Setting>,
}

impl Manifest {
    /// Load a manifest from a YAML file.
    pub fn load(path: &Path) -> Result<Manifest> {
        let content = std::fs::read_to_string(path).map_err(|e| ProviderError::io(path, e))?;
        Manifest::parse(&content)
    }

    /// Parse a manifest from a YAML string and validate it.
    pub fn parse(content: &str) -> Result<Manifest> {
        let manifest: Manifest = serde_yaml::from_str(content)
            .map_err(|e| ProviderError::Config(format!("invalid manifest: {}", e)))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        self.config.mode_bits()?;
        for setting in &self.settings {
            setting.validate()?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::setting::{Action, DesiredValue};

    #[test]
    fn parse_full_manifest() {
        let yaml = r#"
config:
  sysctl_file: /tmp/sysctl.conf
  owner: admin
  group: wheel
  mode: "0640"
  os: linux
  state_file: /var/lib/sysctl-provider/state.json
settings:
  - name: net.ipv4.ip_forward
    value: 1
    actions: [set, write]
    save: true
  - name: net.ipv4.tcp_rmem
    value: "4096 87380 6291456"
  - name: kernel.sysrq
    value: false
    actions: [write]
"#;
        let m = Manifest::parse(yaml).unwrap();
        assert_eq!(m.config.sysctl_file, PathBuf::from("/tmp/sysctl.conf"));
        assert_eq!(m.config.owner.as_deref(), Some("admin"));
        assert_eq!(m.config.group.as_deref(), Some("wheel"));
        assert_eq!(m.config.mode_bits().unwrap(), 0o640);
        assert_eq!(m.config.os.as_deref(), Some("linux"));
        assert_eq!(m.settings.len(), 3);
        assert_eq!(m.settings[0].actions, vec![Action::Set, Action::Write]);
        assert!(m.settings[0].save);
        assert_eq!(m.settings[1].actions, vec![Action::Set]);
        assert_eq!(m.settings[1].value, DesiredValue::Text("4096 87380 6291456".into()));
        assert_eq!(m.settings[2].value, DesiredValue::Boolean(false));
    }

    #[test]
    fn parse_minimal_manifest_uses_defaults() {
        let m = Manifest::parse("settings: []\n").unwrap();
        assert_eq!(m.config, ProviderConfig::default());
        assert_eq!(m.config.sysctl_file, PathBuf::from("/etc/sysctl.conf"));
        assert_eq!(m.config.mode_bits().unwrap(), 0o644);
        assert!(m.settings.is_empty());
    }

    #[test]
    fn parse_partial_config_keeps_other_defaults() {
        let m = Manifest::parse("config:\n  sysctl_file: /etc/sysctl.d/99-local.conf\n").unwrap();
        assert_eq!(m.config.sysctl_file, PathBuf::from("/etc/sysctl.d/99-local.conf"));
        assert_eq!(m.config.owner.as_deref(), Some("root"));
        assert_eq!(m.config.mode, "0644");
    }

    #[test]
    fn parse_setting_missing_value_fails() {
        let err = Manifest::parse("settings:\n  - name: vm.swappiness\n").unwrap_err();
        assert!(err.to_string().contains("invalid manifest"));
    }

    #[test]
    fn parse_rejects_empty_name() {
        let err = Manifest::parse("settings:\n  - name: \"\"\n    value: 1\n").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSetting { .. }));
    }

    #[test]
    fn invalid_mode_rejected() {
        let err = Manifest::parse("config:\n  mode: \"0999\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid file mode"));
        let cfg = ProviderConfig {
            mode: "17777".into(),
            ..ProviderConfig::default()
        };
        assert!(cfg.mode_bits().is_err());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Manifest::load(Path::new("/nonexistent/sysctl-provider.yaml")).unwrap_err();
        assert!(matches!(err, ProviderError::Io { .. }));
    }
}
