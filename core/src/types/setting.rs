//! Declared kernel parameter settings.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{ProviderError, Result};

/// A desired parameter value as declared.
///
/// Numbers keep their source text, so `1.50`, `0x10` or a value above
/// `i64::MAX` reach the tool and the config file exactly as written.
/// Comparison against the live value goes through [`DesiredValue::tokens`].
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum DesiredValue {
    Boolean(bool),
    Number(String),
    Text(String),
}

impl DesiredValue {
    /// Classify a plain scalar. Only the YAML core boolean words become
    /// booleans; anything numeric-looking stays as its literal text.
    pub fn from_scalar(raw: &str) -> Self {
        match raw {
            "true" | "True" | "TRUE" => DesiredValue::Boolean(true),
            "false" | "False" | "FALSE" => DesiredValue::Boolean(false),
            _ if looks_numeric(raw) => DesiredValue::Number(raw.to_string()),
            _ => DesiredValue::Text(raw.to_string()),
        }
    }

    /// Raw textual form. Booleans follow kernel convention (`1` / `0`).
    pub fn render(&self) -> String {
        match self {
            DesiredValue::Boolean(true) => "1".into(),
            DesiredValue::Boolean(false) => "0".into(),
            DesiredValue::Number(n) => n.clone(),
            DesiredValue::Text(s) => s.clone(),
        }
    }

    /// Whitespace-normalized token sequence, used for comparison only.
    pub fn tokens(&self) -> Vec<String> {
        tokens(&self.render()).into_iter().map(str::to_string).collect()
    }
}

fn looks_numeric(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if let Some(hex) = digits.strip_prefix("0x") {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some(oct) = digits.strip_prefix("0o") {
        return !oct.is_empty() && oct.chars().all(|c| c.is_digit(8));
    }
    digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') && digits.parse::<f64>().is_ok()
}

impl<'de> Deserialize<'de> for DesiredValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // serde_yaml yields the source text of any plain scalar when a
        // string is requested, so `0x10` arrives as "0x10", not 16.
        let raw = String::deserialize(deserializer)?;
        Ok(DesiredValue::from_scalar(&raw))
    }
}

impl fmt::Display for DesiredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for DesiredValue {
    fn from(s: &str) -> Self {
        DesiredValue::Text(s.to_string())
    }
}

impl From<String> for DesiredValue {
    fn from(s: String) -> Self {
        DesiredValue::Text(s)
    }
}

impl From<i64> for DesiredValue {
    fn from(n: i64) -> Self {
        DesiredValue::Number(n.to_string())
    }
}

impl From<i32> for DesiredValue {
    fn from(n: i32) -> Self {
        DesiredValue::Number(n.to_string())
    }
}

impl From<bool> for DesiredValue {
    fn from(b: bool) -> Self {
        DesiredValue::Boolean(b)
    }
}

/// Split a value into its whitespace-separated tokens, ignoring surrounding
/// and repeated whitespace.
pub fn tokens(value: &str) -> Vec<&str> {
    value.split_whitespace().collect()
}

/// True when the live value and the desired value normalize to the same
/// token sequence.
pub fn values_match(current: &str, desired: &DesiredValue) -> bool {
    let current = tokens(current);
    let desired = desired.tokens();
    current.len() == desired.len() && current.iter().zip(desired.iter()).all(|(a, b)| a == b)
}

/// Resource actions a declaration can request from the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Write the value through the tuning utility when it differs.
    Set,
    /// Contribute to the shared config file.
    Write,
    /// Declared but inert.
    Nothing,
}

fn default_actions() -> Vec<Action> {
    vec![Action::Set]
}

/// One declared kernel parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Setting {
    /// Parameter key, e.g. `net.ipv4.ip_forward`.
    pub name: String,

    pub value: DesiredValue,

    /// Actions requested, in order. Defaults to `[set]`.
    #[serde(default = "default_actions")]
    pub actions: Vec<Action>,

    /// Cache the value into host state after a change.
    #[serde(default)]
    pub save: bool,
}

impl Setting {
    pub fn new(name: &str, value: impl Into<DesiredValue>) -> Self {
        Setting {
            name: name.to_string(),
            value: value.into(),
            actions: default_actions(),
            save: false,
        }
    }

    pub fn with_actions(mut self, actions: &[Action]) -> Self {
        self.actions = actions.to_vec();
        self
    }

    pub fn saved(mut self) -> Self {
        self.save = true;
        self
    }

    /// Whether this declaration participates in the shared config file.
    pub fn persist(&self) -> bool {
        self.actions.contains(&Action::Write)
    }

    /// Whether this declaration asks for the live value to be enforced.
    pub fn enforces(&self) -> bool {
        self.actions.contains(&Action::Set)
    }

    /// Reject names that cannot be safely spliced into a command line or a
    /// `key=value` line.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| ProviderError::InvalidSetting {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(invalid("name must not contain whitespace"));
        }
        if self.name.contains(['=', '\'', '"']) {
            return Err(invalid("name must not contain '=' or quotes"));
        }
        if self.render_value().contains('\n') {
            return Err(invalid("value must be a single line"));
        }
        Ok(())
    }

    pub fn render_value(&self) -> String {
        self.value.render()
    }
}
