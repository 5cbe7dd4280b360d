//! The `write` action's renderer: every persisted declaration folded into one
//! config file body.
//!
//! Declarations are walked in the order given. A later declaration of the same
//! name replaces an earlier one, so a parameter may be redefined any number of
//! times but only its final value reaches the file. The file body itself is
//! sorted by name, independent of declaration order.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::setting::Setting;

/// Comment block at the top of every rendered file.
pub const HEADER: &str = "#\n# content managed by sysctl-provider, local changes will be overwritten\n#\n";

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub body: String,
    /// Indices (into the declaration list) of every persisted declaration,
    /// including ones whose value was overridden by a later redefinition.
    pub participants: BTreeSet<usize>,
}

impl Rendered {
    /// Number of `name=value` lines in the body.
    pub fn entry_count(&self) -> usize {
        self.body.lines().filter(|l| !l.starts_with('#')).count()
    }
}

pub struct ConfigAggregator;

impl ConfigAggregator {
    /// Render the config file body from the full ordered declaration list.
    ///
    /// The caller must pass declarations in declaration order; the last
    /// persisted occurrence of each name wins.
    pub fn render(declarations: &[Setting]) -> Rendered {
        let mut lines: BTreeMap<&str, String> = BTreeMap::new();
        let mut participants = BTreeSet::new();

        for (index, setting) in declarations.iter().enumerate() {
            if !setting.persist() {
                continue;
            }
            lines.insert(&setting.name, format!("{}\n", setting.render_value()));
            participants.insert(index);
        }

        let mut body = String::from(HEADER);
        for (name, line) in &lines {
            body.push_str(name);
            body.push('=');
            body.push_str(line);
        }

        Rendered { body, participants }
    }
}
