//! sysctl-provider CLI — runs a convergence pass from a YAML manifest.
//!
//! # Usage
//!
//! ```text
//! sysctl-provider converge /etc/sysctl-provider.yaml
//! sysctl-provider converge --json
//! sysctl-provider render site.yaml
//! sysctl-provider validate site.yaml
//! ```

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sysctl_provider_core::convergence::{run::run_manifest, RunReport};
use sysctl_provider_core::host::HostState;
use sysctl_provider_core::infrastructure::ShellRunner;
use sysctl_provider_core::provider::{ConfigAggregator, FileOutcome, LocalFileWriter};
use sysctl_provider_core::types::Manifest;

const DEFAULT_MANIFEST: &str = "/etc/sysctl-provider.yaml";

#[derive(Parser)]
#[command(name = "sysctl-provider")]
#[command(about = "Reconcile kernel parameters against a declared manifest", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the manifest to this system
    Converge {
        /// Manifest path (defaults to $SYSCTL_PROVIDER_MANIFEST or /etc/sysctl-provider.yaml)
        manifest: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        /// Host state file, overriding the manifest's `state_file`
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Print the config file body the manifest would produce
    Render { manifest: Option<PathBuf> },
    /// Parse and validate the manifest
    Validate { manifest: Option<PathBuf> },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("sysctl-provider: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(command: Commands) -> sysctl_provider_core::Result<()> {
    match command {
        Commands::Converge { manifest, json, state } => {
            let path = resolve_manifest(manifest);
            let manifest = Manifest::load(&path)?;
            tracing::info!(manifest = %path.display(), settings = manifest.settings.len(), "manifest loaded");
            let state_path = state.or_else(|| manifest.config.state_file.clone());
            let mut host_state = match &state_path {
                Some(path) => HostState::load(path)?,
                None => HostState::new(),
            };

            let report = run_manifest(&manifest, &ShellRunner, &mut LocalFileWriter, &mut host_state)?;

            if let Some(path) = &state_path {
                if host_state.is_dirty() {
                    host_state.save(path)?;
                }
            }
            if json {
                let out = serde_json::to_string_pretty(&report)
                    .map_err(|e| sysctl_provider_core::ProviderError::Serialization(e.to_string()))?;
                println!("{}", out);
            } else {
                print!("{}", format_report(&report));
            }
        }
        Commands::Render { manifest } => {
            let manifest = Manifest::load(&resolve_manifest(manifest))?;
            print!("{}", ConfigAggregator::render(&manifest.settings).body);
        }
        Commands::Validate { manifest } => {
            let path = resolve_manifest(manifest);
            let manifest = Manifest::load(&path)?;
            println!("{}: {} settings ok", path.display(), manifest.settings.len());
        }
    }
    Ok(())
}

fn resolve_manifest(arg: Option<PathBuf>) -> PathBuf {
    if let Some(path) = arg {
        return path;
    }
    if let Ok(path) = std::env::var("SYSCTL_PROVIDER_MANIFEST") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_MANIFEST)
}

fn format_report(report: &RunReport) -> String {
    let mut out = String::new();
    for status in &report.settings {
        let mark = if status.changed() { "changed" } else { "ok" };
        out.push_str(&format!("{:<8} {} = {}\n", mark, status.name, status.value));
    }
    for file in &report.files {
        let mark = match file.outcome {
            FileOutcome::Changed => "written",
            FileOutcome::Unchanged => "ok",
        };
        out.push_str(&format!("{:<8} {}\n", mark, file.path.display()));
    }
    out.push_str(&format!(
        "{} of {} settings changed\n",
        report.changed_count(),
        report.settings.len()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysctl_provider_core::convergence::SettingStatus;
    use sysctl_provider_core::provider::{FileCommit, Outcome};
    use std::collections::BTreeSet;

    #[test]
    fn resolve_manifest_prefers_argument() {
        let path = resolve_manifest(Some(PathBuf::from("/tmp/site.yaml")));
        assert_eq!(path, PathBuf::from("/tmp/site.yaml"));
    }

    #[test]
    fn resolve_manifest_from_env_then_default() {
        std::env::set_var("SYSCTL_PROVIDER_MANIFEST", "/tmp/test-sysctl-provider.yaml");
        assert_eq!(resolve_manifest(None), PathBuf::from("/tmp/test-sysctl-provider.yaml"));
        std::env::remove_var("SYSCTL_PROVIDER_MANIFEST");
        assert_eq!(resolve_manifest(None), PathBuf::from(DEFAULT_MANIFEST));
    }

    #[test]
    fn parse_converge_flags() {
        let cli = Cli::try_parse_from(["sysctl-provider", "-vv", "converge", "site.yaml", "--json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Converge { manifest, json, state } => {
                assert_eq!(manifest, Some(PathBuf::from("site.yaml")));
                assert!(json);
                assert!(state.is_none());
            }
            _ => panic!("expected converge"),
        }
    }

    #[test]
    fn format_report_lists_settings_and_files() {
        let report = RunReport {
            settings: vec![
                SettingStatus {
                    index: 0,
                    name: "vm.swappiness".into(),
                    value: "10".into(),
                    applied: Some(Outcome::Changed),
                    notified: false,
                },
                SettingStatus {
                    index: 1,
                    name: "kernel.sysrq".into(),
                    value: "0".into(),
                    applied: Some(Outcome::Unchanged),
                    notified: false,
                },
            ],
            files: vec![FileCommit {
                path: PathBuf::from("/etc/sysctl.conf"),
                outcome: FileOutcome::Unchanged,
                notified: BTreeSet::new(),
                participants: BTreeSet::from([0, 1]),
                contributions: 2,
            }],
        };
        let text = format_report(&report);
        assert!(text.contains("changed  vm.swappiness = 10\n"));
        assert!(text.contains("ok       kernel.sysrq = 0\n"));
        assert!(text.contains("ok       /etc/sysctl.conf\n"));
        assert!(text.ends_with("1 of 2 settings changed\n"));
    }
}
