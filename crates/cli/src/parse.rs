//! ArgMatches → CliAction conversion.
//!
//! Flags given on the command line win over the suite's `fsm.toml`.

use std::path::PathBuf;

use clap::ArgMatches;
use fsmharness::HarnessConfig;

/// What the user asked for.
#[derive(Debug)]
pub enum CliAction {
    /// Run a suite directory.
    Run(RunArgs),
    /// List the registry, or the manifests of a directory.
    List { dir: Option<PathBuf> },
    /// Write a default `fsm.toml`.
    Init { dir: PathBuf, force: bool },
}

/// Arguments of `run`.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub dir: PathBuf,
    pub config: Option<PathBuf>,
    pub blacklist: Vec<String>,
    pub seed: Option<u64>,
    pub mode: Option<&'static str>,
    pub keep: bool,
}

impl RunArgs {
    /// Layer the command-line flags over a loaded config.
    pub fn apply(&self, config: &mut HarnessConfig) {
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(mode) = self.mode {
            config.mode = mode.to_string();
        }
        if self.keep {
            config.cleanup = false;
        }
        for entry in &self.blacklist {
            if !config.blacklist.contains(entry) {
                config.blacklist.push(entry.clone());
            }
        }
    }
}

/// Translate parsed arguments into an action.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    match matches.subcommand() {
        Some(("run", sub)) => {
            let dir = sub
                .get_one::<String>("dir")
                .map(PathBuf::from)
                .ok_or("run: missing suite directory")?;
            let mode = if sub.get_flag("serial") {
                Some("serial")
            } else if sub.get_flag("parallel") {
                Some("parallel")
            } else {
                None
            };
            Ok(CliAction::Run(RunArgs {
                dir,
                config: sub.get_one::<String>("config").map(PathBuf::from),
                blacklist: sub
                    .get_many::<String>("blacklist")
                    .map(|v| v.cloned().collect())
                    .unwrap_or_default(),
                seed: sub.get_one::<u64>("seed").copied(),
                mode,
                keep: sub.get_flag("keep"),
            }))
        }
        Some(("list", sub)) => Ok(CliAction::List {
            dir: sub.get_one::<String>("dir").map(PathBuf::from),
        }),
        Some(("init", sub)) => Ok(CliAction::Init {
            dir: sub
                .get_one::<String>("dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            force: sub.get_flag("force"),
        }),
        Some((other, _)) => Err(format!("unknown command '{}'", other)),
        None => Err("no command given; try --help".to_string()),
    }
}
