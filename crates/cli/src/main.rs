//! fsm-runner - run a directory of FSM workload manifests.
//!
//! Three commands:
//! - **run**: `fsm-runner run <dir>` discovers `*.toml` manifests, applies the
//!   blacklist, runs the suite and exits 0 only if every workload passed
//! - **list**: `fsm-runner list [dir]` shows the registry or a suite's manifests
//! - **init**: `fsm-runner init [dir]` writes a default `fsm.toml`
//!
//! Workloads run against the in-process memory backend.

mod commands;
mod format;
mod parse;

use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use fsmharness::{
    builtin_registry, load_suite, run_suite, HarnessConfig, MemoryCluster, Runner,
    CONFIG_FILE_NAME,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_error, format_manifests, format_registry, format_suite, OutputMode};
use parse::{matches_to_action, CliAction, RunArgs};

fn main() {
    let matches = build_cli().get_matches();

    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    init_tracing(matches.get_count("verbose"));

    let action = match matches_to_action(&matches) {
        Ok(action) => action,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    match execute(action, output_mode) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            process::exit(1);
        }
    }
}

/// Logs go to stderr so `--json` output stays parseable.
fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn execute(action: CliAction, mode: OutputMode) -> Result<i32> {
    match action {
        CliAction::Run(args) => run(&args, mode),
        CliAction::List { dir } => {
            let registry = builtin_registry();
            let out = match dir {
                None => format_registry(&registry, mode),
                Some(dir) => {
                    let config = HarnessConfig::load_or_default(&dir)?;
                    let loaded = load_suite(&dir, &registry, &config.blacklist)
                        .with_context(|| format!("listing {}", dir.display()))?;
                    format_manifests(&loaded, mode)
                }
            };
            println!("{}", out);
            Ok(0)
        }
        CliAction::Init { dir, force } => {
            init(&dir, force)?;
            Ok(0)
        }
    }
}

fn run(args: &RunArgs, mode: OutputMode) -> Result<i32> {
    if !args.dir.is_dir() {
        bail!("suite directory {} does not exist", args.dir.display());
    }
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::load_or_default(&args.dir)?,
    };
    args.apply(&mut config);

    let options = config.to_run_options()?;
    let run_mode = config.run_mode()?;
    info!(
        dir = %args.dir.display(),
        seed = options.seed,
        mode = ?run_mode,
        blacklist = ?config.blacklist,
        "running suite"
    );

    let runner = Runner::new(Arc::new(MemoryCluster::new()), options);
    let report = run_suite(&runner, &args.dir, &builtin_registry(), &config.blacklist, run_mode)
        .with_context(|| format!("running suite {}", args.dir.display()))?;

    println!("{}", format_suite(&report, mode));
    Ok(report.exit_code())
}

fn init(dir: &Path, force: bool) -> Result<()> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    std::fs::write(&path, HarnessConfig::default_toml())
        .with_context(|| format!("writing {}", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
