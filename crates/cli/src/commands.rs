//! Clap command tree definition.

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("fsm-runner")
        .about("Run concurrent FSM workloads against a database backend")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log more (-v debug, -vv trace); RUST_LOG overrides")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(build_run())
        .subcommand(build_list())
        .subcommand(build_init())
}

// =========================================================================
// run
// =========================================================================

fn build_run() -> Command {
    Command::new("run")
        .about("Run every workload manifest in a directory")
        .arg(
            Arg::new("dir")
                .required(true)
                .help("Suite directory holding *.toml manifests"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Harness config file (default: <dir>/fsm.toml if present)"),
        )
        .arg(
            Arg::new("blacklist")
                .long("blacklist")
                .short('b')
                .help("Skip a manifest by file name or stem; repeatable")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Run seed; replays a previous run")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .help("Run workloads one after another")
                .action(ArgAction::SetTrue)
                .conflicts_with("parallel"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .help("Run workloads concurrently in thread-budgeted batches")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("keep")
                .long("keep")
                .help("Keep each workload's database after the run")
                .action(ArgAction::SetTrue),
        )
}

// =========================================================================
// list / init
// =========================================================================

fn build_list() -> Command {
    Command::new("list")
        .about("List built-in workloads and modifiers, or the manifests in a directory")
        .arg(Arg::new("dir").help("Suite directory to inspect"))
}

fn build_init() -> Command {
    Command::new("init")
        .about("Write a default fsm.toml into a directory")
        .arg(Arg::new("dir").default_value(".").help("Target directory"))
        .arg(
            Arg::new("force")
                .long("force")
                .help("Overwrite an existing fsm.toml")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_serial_conflicts_with_parallel() {
        let res = build_cli().try_get_matches_from(["fsm-runner", "run", "d", "--serial", "--parallel"]);
        assert!(res.is_err());
    }
}
