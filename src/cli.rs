// Command line arguments

use crate::systemd::ActiveState;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

const AFTER_HELP: &str = "\
Performance data:
  - count_units
  - startup_time
  - units_activating
  - units_active
  - units_failed
  - units_inactive";

/// Nagios / Icinga monitoring plugin to check systemd
#[derive(Parser, Debug, Default)]
#[command(name = "check_systemd")]
#[command(author, about, long_about = None, after_help = AFTER_HELP)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Increase output verbosity
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Increase debug logging (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub debug: u8,

    /// Show version information
    #[arg(short = 'V', long)]
    pub version: bool,

    /// Show detailed build information
    #[arg(long)]
    pub build_info: bool,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Include units matching a regular expression, for example
    /// 'user@\d+\.service' (repeatable)
    #[arg(short = 'I', long, value_name = "REGEXP", help_heading = "Units")]
    pub include: Vec<String>,

    /// Name of the systemd unit that is being tested
    #[arg(
        short = 'u',
        long = "unit",
        visible_alias = "include-unit",
        value_name = "UNIT_NAME",
        help_heading = "Units"
    )]
    pub include_unit: Option<String>,

    /// One or more unit types (for example: 'service', 'timer')
    #[arg(long, value_name = "UNIT_TYPE", num_args = 1.., help_heading = "Units")]
    pub include_type: Vec<String>,

    /// Exclude units matching a regular expression (repeatable)
    #[arg(short = 'e', long, value_name = "REGEXP", help_heading = "Units")]
    pub exclude: Vec<String>,

    /// Names of systemd units to exclude
    #[arg(long, value_name = "UNIT_NAME", num_args = 1.., help_heading = "Units")]
    pub exclude_unit: Vec<String>,

    /// Unit type to exclude (repeatable)
    #[arg(long, value_name = "UNIT_TYPE", help_heading = "Units")]
    pub exclude_type: Vec<String>,

    /// Active state the units must have (for example: active, inactive)
    #[arg(
        long = "state",
        visible_aliases = ["required", "expected-state"],
        value_name = "STATE",
        value_parser = parse_active_state,
        help_heading = "Units"
    )]
    pub expected_state: Option<ActiveState>,

    /// Detect dead timers, i.e. timers without a next activation
    #[arg(
        short = 't',
        long = "timers",
        visible_alias = "dead-timers",
        help_heading = "Timers"
    )]
    pub scope_timers: bool,

    /// Seconds since the last activation of a dead timer to trigger a
    /// warning [default: 6 days]
    #[arg(
        short = 'W',
        long,
        visible_alias = "dead-timers-warning",
        value_name = "SECONDS",
        help_heading = "Timers"
    )]
    pub timers_warning: Option<u64>,

    /// Seconds since the last activation of a dead timer to trigger a
    /// critical state [default: 7 days]
    #[arg(
        short = 'C',
        long,
        visible_alias = "dead-timers-critical",
        value_name = "SECONDS",
        help_heading = "Timers"
    )]
    pub timers_critical: Option<u64>,

    /// Don't check the startup time; it is still reported as performance data
    #[arg(short = 'n', long, help_heading = "Startup time")]
    pub no_startup_time: bool,

    /// Startup time in seconds to result in a warning [default: 60]
    #[arg(short, long, value_name = "SECONDS", help_heading = "Startup time")]
    pub warning: Option<u64>,

    /// Startup time in seconds to result in a critical state [default: 120]
    #[arg(short, long, value_name = "SECONDS", help_heading = "Startup time")]
    pub critical: Option<u64>,

    /// Query systemd over D-Bus instead of parsing command line output
    #[arg(long, conflicts_with = "cli", help_heading = "Data acquisition")]
    pub dbus: bool,

    /// Parse the text output of systemctl and systemd-analyze
    #[arg(long, help_heading = "Data acquisition")]
    pub cli: bool,

    /// Also check user (systemctl --user) units
    #[arg(long, help_heading = "Data acquisition")]
    pub user: bool,

    /// Attach performance data to the plugin output
    #[arg(
        short = 'P',
        long,
        conflicts_with = "no_performance_data",
        help_heading = "Performance data"
    )]
    pub performance_data: bool,

    /// Attach no performance data to the plugin output
    #[arg(short = 'p', long, help_heading = "Performance data")]
    pub no_performance_data: bool,
}

/// Parse an active state, ignoring case
pub fn parse_active_state(value: &str) -> Result<ActiveState, String> {
    value.to_lowercase().parse().map_err(|_| {
        let valid: Vec<&str> = ActiveState::ALL.iter().map(ActiveState::as_str).collect();
        format!("possible values: {}", valid.join(", "))
    })
}
