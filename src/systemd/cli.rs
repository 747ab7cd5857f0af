// Command line data source: systemctl and systemd-analyze output parsing

use crate::error::{CheckError, Result};
use crate::systemd::table::Table;
use crate::systemd::timespan::convert_to_sec;
use crate::systemd::{Source, Timer, Unit};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;

/// Runs a host command and captures its standard output
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Execute `args` (program first) and return stdout, `None` if it was empty.
    ///
    /// A launch failure, a non-zero exit code or any output on stderr is an
    /// error.
    async fn run(&self, args: Vec<String>) -> Result<Option<String>>;
}

/// [`CommandRunner`] spawning real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, args: Vec<String>) -> Result<Option<String>> {
        let command = args.join(" ");
        let (program, rest) = args.split_first().ok_or_else(|| CheckError::CommandLaunch {
            command: command.clone(),
            message: "empty command line".to_string(),
        })?;

        tracing::debug!("Execute command on the command line: {}", command);
        let output = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CheckError::CommandLaunch {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(match output.status.code() {
                Some(code) => CheckError::CommandExit { command, code },
                None => CheckError::CommandSignaled { command },
            }
            .into());
        }

        if !output.stderr.is_empty() {
            return Err(CheckError::CommandStderr {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        if output.stdout.is_empty() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::trace!("stdout:\n{}", stdout);
        Ok(Some(stdout))
    }
}

/// Properties requested by `get_unit`
const UNIT_PROPERTIES: [&str; 4] = ["Id", "ActiveState", "SubState", "LoadState"];

fn list_units_command(user: bool) -> Vec<String> {
    let mut command = vec!["systemctl", "list-units", "--all"];
    if user {
        command.push("--user");
    }
    command.into_iter().map(String::from).collect()
}

fn show_unit_command(name: &str) -> Vec<String> {
    let mut command = vec!["systemctl".to_string(), "show".to_string()];
    for property in UNIT_PROPERTIES {
        command.push("--property".to_string());
        command.push(property.to_string());
    }
    command.push(name.to_string());
    command
}

fn list_timers_command() -> Vec<String> {
    vec!["systemctl".into(), "list-timers".into(), "--all".into()]
}

fn analyze_command() -> Vec<String> {
    vec!["systemd-analyze".into()]
}

/// Source reading the text output of the systemd command line tools
#[derive(Debug, Clone, Default)]
pub struct CliSource<R = SystemCommandRunner> {
    runner: R,
}

impl<R: CommandRunner> CliSource<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn list_units(&self, user: bool) -> Result<Vec<Unit>> {
        let Some(stdout) = self.runner.run(list_units_command(user)).await? else {
            return Ok(Vec::new());
        };
        parse_unit_table(&stdout)
    }
}

#[async_trait]
impl<R: CommandRunner> Source for CliSource<R> {
    fn name(&self) -> &'static str {
        "cli"
    }

    async fn get_unit(&self, name: &str) -> Result<Unit> {
        let stdout = self
            .runner
            .run(show_unit_command(name))
            .await?
            .ok_or_else(|| CheckError::UnitNotFound(name.to_string()))?;
        let unit = parse_unit_properties(name, &stdout)?;
        tracing::debug!("Properties of unit '{}': {:?}", name, unit);
        Ok(unit)
    }

    async fn get_all_units(&self, include_user_scope: bool) -> Result<Vec<Unit>> {
        let mut units = self.list_units(false).await?;
        if include_user_scope {
            units.extend(self.list_units(true).await?);
        }
        Ok(units)
    }

    async fn get_startup_time(&self) -> Option<f64> {
        // A boot that hasn't finished yet makes systemd-analyze fail
        match self.runner.run(analyze_command()).await {
            Ok(stdout) => stdout.as_deref().and_then(parse_startup_time),
            Err(e) => {
                tracing::debug!("No startup time available: {:#}", e);
                None
            }
        }
    }

    async fn get_all_timers(&self) -> Result<Vec<Timer>> {
        let Some(stdout) = self.runner.run(list_timers_command()).await? else {
            return Ok(Vec::new());
        };
        parse_timer_table(&stdout)
    }
}

/// Parse the `key=value` lines of `systemctl show`
pub fn parse_unit_properties(name: &str, stdout: &str) -> Result<Unit> {
    let mut properties: HashMap<&str, &str> = HashMap::new();
    for line in stdout.lines().filter(|line| !line.is_empty()) {
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| CheckError::MalformedProperty(line.to_string()))?;
        properties.insert(key, value);
    }

    Ok(Unit::new(
        required_property(&properties, name, "Id")?,
        required_property(&properties, name, "ActiveState")?,
        required_property(&properties, name, "SubState")?,
        required_property(&properties, name, "LoadState")?,
    )?)
}

fn required_property<'a>(
    properties: &HashMap<&str, &'a str>,
    unit: &str,
    key: &str,
) -> std::result::Result<&'a str, CheckError> {
    properties
        .get(key)
        .copied()
        .ok_or_else(|| CheckError::MissingProperty {
            unit: unit.to_string(),
            property: key.to_string(),
        })
}

/// Parse the table of `systemctl list-units`
pub fn parse_unit_table(stdout: &str) -> Result<Vec<Unit>> {
    let table = Table::new(stdout);
    table.check_header(&["unit", "active", "sub", "load"])?;
    let mut units = Vec::with_capacity(table.row_count());
    for row in table.rows() {
        units.push(Unit::new(
            row.require("unit")?,
            row.require("active")?,
            row.require("sub")?,
            row.require("load")?,
        )?);
    }
    Ok(units)
}

/// Parse the table of `systemctl list-timers`.
///
/// `n/a` marks a missing value. The remaining time is taken from the `left`
/// column when present, since `next` holds a calendar date.
pub fn parse_timer_table(stdout: &str) -> Result<Vec<Timer>> {
    let table = Table::new(stdout);
    table.check_header(&["unit", "next", "passed"])?;
    let mut timers = Vec::with_capacity(table.row_count());
    for row in table.rows() {
        let next = match row.require("next")? {
            "n/a" => None,
            next => Some(convert_to_sec(row.get("left").unwrap_or(next))),
        };
        let passed = match row.require("passed")? {
            "n/a" => None,
            passed => Some(convert_to_sec(passed)),
        };
        timers.push(Timer {
            name: row.require("unit")?.to_string(),
            next,
            passed,
        });
    }
    Ok(timers)
}

/// Extract the boot duration from the `systemd-analyze` summary.
///
/// ```text
/// Startup finished in 1.672s (kernel) + 21.378s (userspace) = 23.050s
/// graphical.target reached after 1min 2.154s in userspace
/// ```
///
/// The second line is missing on some systems, then the total is used.
pub fn parse_startup_time(stdout: &str) -> Option<f64> {
    static REACHED: OnceLock<Regex> = OnceLock::new();
    static TOTAL: OnceLock<Regex> = OnceLock::new();
    let reached = REACHED
        .get_or_init(|| Regex::new(r"reached after (.+) in userspace").expect("static regex is valid"));
    let total = TOTAL.get_or_init(|| Regex::new(r" = (.+)\n").expect("static regex is valid"));

    reached
        .captures(stdout)
        .or_else(|| total.captures(stdout))
        .map(|captures| convert_to_sec(&captures[1]))
}
