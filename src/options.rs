// Immutable run options resolved from the command line and the config file

use crate::cli::Cli;
use crate::config::Config;
use crate::error::CheckError;
use crate::systemd::{ActiveState, DataSourceKind, PatternSet, UNIT_TYPES};

/// Everything one check run needs to know, resolved before any host query
#[derive(Debug, Clone)]
pub struct Options {
    pub include: PatternSet,
    pub exclude: PatternSet,
    /// Unit requested with `--unit`, fetched on its own
    pub include_unit: Option<String>,
    pub expected_state: Option<ActiveState>,

    pub scope_timers: bool,
    pub timers_warning: u64,
    pub timers_critical: u64,

    pub scope_startup_time: bool,
    pub startup_time_warning: u64,
    pub startup_time_critical: u64,

    pub data_source: DataSourceKind,
    pub with_user_units: bool,
    pub performance_data: bool,
    pub verbose: u8,
}

impl Options {
    /// Merge command line and config file; flags win over file values
    pub fn resolve(cli: &Cli, config: &Config) -> Result<Self, CheckError> {
        let include = regexp_list(
            &cli.include,
            cli.include_unit.iter().map(String::as_str),
            &cli.include_type,
        )?;
        let exclude_regexps: Vec<String> = cli
            .exclude
            .iter()
            .chain(config.exclude.iter())
            .cloned()
            .collect();
        let exclude = regexp_list(
            &exclude_regexps,
            cli.exclude_unit.iter().map(String::as_str),
            &cli.exclude_type,
        )?;

        let data_source = if cli.dbus {
            DataSourceKind::Dbus
        } else if cli.cli {
            DataSourceKind::Cli
        } else {
            config.data_source
        };

        let performance_data = if cli.no_performance_data {
            false
        } else if cli.performance_data {
            true
        } else {
            config.performance_data
        };

        Ok(Self {
            include: PatternSet::new(include)?,
            exclude: PatternSet::new(exclude)?,
            include_unit: cli.include_unit.clone(),
            expected_state: cli.expected_state,
            scope_timers: cli.scope_timers,
            timers_warning: cli.timers_warning.unwrap_or(config.timers_warning),
            timers_critical: cli.timers_critical.unwrap_or(config.timers_critical),
            scope_startup_time: !cli.no_startup_time,
            startup_time_warning: cli.warning.unwrap_or(config.startup_time_warning),
            startup_time_critical: cli.critical.unwrap_or(config.startup_time_critical),
            data_source,
            with_user_units: cli.user || config.with_user_units,
            performance_data,
            verbose: cli.verbose,
        })
    }
}

/// Escape a unit name so it only matches itself as a prefix
pub fn escape_unit_name(name: &str) -> String {
    name.replace('.', "\\.")
}

/// A regular expression matching names ending in one of the unit types
pub fn unit_types_regexp<S: AsRef<str>>(types: &[S]) -> Result<String, CheckError> {
    let mut valid = Vec::with_capacity(types.len());
    for unit_type in types {
        let unit_type = unit_type.as_ref();
        if !UNIT_TYPES.iter().any(|known| *known == unit_type) {
            return Err(CheckError::InvalidUnitType(unit_type.to_string()));
        }
        valid.push(unit_type);
    }
    Ok(format!(r".*\.({})$", valid.join("|")))
}

/// Combine plain regexes, unit names and unit types into one list
pub fn regexp_list<'a>(
    regexps: &[String],
    unit_names: impl IntoIterator<Item = &'a str>,
    unit_types: &[String],
) -> Result<Vec<String>, CheckError> {
    let mut result = regexps.to_vec();
    result.extend(unit_names.into_iter().map(escape_unit_name));
    if !unit_types.is_empty() {
        result.push(unit_types_regexp(unit_types)?);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("check_systemd").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_unit_types_regexp() {
        assert_eq!(unit_types_regexp(&["service", "timer"]).unwrap(), r".*\.(service|timer)$");
        assert!(matches!(
            unit_types_regexp(&["service", "foo"]),
            Err(CheckError::InvalidUnitType(unit_type)) if unit_type == "foo"
        ));
    }

    #[test]
    fn test_escape_unit_name() {
        assert_eq!(escape_unit_name("php7.4-fpm.service"), r"php7\.4-fpm\.service");
    }

    #[test]
    fn test_regexp_list() {
        let list = regexp_list(
            &["n.*".to_string()],
            ["nginx.service"],
            &["mount".to_string()],
        )
        .unwrap();
        assert_eq!(list, vec!["n.*", r"nginx\.service", r".*\.(mount)$"]);
    }

    #[test]
    fn test_defaults_from_config() {
        let options = Options::resolve(&Cli::default(), &Config::default()).unwrap();
        assert!(options.include.is_empty());
        assert!(options.exclude.is_empty());
        assert_eq!(options.timers_warning, 518_400);
        assert_eq!(options.timers_critical, 604_800);
        assert_eq!(options.startup_time_warning, 60);
        assert_eq!(options.startup_time_critical, 120);
        assert!(options.scope_startup_time);
        assert!(!options.scope_timers);
        assert!(options.performance_data);
        assert_eq!(options.data_source, DataSourceKind::Cli);
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            data_source: DataSourceKind::Dbus,
            performance_data: true,
            startup_time_warning: 30,
            timers_critical: 100,
            ..Config::default()
        };
        let options = Options::resolve(&cli(&["--cli", "-p", "-w", "90"]), &config).unwrap();
        assert_eq!(options.data_source, DataSourceKind::Cli);
        assert!(!options.performance_data);
        assert_eq!(options.startup_time_warning, 90);
        assert_eq!(options.timers_critical, 100);
    }

    #[test]
    fn test_config_excludes_are_added() {
        let config = Config {
            exclude: vec![r"user@\d+\.service".to_string(), "a.*".to_string()],
            ..Config::default()
        };
        let options = Options::resolve(&cli(&["-e", "a.*", "--exclude-unit", "b.mount"]), &config)
            .unwrap();
        let sources: Vec<&str> = options.exclude.sources().collect();
        assert_eq!(sources, vec!["a.*", r"user@\d+\.service", r"b\.mount"]);
    }

    #[test]
    fn test_include_unit() {
        let options =
            Options::resolve(&cli(&["-u", "nginx.service"]), &Config::default()).unwrap();
        assert_eq!(options.include_unit.as_deref(), Some("nginx.service"));
        assert!(options.include.matches("nginx.service"));
        assert!(!options.include.matches("nginxXservice"));
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let err = Options::resolve(&cli(&["-e", "*service"]), &Config::default()).unwrap_err();
        assert!(matches!(err, CheckError::InvalidRegex { .. }));
    }

    #[test]
    fn test_invalid_unit_type_is_rejected() {
        let err = Options::resolve(&cli(&["--exclude-type", "foo"]), &Config::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The given type 'foo' is not a valid systemd unit type."
        );
    }
}
