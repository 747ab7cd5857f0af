// Error types for check_systemd

use thiserror::Error;

/// Result type alias using anyhow::Error
pub type Result<T> = anyhow::Result<T>;

/// Errors raised while acquiring and evaluating systemd state
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Invalid regular expression: '{pattern}'")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("The given type '{0}' is not a valid systemd unit type.")]
    InvalidUnitType(String),

    #[error("Invalid {kind} state: {value}")]
    InvalidState { kind: &'static str, value: String },

    #[error("Invalid state specification '{0}', expected '<property>:<value>'")]
    InvalidStateSpec(String),

    #[error("Failed to execute '{command}': {message}")]
    CommandLaunch { command: String, message: String },

    #[error("The command '{command}' exits with a non-zero return code ({code})")]
    CommandExit { command: String, code: i32 },

    #[error("The command '{command}' was terminated by a signal")]
    CommandSignaled { command: String },

    #[error("The command '{command}' wrote to stderr: {stderr}")]
    CommandStderr { command: String, stderr: String },

    #[error(
        "The column heading '{0}' couldn't be found in the table header. \
         Possibly the table layout of systemctl has changed."
    )]
    MissingColumn(String),

    #[error("Table row {index} is out of bounds ({rows} body rows)")]
    RowOutOfBounds { index: usize, rows: usize },

    #[error("Malformed property line: '{0}'")]
    MalformedProperty(String),

    #[error("The property '{property}' is missing for unit '{unit}'")]
    MissingProperty { unit: String, property: String },

    #[error("The unit '{0}' couldn't be found.")]
    UnitNotFound(String),

    #[error(
        "Please verify your --include-* and --exclude-* options. \
         No units have been added for testing."
    )]
    NoUnits,

    #[error("Failed to query systemd over D-Bus: {0}")]
    Dbus(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
