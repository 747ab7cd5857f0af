// Systemd integration module

pub mod cli;
pub mod collection;
pub mod dbus;
pub mod filter;
pub mod models;
pub mod source;
pub mod table;
pub mod timespan;

#[cfg(test)]
mod tests;

pub use cli::{CliSource, CommandRunner, SystemCommandRunner};
pub use collection::UnitCollection;
pub use dbus::DbusSource;
pub use filter::{NameFilter, PatternSet};
pub use models::{ActiveState, LoadState, SubState, Timer, Unit, UNIT_TYPES};
pub use source::{select_source, DataSourceKind, Source};
pub use table::{Row, Table};
pub use timespan::convert_to_sec;
