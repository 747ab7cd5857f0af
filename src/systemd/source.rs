// Data source abstraction over the systemd backends

use crate::error::Result;
use crate::systemd::{CliSource, DbusSource, SystemCommandRunner, Timer, Unit, UnitCollection};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which backend acquires the systemd state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    /// Parse the text output of `systemctl` and `systemd-analyze`
    #[default]
    Cli,
    /// Query the systemd manager over D-Bus
    Dbus,
}

impl DataSourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            DataSourceKind::Cli => "cli",
            DataSourceKind::Dbus => "dbus",
        }
    }
}

/// Capabilities every backend offers
#[async_trait]
pub trait Source: Send + Sync {
    /// Short backend name for logging
    fn name(&self) -> &'static str;

    /// A single unit, failing if systemd doesn't know it
    async fn get_unit(&self, name: &str) -> Result<Unit>;

    /// All units of the system manager, followed by those of the user
    /// manager if `include_user_scope` is set
    async fn get_all_units(&self, include_user_scope: bool) -> Result<Vec<Unit>>;

    /// All units indexed by name; later duplicates replace earlier ones
    async fn get_all_units_cached(&self, include_user_scope: bool) -> Result<UnitCollection> {
        let units = self.get_all_units(include_user_scope).await?;
        Ok(units.into_iter().collect())
    }

    /// Boot duration in seconds, `None` while the boot is still in progress or
    /// when it can't be determined
    async fn get_startup_time(&self) -> Option<f64>;

    async fn get_all_timers(&self) -> Result<Vec<Timer>>;
}

/// Pick the backend for this run.
///
/// The D-Bus backend needs a reachable system bus; without one the command
/// line backend is used instead.
pub async fn select_source(kind: DataSourceKind) -> Box<dyn Source> {
    match kind {
        DataSourceKind::Cli => Box::new(CliSource::new(SystemCommandRunner)),
        DataSourceKind::Dbus => match DbusSource::connect().await {
            Ok(source) => {
                tracing::debug!("Using the {} backend", kind.label());
                Box::new(source)
            }
            Err(e) => {
                tracing::warn!("D-Bus backend unavailable, falling back to the command line: {:#}", e);
                Box::new(CliSource::new(SystemCommandRunner))
            }
        },
    }
}
