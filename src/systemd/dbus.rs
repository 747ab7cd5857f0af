// Systemd D-Bus data source using zbus

use crate::error::{CheckError, Result};
use crate::systemd::timespan::round_millis;
use crate::systemd::{LoadState, Source, Timer, Unit};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;
use zbus::zvariant::OwnedObjectPath;
use zbus::{Connection, Proxy};

const DESTINATION: &str = "org.freedesktop.systemd1";
const MANAGER_PATH: &str = "/org/freedesktop/systemd1";
const MANAGER_INTERFACE: &str = "org.freedesktop.systemd1.Manager";
const UNIT_INTERFACE: &str = "org.freedesktop.systemd1.Unit";
const TIMER_INTERFACE: &str = "org.freedesktop.systemd1.Timer";

/// How long to wait for a bus before giving up
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// One entry of the `ListUnits` reply: name, description, load state, active
/// state, sub state, followed unit, unit path, job id, job type, job path
pub type ListUnitRecord = (
    String,
    String,
    String,
    String,
    String,
    String,
    OwnedObjectPath,
    u32,
    String,
    OwnedObjectPath,
);

/// Source querying the systemd manager over D-Bus
#[derive(Clone)]
pub struct DbusSource {
    connection: Connection,
    user_connection: OnceCell<Connection>,
}

impl DbusSource {
    /// Connect to the system bus
    pub async fn connect() -> Result<Self> {
        let connection = connect_within(CONNECTION_TIMEOUT, "system", Connection::system()).await?;
        Ok(Self {
            connection,
            user_connection: OnceCell::new(),
        })
    }

    /// The session bus, connected on first use.
    ///
    /// There is usually none when running from a monitoring daemon.
    async fn user_connection(&self) -> Result<&Connection> {
        let connection = self
            .user_connection
            .get_or_try_init(|| connect_within(CONNECTION_TIMEOUT, "user", Connection::session()))
            .await?;
        Ok(connection)
    }

    async fn manager(&self, connection: &Connection) -> Result<Proxy<'static>> {
        Proxy::new(connection, DESTINATION, MANAGER_PATH, MANAGER_INTERFACE)
            .await
            .map_err(|e| CheckError::Dbus(e.to_string()).into())
    }

    async fn list_units(&self, connection: &Connection) -> Result<Vec<ListUnitRecord>> {
        let proxy = self.manager(connection).await?;
        let records: Vec<ListUnitRecord> = proxy
            .call("ListUnits", &())
            .await
            .map_err(|e| CheckError::Dbus(format!("ListUnits: {}", e)))?;
        tracing::debug!("ListUnits returned {} units", records.len());
        Ok(records)
    }

    async fn unit_property(&self, path: &OwnedObjectPath, property: &str) -> Result<String> {
        let proxy = Proxy::new(&self.connection, DESTINATION, path.as_str(), UNIT_INTERFACE)
            .await
            .map_err(|e| CheckError::Dbus(e.to_string()))?;
        let value: String = proxy
            .get_property(property)
            .await
            .map_err(|e| CheckError::Dbus(format!("{} of {}: {}", property, path.as_str(), e)))?;
        Ok(value)
    }

    /// When the default target became active, zero if it never did
    async fn default_target_reached(&self, manager: &Proxy<'_>) -> Result<u64> {
        let target: String = manager
            .call("GetDefaultTarget", &())
            .await
            .map_err(|e| CheckError::Dbus(format!("GetDefaultTarget: {}", e)))?;
        let path: OwnedObjectPath = manager
            .call("LoadUnit", &(target.as_str(),))
            .await
            .map_err(|e| CheckError::Dbus(format!("LoadUnit {}: {}", target, e)))?;
        let proxy = Proxy::new(&self.connection, DESTINATION, path.as_str(), UNIT_INTERFACE)
            .await
            .map_err(|e| CheckError::Dbus(e.to_string()))?;
        let reached: u64 = proxy
            .get_property("ActiveEnterTimestampMonotonic")
            .await
            .map_err(|e| CheckError::Dbus(format!("ActiveEnterTimestampMonotonic of {}: {}", target, e)))?;
        Ok(reached)
    }

    async fn timer(&self, name: String, path: &OwnedObjectPath, uptime_us: u64) -> Result<Timer> {
        let proxy = Proxy::new(&self.connection, DESTINATION, path.as_str(), TIMER_INTERFACE)
            .await
            .map_err(|e| CheckError::Dbus(e.to_string()))?;
        let stamps = TimerStamps {
            next_realtime: timer_property(&proxy, &name, "NextElapseUSecRealtime").await?,
            next_monotonic: timer_property(&proxy, &name, "NextElapseUSecMonotonic").await?,
            last_trigger: timer_property(&proxy, &name, "LastTriggerUSec").await?,
        };
        let now_us = chrono::Utc::now().timestamp_micros().max(0) as u64;
        Ok(timer_from_stamps(name, &stamps, now_us, uptime_us))
    }
}

#[async_trait]
impl Source for DbusSource {
    fn name(&self) -> &'static str {
        "dbus"
    }

    async fn get_unit(&self, name: &str) -> Result<Unit> {
        let proxy = self.manager(&self.connection).await?;
        // LoadUnit also works for units that are currently not loaded
        let path: OwnedObjectPath = proxy
            .call("LoadUnit", &(name,))
            .await
            .map_err(|e| CheckError::Dbus(format!("LoadUnit {}: {}", name, e)))?;

        let unit = Unit::new(
            self.unit_property(&path, "Id").await?,
            &self.unit_property(&path, "ActiveState").await?,
            &self.unit_property(&path, "SubState").await?,
            &self.unit_property(&path, "LoadState").await?,
        )?;
        if unit.load_state() == LoadState::NotFound {
            tracing::info!("Unit '{}' is not known to systemd", name);
        }
        Ok(unit)
    }

    async fn get_all_units(&self, include_user_scope: bool) -> Result<Vec<Unit>> {
        let mut units = Vec::new();
        for record in self.list_units(&self.connection).await? {
            units.push(unit_from_record(record)?);
        }

        if include_user_scope {
            let connection = self.user_connection().await?;
            for record in self.list_units(connection).await? {
                units.push(unit_from_record(record)?);
            }
        }

        Ok(units)
    }

    async fn get_startup_time(&self) -> Option<f64> {
        let proxy = self.manager(&self.connection).await.ok()?;
        let target_reached = self
            .default_target_reached(&proxy)
            .await
            .unwrap_or_else(|e| {
                tracing::debug!("Default target timestamp unavailable: {:#}", e);
                0
            });
        let stamps = BootStamps {
            firmware: proxy.get_property("FirmwareTimestampMonotonic").await.ok()?,
            userspace: proxy
                .get_property("UserspaceTimestampMonotonic")
                .await
                .unwrap_or_default(),
            finish: proxy.get_property("FinishTimestampMonotonic").await.ok()?,
            target_reached,
        };
        startup_seconds(&stamps)
    }

    async fn get_all_timers(&self) -> Result<Vec<Timer>> {
        let uptime_us = read_uptime_us().await;
        let mut timers = Vec::new();
        for (name, _, _, _, _, _, path, _, _, _) in self.list_units(&self.connection).await? {
            if name.ends_with(".timer") {
                timers.push(self.timer(name, &path, uptime_us).await?);
            }
        }
        Ok(timers)
    }
}

async fn timer_property(proxy: &Proxy<'_>, timer: &str, property: &str) -> Result<u64> {
    let value: u64 = proxy
        .get_property(property)
        .await
        .map_err(|e| CheckError::Dbus(format!("{} of {}: {}", property, timer, e)))?;
    Ok(value)
}

/// Build a unit from a `ListUnits` entry
pub fn unit_from_record(record: ListUnitRecord) -> std::result::Result<Unit, CheckError> {
    let (name, _description, load_state, active_state, sub_state, _, _, _, _, _) = record;
    Unit::new(name, &active_state, &sub_state, &load_state)
}

/// Monotonic boot timestamps in microseconds, zero meaning unset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootStamps {
    pub firmware: u64,
    pub userspace: u64,
    pub finish: u64,
    /// Activation of the default target
    pub target_reached: u64,
}

/// Boot duration in seconds.
///
/// Measures how long the default target took to come up in userspace, the
/// same figure `systemd-analyze` prints as "reached after". Without it the
/// firmware and finish timestamps are added up, the firmware one counting
/// backwards from the kernel start. A finish timestamp of zero means the
/// boot is still running.
pub fn startup_seconds(stamps: &BootStamps) -> Option<f64> {
    if stamps.finish == 0 {
        return None;
    }
    let micros = if stamps.userspace > 0 && stamps.target_reached > stamps.userspace {
        stamps.target_reached - stamps.userspace
    } else {
        stamps.firmware + stamps.finish
    };
    Some(round_millis(micros as f64 / 1_000_000.0))
}

/// Raw timer properties in microseconds, zero meaning unset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStamps {
    pub next_realtime: u64,
    pub next_monotonic: u64,
    pub last_trigger: u64,
}

/// Turn timer timestamps into relative seconds.
///
/// `now_us` is the wall clock and `uptime_us` the monotonic clock, both in
/// microseconds.
pub fn timer_from_stamps(name: String, stamps: &TimerStamps, now_us: u64, uptime_us: u64) -> Timer {
    let seconds = |us: u64| round_millis(us as f64 / 1_000_000.0);
    let next = if stamps.next_realtime > 0 {
        Some(seconds(stamps.next_realtime.saturating_sub(now_us)))
    } else if stamps.next_monotonic > 0 {
        Some(seconds(stamps.next_monotonic.saturating_sub(uptime_us)))
    } else {
        None
    };
    let passed = (stamps.last_trigger > 0).then(|| seconds(now_us.saturating_sub(stamps.last_trigger)));
    Timer { name, next, passed }
}

async fn connect_within<F>(
    timeout: Duration,
    bus: &'static str,
    connect: F,
) -> std::result::Result<Connection, CheckError>
where
    F: Future<Output = zbus::Result<Connection>>,
{
    tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| CheckError::Dbus(format!("Timeout connecting to the {} bus", bus)))?
        .map_err(|e| CheckError::Dbus(format!("Failed to connect to the {} bus: {}", bus, e)))
}

async fn read_uptime_us() -> u64 {
    match tokio::fs::read_to_string("/proc/uptime").await {
        Ok(content) => parse_uptime_us(&content).unwrap_or_default(),
        Err(e) => {
            tracing::debug!("Failed to read /proc/uptime: {}", e);
            0
        }
    }
}

/// First field of `/proc/uptime` in microseconds
fn parse_uptime_us(content: &str) -> Option<u64> {
    let seconds: f64 = content.split_whitespace().next()?.parse().ok()?;
    Some((seconds * 1_000_000.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systemd::{ActiveState, SubState};

    fn record(name: &str, load: &str, active: &str, sub: &str) -> ListUnitRecord {
        let path = OwnedObjectPath::try_from("/org/freedesktop/systemd1/unit/nginx_2eservice")
            .unwrap();
        (
            name.to_string(),
            "A unit".to_string(),
            load.to_string(),
            active.to_string(),
            sub.to_string(),
            String::new(),
            path,
            0,
            String::new(),
            OwnedObjectPath::try_from("/").unwrap(),
        )
    }

    #[test]
    fn test_unit_from_record() {
        let unit = unit_from_record(record("nginx.service", "loaded", "failed", "failed")).unwrap();
        assert_eq!(unit.name(), "nginx.service");
        assert_eq!(unit.active_state(), ActiveState::Failed);
        assert_eq!(unit.sub_state(), SubState::Failed);
        assert_eq!(unit.load_state(), LoadState::Loaded);
    }

    #[test]
    fn test_unit_from_record_unknown_state() {
        let err = unit_from_record(record("nginx.service", "loaded", "sleeping", "dead")).unwrap_err();
        assert!(matches!(err, CheckError::InvalidState { kind: "active", .. }));
    }

    #[test]
    fn test_startup_seconds_from_totals() {
        let stamps = |firmware, finish| BootStamps {
            firmware,
            finish,
            ..BootStamps::default()
        };
        assert_eq!(startup_seconds(&stamps(2_000_000, 10_345_000)), Some(12.345));
        assert_eq!(startup_seconds(&stamps(0, 5_000_400)), Some(5.0));
        assert_eq!(startup_seconds(&stamps(2_000_000, 0)), None);
    }

    #[test]
    fn test_startup_seconds_until_default_target() {
        // Startup finished in 1.672s (kernel) + 21.378s (userspace) = 23.050s
        // graphical.target reached after 1min 2.154s in userspace
        let stamps = BootStamps {
            firmware: 0,
            userspace: 1_672_000,
            finish: 23_050_000,
            target_reached: 63_826_000,
        };
        assert_eq!(startup_seconds(&stamps), Some(62.154));

        let not_reached = BootStamps {
            target_reached: 0,
            ..stamps
        };
        assert_eq!(startup_seconds(&not_reached), Some(23.05));
    }

    #[tokio::test]
    async fn test_connect_times_out() {
        let err = connect_within(Duration::from_millis(10), "user", std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Dbus(message) if message.contains("Timeout")));
    }

    #[test]
    fn test_timer_realtime_schedule() {
        let now = 1_600_000_000_000_000;
        let stamps = TimerStamps {
            next_realtime: now + 2_040_000_000,
            next_monotonic: 0,
            last_trigger: now - 260_000_000,
        };
        let timer = timer_from_stamps("logrotate.timer".to_string(), &stamps, now, 0);
        assert_eq!(timer.next, Some(2040.0));
        assert_eq!(timer.passed, Some(260.0));
    }

    #[test]
    fn test_timer_monotonic_schedule() {
        let stamps = TimerStamps {
            next_realtime: 0,
            next_monotonic: 900_000_000,
            last_trigger: 0,
        };
        let timer = timer_from_stamps("boot.timer".to_string(), &stamps, 1, 300_000_000);
        assert_eq!(timer.next, Some(600.0));
        assert_eq!(timer.passed, None);
    }

    #[test]
    fn test_dead_timer() {
        let now = 1_600_000_000_000_000;
        let stamps = TimerStamps {
            last_trigger: now - 2_764_800_000_000,
            ..TimerStamps::default()
        };
        let timer = timer_from_stamps("rsync.timer".to_string(), &stamps, now, 0);
        assert!(timer.is_dead());
        assert_eq!(timer.passed, Some(2_764_800.0));
    }

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime_us("350735.47 234388.90\n"), Some(350_735_470_000));
        assert_eq!(parse_uptime_us(""), None);
    }
}
