// Systemd unit and timer data models

use crate::error::CheckError;
use std::fmt;
use std::str::FromStr;

/// Declares a closed set of systemd state strings.
///
/// Each generated enum offers a strict parser (`FromStr`, failing with
/// [`CheckError::InvalidState`]) and a lenient probe (`classify`) that
/// returns `None` for unknown strings.
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every known value, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The string systemd uses for this state
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            /// Probe a string without failing
            pub fn classify(value: &str) -> Option<Self> {
                match value {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl FromStr for $name {
            type Err = CheckError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::classify(value).ok_or_else(|| CheckError::InvalidState {
                    kind: $kind,
                    value: value.to_string(),
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

state_enum! {
    /// High-level activation state of a unit (`ActiveState` on D-Bus)
    ActiveState, "active" {
        Active => "active",
        Reloading => "reloading",
        Inactive => "inactive",
        Failed => "failed",
        Activating => "activating",
        Deactivating => "deactivating",
    }
}

state_enum! {
    /// Unit type specific low-level state, mapping many-to-one onto [`ActiveState`].
    ///
    /// The list follows `src/basic/unit-def.c` of systemd.
    SubState, "sub" {
        Abandoned => "abandoned",
        ActivatingDone => "activating-done",
        Activating => "activating",
        Active => "active",
        AutoRestart => "auto-restart",
        Cleaning => "cleaning",
        Condition => "condition",
        DeactivatingSigkill => "deactivating-sigkill",
        DeactivatingSigterm => "deactivating-sigterm",
        Deactivating => "deactivating",
        Dead => "dead",
        Elapsed => "elapsed",
        Exited => "exited",
        Failed => "failed",
        FinalSigkill => "final-sigkill",
        FinalSigterm => "final-sigterm",
        FinalWatchdog => "final-watchdog",
        Listening => "listening",
        Mounted => "mounted",
        MountingDone => "mounting-done",
        Mounting => "mounting",
        Plugged => "plugged",
        Reload => "reload",
        RemountingSigkill => "remounting-sigkill",
        RemountingSigterm => "remounting-sigterm",
        Remounting => "remounting",
        Running => "running",
        StartChown => "start-chown",
        StartPost => "start-post",
        StartPre => "start-pre",
        Start => "start",
        StopPost => "stop-post",
        StopPreSigkill => "stop-pre-sigkill",
        StopPreSigterm => "stop-pre-sigterm",
        StopPre => "stop-pre",
        StopSigkill => "stop-sigkill",
        StopSigterm => "stop-sigterm",
        StopWatchdog => "stop-watchdog",
        Stop => "stop",
        Tentative => "tentative",
        UnmountingSigkill => "unmounting-sigkill",
        UnmountingSigterm => "unmounting-sigterm",
        Unmounting => "unmounting",
        Waiting => "waiting",
    }
}

state_enum! {
    /// Whether the unit configuration was loaded (`LoadState` on D-Bus)
    LoadState, "load" {
        Stub => "stub",
        Loaded => "loaded",
        NotFound => "not-found",
        BadSetting => "bad-setting",
        Error => "error",
        Merged => "merged",
        Masked => "masked",
    }
}

/// Unit types systemd knows about, used to build `--include-type` filters
pub const UNIT_TYPES: &[&str] = &[
    "service", "socket", "target", "device", "mount", "automount", "timer", "swap", "path",
    "slice", "scope",
];

/// One systemd unit and its state triad
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    name: String,
    active_state: ActiveState,
    sub_state: SubState,
    load_state: LoadState,
}

impl Unit {
    /// Build a unit from raw state strings, rejecting unknown values
    pub fn new(
        name: impl Into<String>,
        active_state: &str,
        sub_state: &str,
        load_state: &str,
    ) -> Result<Self, CheckError> {
        Ok(Self::from_states(
            name,
            active_state.parse()?,
            sub_state.parse()?,
            load_state.parse()?,
        ))
    }

    pub fn from_states(
        name: impl Into<String>,
        active_state: ActiveState,
        sub_state: SubState,
        load_state: LoadState,
    ) -> Self {
        Self {
            name: name.into(),
            active_state,
            sub_state,
            load_state,
        }
    }

    /// The unit name, for example `nginx.service`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn active_state(&self) -> ActiveState {
        self.active_state
    }

    pub fn sub_state(&self) -> SubState {
        self.sub_state
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    /// Look up a state property by its field name (`active_state`, `sub_state`,
    /// `load_state` or `name`)
    pub fn property(&self, property: &str) -> Option<&str> {
        match property {
            "name" => Some(self.name.as_str()),
            "active_state" => Some(self.active_state.as_str()),
            "sub_state" => Some(self.sub_state.as_str()),
            "load_state" => Some(self.load_state.as_str()),
            _ => None,
        }
    }
}

/// Scheduling status of a timer unit, in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub name: String,
    /// Seconds until the next activation, `None` if nothing is scheduled
    pub next: Option<f64>,
    /// Seconds since the last activation, `None` if it never ran
    pub passed: Option<f64>,
}

impl Timer {
    /// A timer without a next activation will never fire again
    pub fn is_dead(&self) -> bool {
        self.next.is_none()
    }
}
