// Verdicts for units, timers and the startup time plus performance counters

use crate::error::CheckError;
use crate::report::{CheckResult, PerfData, Scope, Severity};
use crate::systemd::{ActiveState, LoadState, PatternSet, Timer, Unit, UnitCollection};

/// Active states reported as `units_<state>` performance data
const COUNTED_STATES: [&str; 4] = [
    "active_state:failed",
    "active_state:active",
    "active_state:activating",
    "active_state:inactive",
];

/// Verdict for one unit.
///
/// A unit not in the required state is critical. Failed units and units
/// whose configuration couldn't be loaded are critical in any case.
pub fn evaluate_unit(unit: &Unit, required_state: Option<ActiveState>) -> Severity {
    if required_state.is_some_and(|required| unit.active_state() != required) {
        return Severity::Critical;
    }
    if unit.load_state() == LoadState::Error || unit.active_state() == ActiveState::Failed {
        Severity::Critical
    } else {
        Severity::Ok
    }
}

/// Verdict for a timer, thresholds in seconds since the last activation
pub fn evaluate_timer(timer: &Timer, warning: u64, critical: u64) -> Severity {
    if !timer.is_dead() {
        return Severity::Ok;
    }
    match timer.passed {
        None => Severity::Critical,
        Some(passed) if passed >= critical as f64 => Severity::Critical,
        Some(passed) if passed >= warning as f64 => Severity::Warning,
        Some(_) => Severity::Ok,
    }
}

pub fn evaluate_startup_time(value: f64, warning: u64, critical: u64) -> Severity {
    if value > critical as f64 {
        Severity::Critical
    } else if value > warning as f64 {
        Severity::Warning
    } else {
        Severity::Ok
    }
}

/// Evaluate every unit passing the filters, failing if none does
pub fn unit_results(
    units: &UnitCollection,
    include: &PatternSet,
    exclude: &PatternSet,
    required_state: Option<ActiveState>,
) -> Result<Vec<CheckResult>, CheckError> {
    let results: Vec<CheckResult> = units
        .filter(include, exclude)
        .map(|unit| {
            CheckResult::new(
                Scope::Unit,
                evaluate_unit(unit, required_state),
                format!("{}: {}", unit.name(), unit.active_state()),
            )
        })
        .collect();

    if results.is_empty() {
        return Err(CheckError::NoUnits);
    }
    tracing::debug!("Evaluated {} units", results.len());
    Ok(results)
}

/// Evaluate every timer not matching `exclude`
pub fn timer_results(
    timers: &[Timer],
    exclude: &PatternSet,
    warning: u64,
    critical: u64,
) -> Vec<CheckResult> {
    timers
        .iter()
        .filter(|timer| exclude.is_empty() || !exclude.matches(&timer.name))
        .map(|timer| {
            let severity = evaluate_timer(timer, warning, critical);
            tracing::debug!("Timer '{}': {:?} -> {}", timer.name, timer, severity);
            CheckResult::new(Scope::Timer, severity, timer.name.clone())
        })
        .collect()
}

pub fn startup_time_result(value: f64, warning: u64, critical: u64) -> CheckResult {
    let severity = evaluate_startup_time(value, warning, critical);
    let hint = match severity {
        Severity::Critical => Some(critical),
        Severity::Warning => Some(warning),
        _ => None,
    }
    .map(|threshold| format!("startup_time is {} (outside range 0:{})", value, threshold));

    CheckResult {
        scope: Scope::StartupTime,
        severity,
        hint,
    }
}

/// Unit counters over the units not matching `exclude`
pub fn unit_counters(units: &UnitCollection, exclude: &PatternSet) -> Result<Vec<PerfData>, CheckError> {
    let units = units.filtered(&PatternSet::default(), exclude);
    let counts = units.count_by_states(&COUNTED_STATES)?;

    let mut perfdata: Vec<PerfData> = counts
        .into_iter()
        .map(|(spec, count)| {
            let state = spec.split_once(':').map(|(_, state)| state).unwrap_or(&spec);
            PerfData::new(format!("units_{}", state), count as f64)
        })
        .collect();
    perfdata.push(PerfData::new("count_units", units.count() as f64));
    Ok(perfdata)
}
