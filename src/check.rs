// One acquisition and evaluation pass

use crate::error::Result;
use crate::evaluate::{startup_time_result, timer_results, unit_counters, unit_results};
use crate::options::Options;
use crate::report::{PerfData, Report, Scope};
use crate::systemd::Source;
use anyhow::Context;

/// Query `source` once and evaluate everything `options` asks for
pub async fn run(source: &dyn Source, options: &Options) -> Result<Report> {
    tracing::info!("Checking systemd using the {} data source", source.name());

    let mut units = source
        .get_all_units_cached(options.with_user_units)
        .await
        .context("Failed to list the systemd units")?;
    tracing::debug!("Acquired {} units", units.count());

    if let Some(name) = &options.include_unit {
        let unit = source.get_unit(name).await?;
        units.add(unit);
    }

    let mut results = unit_results(
        &units,
        &options.include,
        &options.exclude,
        options.expected_state,
    )?;

    let startup_time = source.get_startup_time().await;
    match startup_time {
        Some(value) if options.scope_startup_time => results.push(startup_time_result(
            value,
            options.startup_time_warning,
            options.startup_time_critical,
        )),
        Some(_) => {}
        None => tracing::info!("Startup time not available, the boot may not be finished"),
    }

    if options.scope_timers {
        let timers = source
            .get_all_timers()
            .await
            .context("Failed to list the systemd timers")?;
        results.extend(timer_results(
            &timers,
            &options.exclude,
            options.timers_warning,
            options.timers_critical,
        ));
    }

    let mut perfdata = Vec::new();
    if options.performance_data {
        perfdata = unit_counters(&units, &options.exclude)?;
        if let Some(value) = startup_time {
            let mut startup = PerfData::new("startup_time", value);
            if options.scope_startup_time {
                startup = startup.with_thresholds(
                    options.startup_time_warning as f64,
                    options.startup_time_critical as f64,
                );
            }
            perfdata.push(startup);
        }
    }

    let ok_summary = options.include_unit.as_ref().and_then(|_| {
        results
            .iter()
            .find(|result| result.scope == Scope::Unit)
            .and_then(|result| result.hint.clone())
    });

    let report = Report::new(results, perfdata);
    Ok(match ok_summary {
        Some(summary) => report.with_ok_summary(summary),
        None => report,
    })
}
