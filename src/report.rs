// Check results, performance data and monitoring plugin output

use std::fmt;

/// Verdict of a single result or of the whole run.
///
/// Variants are declared in rank order, so `Ord` picks the worst one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Severity {
    #[default]
    Ok,
    Unknown,
    Warning,
    Critical,
}

impl Severity {
    /// Exit code expected by the monitoring supervisor
    pub fn exit_code(&self) -> u8 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
            Severity::Unknown => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Unknown => "UNKNOWN",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a result was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Unit,
    Timer,
    StartupTime,
}

/// One evaluated unit, timer or startup time
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub scope: Scope,
    pub severity: Severity,
    /// Short status text, `None` for results without anything to say
    pub hint: Option<String>,
}

impl CheckResult {
    pub fn new(scope: Scope, severity: Severity, hint: impl Into<String>) -> Self {
        Self {
            scope,
            severity,
            hint: Some(hint.into()),
        }
    }
}

/// A `label=value[;warning;critical]` performance data point
#[derive(Debug, Clone, PartialEq)]
pub struct PerfData {
    pub label: String,
    pub value: f64,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
}

impl PerfData {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            warning: None,
            critical: None,
        }
    }

    pub fn with_thresholds(mut self, warning: f64, critical: f64) -> Self {
        self.warning = Some(warning);
        self.critical = Some(critical);
        self
    }
}

impl fmt::Display for PerfData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.label, self.value)?;
        if self.warning.is_some() || self.critical.is_some() {
            let threshold = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
            write!(f, ";{};{}", threshold(self.warning), threshold(self.critical))?;
        }
        Ok(())
    }
}

/// Outcome of one check run, ready to be printed
#[derive(Debug, Clone, Default)]
pub struct Report {
    results: Vec<CheckResult>,
    perfdata: Vec<PerfData>,
    ok_summary: Option<String>,
}

impl Report {
    pub fn new(results: Vec<CheckResult>, perfdata: Vec<PerfData>) -> Self {
        Self {
            results,
            perfdata,
            ok_summary: None,
        }
    }

    /// Status text used instead of `all` when everything is fine
    pub fn with_ok_summary(mut self, summary: impl Into<String>) -> Self {
        self.ok_summary = Some(summary.into());
        self
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    /// The worst verdict of all results
    pub fn severity(&self) -> Severity {
        self.results
            .iter()
            .map(|result| result.severity)
            .max()
            .unwrap_or_default()
    }

    pub fn exit_code(&self) -> u8 {
        self.severity().exit_code()
    }

    /// Results sharing the worst verdict, in evaluation order
    pub fn most_significant(&self) -> impl Iterator<Item = &CheckResult> {
        let worst = self.severity();
        self.results
            .iter()
            .filter(move |result| result.severity == worst)
    }

    fn problem_hints(&self) -> impl Iterator<Item = &str> {
        self.most_significant()
            .filter_map(|result| result.hint.as_deref())
    }

    pub fn summary(&self) -> String {
        if self.severity() == Severity::Ok {
            return self.ok_summary.clone().unwrap_or_else(|| "all".to_string());
        }
        self.problem_hints().collect::<Vec<_>>().join(", ")
    }

    /// Plugin output: a status line followed by one line per problem when
    /// `verbose` is set
    pub fn render(&self, verbose: u8) -> String {
        let severity = self.severity();
        let mut output = format!("SYSTEMD {} - {}", severity, self.summary());

        if !self.perfdata.is_empty() {
            let mut perfdata: Vec<&PerfData> = self.perfdata.iter().collect();
            perfdata.sort_by(|a, b| a.label.cmp(&b.label));
            let perfdata: Vec<String> = perfdata.iter().map(|p| p.to_string()).collect();
            output.push_str(" | ");
            output.push_str(&perfdata.join(" "));
        }

        if verbose > 0 && severity != Severity::Ok {
            let label = severity.label().to_lowercase();
            for hint in self.problem_hints() {
                output.push('\n');
                output.push_str(&format!("{}: {}", label, hint));
            }
        }

        output
    }
}

/// Plugin output for a run that failed before producing results
pub fn render_error(error: &anyhow::Error) -> String {
    format!("SYSTEMD {}: {:#}", Severity::Unknown, error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(severity: Severity, hint: &str) -> CheckResult {
        CheckResult::new(Scope::Unit, severity, hint)
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Unknown);
        assert!(Severity::Unknown > Severity::Ok);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Severity::Ok.exit_code(), 0);
        assert_eq!(Severity::Warning.exit_code(), 1);
        assert_eq!(Severity::Critical.exit_code(), 2);
        assert_eq!(Severity::Unknown.exit_code(), 3);
    }

    #[test]
    fn test_perfdata_format() {
        assert_eq!(PerfData::new("count_units", 386.0).to_string(), "count_units=386");
        assert_eq!(
            PerfData::new("startup_time", 12.345)
                .with_thresholds(60.0, 120.0)
                .to_string(),
            "startup_time=12.345;60;120"
        );
    }

    #[test]
    fn test_ok_summary() {
        let report = Report::new(vec![unit(Severity::Ok, "nginx.service: active")], vec![]);
        assert_eq!(report.render(0), "SYSTEMD OK - all");

        let report = report.with_ok_summary("nginx.service: active");
        assert_eq!(report.render(1), "SYSTEMD OK - nginx.service: active");
    }

    #[test]
    fn test_problem_summary_lists_worst_results() {
        let report = Report::new(
            vec![
                unit(Severity::Ok, "nginx.service: active"),
                unit(Severity::Critical, "smartd.service: failed"),
                CheckResult::new(Scope::Timer, Severity::Warning, "rsync.timer"),
                unit(Severity::Critical, "named.service: failed"),
            ],
            vec![],
        );
        assert_eq!(report.severity(), Severity::Critical);
        assert_eq!(report.exit_code(), 2);
        assert_eq!(
            report.render(0),
            "SYSTEMD CRITICAL - smartd.service: failed, named.service: failed"
        );
    }

    #[test]
    fn test_verbose_lines() {
        let report = Report::new(
            vec![
                CheckResult::new(Scope::Timer, Severity::Warning, "dfm-auto-jf.timer"),
                CheckResult::new(Scope::Timer, Severity::Warning, "rsync.timer"),
            ],
            vec![],
        );
        assert_eq!(
            report.render(1),
            "SYSTEMD WARNING - dfm-auto-jf.timer, rsync.timer\n\
             warning: dfm-auto-jf.timer\n\
             warning: rsync.timer"
        );
    }

    #[test]
    fn test_perfdata_is_sorted() {
        let report = Report::new(
            vec![unit(Severity::Ok, "a.service: active")],
            vec![
                PerfData::new("units_failed", 0.0),
                PerfData::new("count_units", 3.0),
                PerfData::new("startup_time", 12.345).with_thresholds(60.0, 120.0),
            ],
        );
        assert_eq!(
            report.render(0),
            "SYSTEMD OK - all | count_units=3 startup_time=12.345;60;120 units_failed=0"
        );
    }

    #[test]
    fn test_empty_report_is_ok() {
        assert_eq!(Report::default().severity(), Severity::Ok);
    }

    #[test]
    fn test_render_error() {
        let error = anyhow::anyhow!("boom").context("Failed to list units");
        assert_eq!(render_error(&error), "SYSTEMD UNKNOWN: Failed to list units: boom");
    }
}
