// Regular expression based unit name filtering

use crate::error::CheckError;
use regex::Regex;

/// A list of compiled regular expressions matched against unit names.
///
/// Patterns are anchored at the start of the name only, so `n.*` matches
/// `nginx.service` while `service` does not.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<(String, Regex)>,
}

impl PatternSet {
    /// Compile every pattern, dropping duplicates while keeping the first-seen order
    pub fn new<I, S>(patterns: I) -> Result<Self, CheckError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if set.patterns.iter().any(|(source, _)| source == pattern) {
                continue;
            }
            let regex = Regex::new(&format!("^(?:{})", pattern)).map_err(|source| {
                CheckError::InvalidRegex {
                    pattern: pattern.to_string(),
                    source,
                }
            })?;
            set.patterns.push((pattern.to_string(), regex));
        }
        Ok(set)
    }

    /// True if one of the patterns matches
    pub fn matches(&self, unit_name: &str) -> bool {
        self.patterns.iter().any(|(_, regex)| regex.is_match(unit_name))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// The patterns as they were given
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(source, _)| source.as_str())
    }
}

/// Registered unit names (e.g. `nginx.service` or `fstrim.timer`) that can be
/// filtered by include and exclude patterns
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    names: Vec<String>,
}

impl NameFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::default();
        for name in names {
            filter.add(name);
        }
        filter
    }

    /// Register a name; names already present keep their position
    pub fn add(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Yield names in registration order that match one of `include` (if any
    /// are given) and none of `exclude`
    pub fn filter<'a, 'p>(
        &'a self,
        include: &'p PatternSet,
        exclude: &'p PatternSet,
    ) -> impl Iterator<Item = &'a str> + 'p
    where
        'a: 'p,
    {
        self.names
            .iter()
            .map(String::as_str)
            .filter(move |name| include.is_empty() || include.matches(name))
            .filter(move |name| exclude.is_empty() || !exclude.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> NameFilter {
        NameFilter::new([
            "ModemManager.service",
            "mongod.service",
            "mysql.service",
            "named.service",
            "networking.mount",
            "nginx.service",
            "nmbd.timer",
            "php7.4-fpm.service",
        ])
    }

    fn patterns(patterns: &[&str]) -> PatternSet {
        PatternSet::new(patterns).unwrap()
    }

    #[test]
    fn test_filter_without_patterns() {
        let filter = names();
        let none = PatternSet::default();
        assert_eq!(filter.filter(&none, &none).count(), 8);
    }

    #[test]
    fn test_filter_include() {
        let filter = names();
        let result: Vec<&str> = filter
            .filter(&patterns(&["n.*"]), &PatternSet::default())
            .collect();
        assert_eq!(
            result,
            vec!["named.service", "networking.mount", "nginx.service", "nmbd.timer"]
        );
    }

    #[test]
    fn test_filtered_names_outlive_patterns() {
        let filter = names();
        let result: Vec<&str> = {
            let include = patterns(&["nginx.*"]);
            filter.filter(&include, &PatternSet::default()).collect()
        };
        assert_eq!(result, vec!["nginx.service"]);
    }

    #[test]
    fn test_filter_include_multiple() {
        let filter = names();
        let count = filter
            .filter(&patterns(&["n.*", "p.*"]), &PatternSet::default())
            .count();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_filter_exclude() {
        let filter = names();
        let none = PatternSet::default();
        assert_eq!(filter.filter(&none, &patterns(&["named.service"])).count(), 7);
        assert_eq!(
            filter
                .filter(&none, &patterns(&[r".*\.(mount|timer)"]))
                .count(),
            6
        );
    }

    #[test]
    fn test_filter_include_and_exclude() {
        let filter = names();
        let result: Vec<&str> = filter
            .filter(&patterns(&["n.*"]), &patterns(&[r".*\.timer"]))
            .collect();
        assert_eq!(result, vec!["named.service", "networking.mount", "nginx.service"]);
    }

    #[test]
    fn test_match_is_anchored_at_start_only() {
        let set = patterns(&["nginx"]);
        assert!(set.matches("nginx.service"));
        assert!(!set.matches("my-nginx.service"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = PatternSet::new(["*service"]).unwrap_err();
        assert!(matches!(err, CheckError::InvalidRegex { ref pattern, .. } if pattern == "*service"));
        assert_eq!(err.to_string(), "Invalid regular expression: '*service'");
    }

    #[test]
    fn test_duplicate_patterns_are_dropped() {
        let set = patterns(&["a.*", "b.*", "a.*"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.sources().collect::<Vec<_>>(), vec!["a.*", "b.*"]);
    }

    #[test]
    fn test_add_keeps_registration_order() {
        let mut filter = NameFilter::new(["b.service", "a.service"]);
        filter.add("b.service");
        filter.add("c.service");
        assert_eq!(filter.names(), &["b.service", "a.service", "c.service"]);
    }
}
