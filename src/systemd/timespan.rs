// Conversion of systemd timespan strings into seconds

use regex::Regex;
use std::sync::OnceLock;

/// Multi-word unit names contracted to their single token suffix
const CONTRACTIONS: &[(&str, &str)] = &[
    (" years", "y"),
    (" months", "month"),
    (" weeks", "w"),
    (" days", "d"),
];

fn span_regex() -> &'static Regex {
    static SPAN: OnceLock<Regex> = OnceLock::new();
    SPAN.get_or_init(|| Regex::new(r"([\d.]+)([a-z]+)").expect("static regex is valid"))
}

fn unit_seconds(unit: &str) -> Option<f64> {
    match unit {
        "y" => Some(31_536_000.0),
        "month" => Some(2_592_000.0),
        "w" => Some(604_800.0),
        "d" => Some(86_400.0),
        "h" => Some(3_600.0),
        "min" => Some(60.0),
        "s" => Some(1.0),
        "ms" => Some(0.001),
        _ => None,
    }
}

/// Convert a timespan as printed by systemd (`2.345s`, `3min 45.234s`,
/// `34min left`, `2 months 8 days`) into seconds, rounded to milliseconds.
///
/// Words that carry no number such as `ago` or `left` are skipped.
pub fn convert_to_sec(timespan: &str) -> f64 {
    let mut timespan = timespan.to_string();
    for (long, short) in CONTRACTIONS {
        timespan = timespan.replace(long, short);
    }

    let mut seconds = 0.0;
    for span in timespan.split_whitespace() {
        let Some(captures) = span_regex().captures(span) else {
            continue;
        };
        let (value, unit) = (&captures[1], &captures[2]);
        match (value.parse::<f64>(), unit_seconds(unit)) {
            (Ok(value), Some(multiplier)) => seconds += value * multiplier,
            _ => tracing::debug!("Ignoring unparsable timespan token '{}'", span),
        }
    }
    round_millis(seconds)
}

/// Round to three decimal places
pub(crate) fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds() {
        assert_eq!(convert_to_sec("1s"), 1.0);
        assert_eq!(convert_to_sec("2.345s"), 2.345);
    }

    #[test]
    fn test_minutes_and_seconds() {
        assert_eq!(convert_to_sec("1min 1s"), 61.0);
        assert_eq!(convert_to_sec("1min 1.123s"), 61.123);
        assert_eq!(convert_to_sec("34min 46.292s"), 2086.292);
    }

    #[test]
    fn test_multi_word_units() {
        assert_eq!(convert_to_sec("2 months 8 days"), 5_875_200.0);
        assert_eq!(convert_to_sec("1 months 2 days ago"), 2_764_800.0);
        assert_eq!(convert_to_sec("1 years 2 weeks"), 32_745_600.0);
    }

    #[test]
    fn test_trailing_words_are_ignored() {
        assert_eq!(convert_to_sec("34min left"), 2040.0);
        assert_eq!(convert_to_sec("4min 20s ago"), 260.0);
        assert_eq!(convert_to_sec("1 days 9h left"), 118_800.0);
    }

    #[test]
    fn test_milliseconds() {
        assert_eq!(convert_to_sec("1s 500ms"), 1.5);
    }

    #[test]
    fn test_no_timespan() {
        assert_eq!(convert_to_sec(""), 0.0);
        assert_eq!(convert_to_sec("Sat 2020-05-16 15:11:15 CEST"), 0.0);
    }

    #[test]
    fn test_unknown_unit_is_ignored() {
        assert_eq!(convert_to_sec("3min 12us"), 180.0);
    }
}
