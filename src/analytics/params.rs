//! Parsing of raw request parameters into typed view arguments.
//!
//! Every parser fails with `InvalidParameter` and never touches the dataset.

use std::collections::BTreeSet;

use super::weather::WeatherCondition;
use super::{AnalyticsError, AnalyticsResult};

/// Seasons outside this range are rejected outright.
pub const MIN_SEASON: i32 = 1920;
pub const MAX_SEASON: i32 = 2100;

fn parse_int(name: &'static str, raw: &str) -> AnalyticsResult<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AnalyticsError::invalid(name, "value is required"));
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| AnalyticsError::invalid(name, format!("expected an integer, got {trimmed:?}")))
}

/// Strictly positive integer (counts, limits, minimum games).
pub fn positive_int(name: &'static str, raw: &str) -> AnalyticsResult<u32> {
    let v = parse_int(name, raw)?;
    if v <= 0 || v > u32::MAX as i64 {
        return Err(AnalyticsError::invalid(name, format!("must be a positive integer, got {v}")));
    }
    Ok(v as u32)
}

pub fn non_negative_int(name: &'static str, raw: &str) -> AnalyticsResult<u32> {
    let v = parse_int(name, raw)?;
    if v < 0 || v > u32::MAX as i64 {
        return Err(AnalyticsError::invalid(name, format!("must be zero or greater, got {v}")));
    }
    Ok(v as u32)
}

pub fn number(name: &'static str, raw: &str) -> AnalyticsResult<f64> {
    let trimmed = raw.trim();
    let v: f64 = trimmed
        .parse()
        .map_err(|_| AnalyticsError::invalid(name, format!("expected a number, got {trimmed:?}")))?;
    if !v.is_finite() {
        return Err(AnalyticsError::invalid(name, "must be a finite number"));
    }
    Ok(v)
}

pub fn season(name: &'static str, raw: &str) -> AnalyticsResult<i32> {
    let v = parse_int(name, raw)?;
    if !(MIN_SEASON as i64..=MAX_SEASON as i64).contains(&v) {
        return Err(AnalyticsError::invalid(
            name,
            format!("season {v} outside {MIN_SEASON}..={MAX_SEASON}"),
        ));
    }
    Ok(v as i32)
}

pub fn required_str(name: &'static str, raw: &str) -> AnalyticsResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AnalyticsError::invalid(name, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Blank optional strings are treated as absent.
pub fn optional_str(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Comma-separated team codes, e.g. `"GB,CHI,BUF"`.
pub fn team_codes(name: &'static str, raw: &str) -> AnalyticsResult<BTreeSet<String>> {
    let mut codes = BTreeSet::new();
    for part in raw.split(',') {
        let code = part.trim();
        if code.is_empty() {
            return Err(AnalyticsError::invalid(name, "team codes must not be empty"));
        }
        codes.insert(code.to_string());
    }
    Ok(codes)
}

/// `"all"` (or blank) means no condition filter.
pub fn weather_condition_filter(
    name: &'static str,
    raw: &str,
) -> AnalyticsResult<Option<WeatherCondition>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    weather_condition(name, trimmed).map(Some)
}

pub fn weather_condition(name: &'static str, raw: &str) -> AnalyticsResult<WeatherCondition> {
    WeatherCondition::from_label(raw)
        .ok_or_else(|| AnalyticsError::invalid(name, format!("unknown weather condition {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(err: AnalyticsError) -> String {
        match err {
            AnalyticsError::InvalidParameter { reason, .. } => reason,
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn positive_int_rejects_zero_and_text() {
        assert_eq!(positive_int("num", " 10 ").unwrap(), 10);
        assert!(reason(positive_int("num", "0").unwrap_err()).contains("positive"));
        assert!(reason(positive_int("num", "ten").unwrap_err()).contains("integer"));
        assert!(positive_int("num", "").is_err());
        assert!(positive_int("num", "5; DROP TABLE players").is_err());
    }

    #[test]
    fn non_negative_accepts_zero() {
        assert_eq!(non_negative_int("window", "0").unwrap(), 0);
        assert!(non_negative_int("window", "-1").is_err());
    }

    #[test]
    fn number_rejects_non_finite() {
        assert_eq!(number("wind", "12.5").unwrap(), 12.5);
        assert!(number("wind", "NaN").is_err());
        assert!(number("wind", "inf").is_err());
        assert!(number("wind", "fast").is_err());
    }

    #[test]
    fn season_must_be_plausible() {
        assert_eq!(season("season", "2021").unwrap(), 2021);
        assert!(season("season", "21").is_err());
        assert!(season("season", "3021").is_err());
    }

    #[test]
    fn team_codes_split_and_dedupe() {
        let codes = team_codes("teams", "GB, CHI,GB").unwrap();
        assert_eq!(codes.into_iter().collect::<Vec<_>>(), vec!["CHI", "GB"]);
        assert!(team_codes("teams", "GB,,CHI").is_err());
        assert!(team_codes("teams", " ").is_err());
    }

    #[test]
    fn condition_filter_accepts_all() {
        assert_eq!(weather_condition_filter("c", "all").unwrap(), None);
        assert_eq!(
            weather_condition_filter("c", "rainy").unwrap(),
            Some(WeatherCondition::Rainy)
        );
        assert!(weather_condition_filter("c", "tornado").is_err());
    }

    #[test]
    fn optional_str_drops_blank() {
        assert_eq!(optional_str(Some("  ")), None);
        assert_eq!(optional_str(Some(" WR ")), Some("WR".to_string()));
        assert_eq!(optional_str(None), None);
    }
}
