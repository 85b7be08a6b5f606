//! Windowed association between events and adverse-weather weeks.
//!
//! Adverse weeks are pre-indexed by season, so testing an event against a
//! window of half-width `W` costs one hash lookup per week in the window.

use std::collections::{HashMap, HashSet};

use crate::db::models::{is_regular_season_week, WeatherRecord, FIRST_WEEK, LAST_WEEK};

/// Any wider window already covers the whole regular season.
pub const MAX_HALF_WIDTH: u32 = (LAST_WEEK - FIRST_WEEK) as u32;

/// season → set of weeks with at least one adverse-weather game
#[derive(Debug, Clone, Default)]
pub struct AdverseWeekIndex {
    weeks: HashMap<i32, HashSet<i32>>,
}

impl AdverseWeekIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every game for which `is_adverse` holds.
    pub fn from_weather<F>(records: &[WeatherRecord], is_adverse: F) -> Self
    where
        F: Fn(&WeatherRecord) -> bool,
    {
        let mut index = Self::new();
        for record in records.iter().filter(|r| is_adverse(r)) {
            index.insert(record.season, record.week);
        }
        index
    }

    /// Weeks outside the regular season are dropped, not clamped.
    pub fn insert(&mut self, season: i32, week: i32) {
        if is_regular_season_week(week) {
            self.weeks.entry(season).or_default().insert(week);
        }
    }

    pub fn contains(&self, season: i32, week: i32) -> bool {
        self.weeks
            .get(&season)
            .is_some_and(|weeks| weeks.contains(&week))
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    /// Number of (season, week) pairs indexed.
    pub fn len(&self) -> usize {
        self.weeks.values().map(HashSet::len).sum()
    }

    /// Is there an adverse week in `[week - W, week + W]` of the same season?
    ///
    /// An event whose own week is outside `[1, 18]` is never associated.
    pub fn is_associated(&self, season: i32, week: i32, half_width: u32) -> bool {
        if !is_regular_season_week(week) {
            return false;
        }
        window_weeks(week, half_width).any(|w| self.contains(season, w))
    }
}

/// The in-season weeks covered by `week ± half_width`, in ascending order.
/// Offsets landing outside `[1, 18]` are skipped.
pub fn window_weeks(week: i32, half_width: u32) -> impl Iterator<Item = i32> {
    let w = i64::from(half_width);
    let week = i64::from(week);
    let lo = (week - w).max(i64::from(FIRST_WEEK));
    let hi = (week + w).min(i64::from(LAST_WEEK));
    (lo..=hi).map(|w| w as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(i32, i32)]) -> AdverseWeekIndex {
        let mut idx = AdverseWeekIndex::new();
        for (season, week) in entries {
            idx.insert(*season, *week);
        }
        idx
    }

    #[test]
    fn neighbouring_week_within_window() {
        let idx = index(&[(2021, 9)]);
        assert!(idx.is_associated(2021, 10, 1));
        assert!(!idx.is_associated(2021, 10, 0));
    }

    #[test]
    fn zero_width_checks_exact_week_only() {
        let idx = index(&[(2021, 10)]);
        assert!(idx.is_associated(2021, 10, 0));
        assert!(!idx.is_associated(2021, 11, 0));
    }

    #[test]
    fn other_seasons_do_not_leak() {
        let idx = index(&[(2020, 10)]);
        assert!(!idx.is_associated(2021, 10, 3));
    }

    #[test]
    fn window_never_leaves_regular_season() {
        let weeks: Vec<i32> = window_weeks(1, 3).collect();
        assert_eq!(weeks, vec![1, 2, 3, 4]);

        let weeks: Vec<i32> = window_weeks(17, 3).collect();
        assert_eq!(weeks, vec![14, 15, 16, 17, 18]);

        assert_eq!(window_weeks(9, 0).collect::<Vec<_>>(), vec![9]);
        assert_eq!(window_weeks(9, u32::MAX).count(), 18);
        assert_eq!(window_weeks(1, MAX_HALF_WIDTH).count(), 18);
    }

    #[test]
    fn out_of_range_weeks_are_excluded() {
        let idx = index(&[(2021, 0), (2021, 19), (2021, 18)]);
        assert_eq!(idx.len(), 1);
        assert!(!idx.contains(2021, 19));
        // Event in week 19 is not associated even though week 18 is adverse.
        assert!(!idx.is_associated(2021, 19, 1));
        assert!(idx.is_associated(2021, 17, 1));
    }

    #[test]
    fn builds_from_weather_records() {
        let records = vec![
            WeatherRecord {
                season: 2020,
                week: 5,
                weather_text: Some("Fog".into()),
                temperature_text: None,
                wind_text: None,
                home_team: "SF".into(),
                away_team: "LAR".into(),
                home_score: None,
                away_score: None,
            },
            WeatherRecord {
                season: 2020,
                week: 6,
                weather_text: Some("Sunny".into()),
                temperature_text: None,
                wind_text: None,
                home_team: "MIA".into(),
                away_team: "NYJ".into(),
                home_score: None,
                away_score: None,
            },
        ];
        let idx = AdverseWeekIndex::from_weather(&records, |r| {
            r.weather_text.as_deref() == Some("Fog")
        });
        assert!(idx.contains(2020, 5));
        assert!(!idx.contains(2020, 6));
        assert!(!idx.is_empty());
    }
}
