use anyhow::Result;
use async_trait::async_trait;

use super::models::{InjuryRecord, Player, PositionKind, PositionStat, WeatherRecord, WeeklyStat};

/// Typed row predicate handed to a [`DatasetAccessor`]. Every table is keyed
/// by season, so that is the only pushdown the views need.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowFilter {
    /// Exact season match
    pub season: Option<i32>,
    /// Inclusive lower bound on season
    pub min_season: Option<i32>,
}

impl RowFilter {
    pub fn season(season: i32) -> Self {
        RowFilter {
            season: Some(season),
            min_season: None,
        }
    }

    pub fn since(min_season: i32) -> Self {
        RowFilter {
            season: None,
            min_season: Some(min_season),
        }
    }

    pub fn matches(&self, season: i32) -> bool {
        self.season.map_or(true, |s| s == season) && self.min_season.map_or(true, |m| season >= m)
    }
}

/// Read-only boundary to the tabular datasets.
///
/// Implementations own connection handling; callers only see fully
/// materialised rows or an error.
#[async_trait]
pub trait DatasetAccessor: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    async fn players(&self) -> Result<Vec<Player>>;

    async fn weekly_stats(&self, filter: RowFilter) -> Result<Vec<WeeklyStat>>;

    async fn position_stats(&self, kind: PositionKind, filter: RowFilter)
        -> Result<Vec<PositionStat>>;

    async fn weather(&self, filter: RowFilter) -> Result<Vec<WeatherRecord>>;

    async fn injuries(&self, filter: RowFilter) -> Result<Vec<InjuryRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_matches_everything() {
        let f = RowFilter::default();
        assert!(f.matches(1999));
        assert!(f.matches(2024));
    }

    #[test]
    fn season_and_floor_combine() {
        assert!(RowFilter::season(2020).matches(2020));
        assert!(!RowFilter::season(2020).matches(2021));
        assert!(RowFilter::since(2018).matches(2018));
        assert!(!RowFilter::since(2018).matches(2017));

        let both = RowFilter {
            season: Some(2019),
            min_season: Some(2020),
        };
        assert!(!both.matches(2019));
    }
}
