//! In-memory dataset snapshot.
//!
//! Serves the same read interface as the SQLite store from a JSON file that
//! holds every table at once. Handy for demos and for exercising the views
//! without a database.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::accessor::{DatasetAccessor, RowFilter};
use super::models::{InjuryRecord, Player, PositionKind, PositionStat, WeatherRecord, WeeklyStat};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDataset {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub weekly_stats: Vec<WeeklyStat>,
    #[serde(default)]
    pub position_stats: Vec<PositionStat>,
    #[serde(default)]
    pub weather: Vec<WeatherRecord>,
    #[serde(default)]
    pub injuries: Vec<InjuryRecord>,
}

impl MemoryDataset {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse dataset snapshot")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::from_json(&raw)
    }
}

#[async_trait]
impl DatasetAccessor for MemoryDataset {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn players(&self) -> Result<Vec<Player>> {
        Ok(self.players.clone())
    }

    async fn weekly_stats(&self, filter: RowFilter) -> Result<Vec<WeeklyStat>> {
        Ok(self
            .weekly_stats
            .iter()
            .filter(|s| filter.matches(s.season))
            .cloned()
            .collect())
    }

    async fn position_stats(
        &self,
        kind: PositionKind,
        filter: RowFilter,
    ) -> Result<Vec<PositionStat>> {
        Ok(self
            .position_stats
            .iter()
            .filter(|s| s.kind() == kind && filter.matches(s.season()))
            .cloned()
            .collect())
    }

    async fn weather(&self, filter: RowFilter) -> Result<Vec<WeatherRecord>> {
        Ok(self
            .weather
            .iter()
            .filter(|w| filter.matches(w.season))
            .cloned()
            .collect())
    }

    async fn injuries(&self, filter: RowFilter) -> Result<Vec<InjuryRecord>> {
        Ok(self
            .injuries
            .iter()
            .filter(|i| filter.matches(i.season))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SNAPSHOT: &str = r#"{
        "players": [{"name": "A", "position": "QB"}],
        "weekly_stats": [
            {"name": "A", "season": 2020, "week": 1, "fantasy_points": 20.0, "fantasy_points_ppr": 22.0}
        ],
        "position_stats": [
            {"position": "QB", "name": "A", "season": 2020, "week": 1,
             "passing_yards": 250, "passing_tds": 2, "interceptions": 0,
             "rushing_yards": 5, "rushing_tds": 0},
            {"position": "WR", "name": "C", "season": 2019, "week": 3,
             "receiving_yards": 90, "receiving_tds": 1}
        ],
        "weather": [
            {"season": 2020, "week": 1, "weather_text": "Light Rain", "home_team": "SEA", "away_team": "SF"}
        ]
    }"#;

    #[tokio::test]
    async fn parses_tagged_position_rows() {
        let ds = MemoryDataset::from_json(SNAPSHOT).unwrap();
        let qbs = ds
            .position_stats(PositionKind::Qb, RowFilter::default())
            .await
            .unwrap();
        assert_eq!(qbs.len(), 1);
        assert_eq!(qbs[0].name(), "A");

        let wrs = ds
            .position_stats(PositionKind::Wr, RowFilter::since(2020))
            .await
            .unwrap();
        assert!(wrs.is_empty());
        assert!(ds.injuries.is_empty());
    }

    #[tokio::test]
    async fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();
        let ds = MemoryDataset::load(file.path()).unwrap();
        assert_eq!(ds.players().await.unwrap().len(), 1);
        assert_eq!(ds.weather(RowFilter::season(2020)).await.unwrap().len(), 1);
    }

    #[test]
    fn rejects_malformed_snapshot() {
        assert!(MemoryDataset::from_json("{\"players\": 3}").is_err());
    }
}
