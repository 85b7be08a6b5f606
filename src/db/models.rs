use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// First and last regular-season week.
pub const FIRST_WEEK: i32 = 1;
pub const LAST_WEEK: i32 = 18;

/// Injury status that counts as a missed game.
pub const STATUS_OUT: &str = "Out";

pub fn is_regular_season_week(week: i32) -> bool {
    (FIRST_WEEK..=LAST_WEEK).contains(&week)
}

/// Roster entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Unique player name
    pub name: String,
    /// "QB" | "RB" | "WR" | "TE" | ...
    pub position: String,
}

/// One row per player per game-week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStat {
    pub name: String,
    pub season: i32,
    pub week: i32,
    pub fantasy_points: f64,
    pub fantasy_points_ppr: f64,
    #[serde(default)]
    pub target_share: Option<f64>,
    #[serde(default)]
    pub air_yards_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QbStat {
    pub name: String,
    pub season: i32,
    pub week: i32,
    pub passing_yards: f64,
    pub passing_tds: f64,
    pub interceptions: f64,
    pub rushing_yards: f64,
    pub rushing_tds: f64,
    #[serde(default)]
    pub passer_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RbStat {
    pub name: String,
    pub season: i32,
    pub week: i32,
    pub carries: f64,
    pub rushing_yards: f64,
    pub rushing_tds: f64,
    pub receiving_yards: f64,
    pub receiving_tds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrStat {
    pub name: String,
    pub season: i32,
    pub week: i32,
    #[serde(default)]
    pub receptions: f64,
    #[serde(default)]
    pub targets: f64,
    pub receiving_yards: f64,
    pub receiving_tds: f64,
}

/// Which position-stat table a row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PositionKind {
    #[serde(rename = "QB")]
    Qb,
    #[serde(rename = "RB")]
    Rb,
    #[serde(rename = "WR")]
    Wr,
}

impl PositionKind {
    pub const ALL: [PositionKind; 3] = [PositionKind::Qb, PositionKind::Rb, PositionKind::Wr];

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionKind::Qb => "QB",
            PositionKind::Rb => "RB",
            PositionKind::Wr => "WR",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "QB" => Some(PositionKind::Qb),
            "RB" => Some(PositionKind::Rb),
            "WR" => Some(PositionKind::Wr),
            _ => None,
        }
    }
}

/// A row from one of the position-specific stat tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "position")]
pub enum PositionStat {
    #[serde(rename = "QB")]
    Qb(QbStat),
    #[serde(rename = "RB")]
    Rb(RbStat),
    #[serde(rename = "WR")]
    Wr(WrStat),
}

impl PositionStat {
    pub fn kind(&self) -> PositionKind {
        match self {
            PositionStat::Qb(_) => PositionKind::Qb,
            PositionStat::Rb(_) => PositionKind::Rb,
            PositionStat::Wr(_) => PositionKind::Wr,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PositionStat::Qb(s) => &s.name,
            PositionStat::Rb(s) => &s.name,
            PositionStat::Wr(s) => &s.name,
        }
    }

    pub fn season(&self) -> i32 {
        match self {
            PositionStat::Qb(s) => s.season,
            PositionStat::Rb(s) => s.season,
            PositionStat::Wr(s) => s.season,
        }
    }
}

/// Weather observed for a single game. Several games share a (season, week).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub season: i32,
    pub week: i32,
    #[serde(default)]
    pub weather_text: Option<String>,
    /// e.g. "38 F"
    #[serde(default)]
    pub temperature_text: Option<String>,
    /// e.g. "12" or "12 mph"
    #[serde(default)]
    pub wind_text: Option<String>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_score: Option<i32>,
    #[serde(default)]
    pub away_score: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjuryRecord {
    pub player: String,
    pub season: i32,
    #[serde(default)]
    pub week: Option<i32>,
    /// "Out" | "Questionable" | "Doubtful" | ...
    #[serde(default)]
    pub game_status: Option<String>,
}

impl InjuryRecord {
    /// Only `Out` is treated as an actual missed-game injury.
    pub fn is_qualifying(&self) -> bool {
        self.game_status.as_deref() == Some(STATUS_OUT)
    }
}

/// Registered API account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
