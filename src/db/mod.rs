use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub mod accessor;
pub mod memory;
pub mod models;

pub use accessor::{DatasetAccessor, RowFilter};
pub use memory::MemoryDataset;
use models::*;

/// Thread-safe SQLite handle (single connection with mutex).
///
/// Read paths acquire the connection inside `spawn_blocking` and release it
/// as soon as the rows are materialised.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(SCHEMA_SQL)?;
            Ok(())
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))?;
        f(&conn)
    }

    /// Run a read on the blocking pool so the async handlers never stall on SQLite.
    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f)).await?
    }

    // ── Accounts ──────────────────────────────────────────────────────────────

    /// Insert a new account. Returns `None` when the username is taken.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let created_at = Utc::now();
            let inserted = conn.execute(
                "INSERT INTO users (username, password_hash, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(username) DO NOTHING",
                params![username, password_hash, created_at],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(User {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                created_at,
            }))
        })
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
                    params![username],
                    |row| {
                        Ok(User {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            password_hash: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(user)
        })
    }
}

#[async_trait]
impl DatasetAccessor for Database {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn players(&self) -> Result<Vec<Player>> {
        self.read(|conn| {
            let mut stmt = conn.prepare("SELECT name, position FROM players ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Player {
                        name: row.get(0)?,
                        position: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn weekly_stats(&self, filter: RowFilter) -> Result<Vec<WeeklyStat>> {
        self.read(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name, season, week, fantasy_points, fantasy_points_ppr,
                        target_share, air_yards_share
                 FROM weekly_stats
                 WHERE (?1 IS NULL OR season = ?1) AND (?2 IS NULL OR season >= ?2)
                 ORDER BY name, season, week",
            )?;
            let rows = stmt
                .query_map(params![filter.season, filter.min_season], map_weekly_stat)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn position_stats(
        &self,
        kind: PositionKind,
        filter: RowFilter,
    ) -> Result<Vec<PositionStat>> {
        self.read(move |conn| {
            let (sql, mapper): (&str, fn(&rusqlite::Row) -> rusqlite::Result<PositionStat>) =
                match kind {
                    PositionKind::Qb => (QB_STATS_SQL, map_qb_stat),
                    PositionKind::Rb => (RB_STATS_SQL, map_rb_stat),
                    PositionKind::Wr => (WR_STATS_SQL, map_wr_stat),
                };
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(params![filter.season, filter.min_season], mapper)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn weather(&self, filter: RowFilter) -> Result<Vec<WeatherRecord>> {
        self.read(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT season, week, weather, temperature, wind,
                        home_team, away_team, home_score, away_score
                 FROM weather
                 WHERE (?1 IS NULL OR season = ?1) AND (?2 IS NULL OR season >= ?2)
                 ORDER BY season, week, home_team",
            )?;
            let rows = stmt
                .query_map(params![filter.season, filter.min_season], map_weather)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn injuries(&self, filter: RowFilter) -> Result<Vec<InjuryRecord>> {
        self.read(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT player, season, week, game_status
                 FROM injuries
                 WHERE (?1 IS NULL OR season = ?1) AND (?2 IS NULL OR season >= ?2)
                 ORDER BY player, season, week",
            )?;
            let rows = stmt
                .query_map(params![filter.season, filter.min_season], |row| {
                    Ok(InjuryRecord {
                        player: row.get(0)?,
                        season: row.get(1)?,
                        week: row.get(2)?,
                        game_status: row.get(3)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

const QB_STATS_SQL: &str = "SELECT name, season, week, passing_yards, passing_tds, interceptions,
        rushing_yards, rushing_tds, passer_rating
 FROM quarterback_stats
 WHERE (?1 IS NULL OR season = ?1) AND (?2 IS NULL OR season >= ?2)
 ORDER BY name, season, week";

const RB_STATS_SQL: &str = "SELECT name, season, week, carries, rushing_yards, rushing_tds,
        receiving_yards, receiving_tds
 FROM runningback_stats
 WHERE (?1 IS NULL OR season = ?1) AND (?2 IS NULL OR season >= ?2)
 ORDER BY name, season, week";

const WR_STATS_SQL: &str = "SELECT name, season, week, receptions, targets,
        receiving_yards, receiving_tds
 FROM wideout_stats
 WHERE (?1 IS NULL OR season = ?1) AND (?2 IS NULL OR season >= ?2)
 ORDER BY name, season, week";

fn map_weekly_stat(row: &rusqlite::Row) -> rusqlite::Result<WeeklyStat> {
    Ok(WeeklyStat {
        name: row.get(0)?,
        season: row.get(1)?,
        week: row.get(2)?,
        fantasy_points: row.get(3)?,
        fantasy_points_ppr: row.get(4)?,
        target_share: row.get(5)?,
        air_yards_share: row.get(6)?,
    })
}

fn map_qb_stat(row: &rusqlite::Row) -> rusqlite::Result<PositionStat> {
    Ok(PositionStat::Qb(QbStat {
        name: row.get(0)?,
        season: row.get(1)?,
        week: row.get(2)?,
        passing_yards: row.get(3)?,
        passing_tds: row.get(4)?,
        interceptions: row.get(5)?,
        rushing_yards: row.get(6)?,
        rushing_tds: row.get(7)?,
        passer_rating: row.get(8)?,
    }))
}

fn map_rb_stat(row: &rusqlite::Row) -> rusqlite::Result<PositionStat> {
    Ok(PositionStat::Rb(RbStat {
        name: row.get(0)?,
        season: row.get(1)?,
        week: row.get(2)?,
        carries: row.get(3)?,
        rushing_yards: row.get(4)?,
        rushing_tds: row.get(5)?,
        receiving_yards: row.get(6)?,
        receiving_tds: row.get(7)?,
    }))
}

fn map_wr_stat(row: &rusqlite::Row) -> rusqlite::Result<PositionStat> {
    Ok(PositionStat::Wr(WrStat {
        name: row.get(0)?,
        season: row.get(1)?,
        week: row.get(2)?,
        receptions: row.get(3)?,
        targets: row.get(4)?,
        receiving_yards: row.get(5)?,
        receiving_tds: row.get(6)?,
    }))
}

fn map_weather(row: &rusqlite::Row) -> rusqlite::Result<WeatherRecord> {
    Ok(WeatherRecord {
        season: row.get(0)?,
        week: row.get(1)?,
        weather_text: row.get(2)?,
        temperature_text: row.get(3)?,
        wind_text: row.get(4)?,
        home_team: row.get(5)?,
        away_team: row.get(6)?,
        home_score: row.get(7)?,
        away_score: row.get(8)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS players (
    name        TEXT    PRIMARY KEY,
    position    TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS weekly_stats (
    name                TEXT    NOT NULL,
    season              INTEGER NOT NULL,
    week                INTEGER NOT NULL,
    fantasy_points      REAL    NOT NULL DEFAULT 0,
    fantasy_points_ppr  REAL    NOT NULL DEFAULT 0,
    target_share        REAL,
    air_yards_share     REAL,
    PRIMARY KEY (name, season, week)
);

CREATE TABLE IF NOT EXISTS quarterback_stats (
    name            TEXT    NOT NULL,
    season          INTEGER NOT NULL,
    week            INTEGER NOT NULL,
    passing_yards   REAL    NOT NULL DEFAULT 0,
    passing_tds     REAL    NOT NULL DEFAULT 0,
    interceptions   REAL    NOT NULL DEFAULT 0,
    rushing_yards   REAL    NOT NULL DEFAULT 0,
    rushing_tds     REAL    NOT NULL DEFAULT 0,
    passer_rating   REAL,
    PRIMARY KEY (name, season, week)
);

CREATE TABLE IF NOT EXISTS runningback_stats (
    name            TEXT    NOT NULL,
    season          INTEGER NOT NULL,
    week            INTEGER NOT NULL,
    carries         REAL    NOT NULL DEFAULT 0,
    rushing_yards   REAL    NOT NULL DEFAULT 0,
    rushing_tds     REAL    NOT NULL DEFAULT 0,
    receiving_yards REAL    NOT NULL DEFAULT 0,
    receiving_tds   REAL    NOT NULL DEFAULT 0,
    PRIMARY KEY (name, season, week)
);

CREATE TABLE IF NOT EXISTS wideout_stats (
    name            TEXT    NOT NULL,
    season          INTEGER NOT NULL,
    week            INTEGER NOT NULL,
    receptions      REAL    NOT NULL DEFAULT 0,
    targets         REAL    NOT NULL DEFAULT 0,
    receiving_yards REAL    NOT NULL DEFAULT 0,
    receiving_tds   REAL    NOT NULL DEFAULT 0,
    PRIMARY KEY (name, season, week)
);

CREATE TABLE IF NOT EXISTS weather (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    season      INTEGER NOT NULL,
    week        INTEGER NOT NULL,
    weather     TEXT,
    temperature TEXT,
    wind        TEXT,
    home_team   TEXT    NOT NULL,
    away_team   TEXT    NOT NULL,
    home_score  INTEGER,
    away_score  INTEGER
);

CREATE TABLE IF NOT EXISTS injuries (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    player      TEXT    NOT NULL,
    season      INTEGER NOT NULL,
    week        INTEGER,
    game_status TEXT
);

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT    NOT NULL UNIQUE,
    password_hash TEXT    NOT NULL,
    created_at    TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_weekly_stats_season ON weekly_stats(season, week);
CREATE INDEX IF NOT EXISTS idx_weather_season_week ON weather(season, week);
CREATE INDEX IF NOT EXISTS idx_injuries_player ON injuries(player, season, week);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Database {
        let db = Database::open(":memory:").expect("in-memory db");
        db.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO players (name, position) VALUES ('A', 'QB'), ('B', 'RB');
                 INSERT INTO weekly_stats (name, season, week, fantasy_points, fantasy_points_ppr)
                     VALUES ('A', 2020, 1, 20.5, 20.5), ('A', 2021, 1, 18.0, 18.0);
                 INSERT INTO quarterback_stats
                     (name, season, week, passing_yards, passing_tds, interceptions,
                      rushing_yards, rushing_tds, passer_rating)
                     VALUES ('A', 2021, 1, 300, 2, 1, 10, 0, NULL);
                 INSERT INTO runningback_stats
                     (name, season, week, carries, rushing_yards, rushing_tds,
                      receiving_yards, receiving_tds)
                     VALUES ('B', 2019, 4, 12, 80, 1, 20, 0);
                 INSERT INTO weather (season, week, weather, temperature, wind, home_team, away_team,
                                      home_score, away_score)
                     VALUES (2021, 1, 'Fog', '45 F', '5', 'GB', 'CHI', 21, 14);
                 INSERT INTO injuries (player, season, week, game_status)
                     VALUES ('A', 2020, 5, 'Out'), ('A', 2021, NULL, 'Questionable');",
            )?;
            Ok(())
        })
        .expect("seed");
        db
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = Database::open(":memory:").unwrap();
        db.run_migrations().unwrap();
        assert!(db.players().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn season_filters_are_bound_parameters() {
        let db = seeded();
        let all = db.weekly_stats(RowFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let only_2021 = db.weekly_stats(RowFilter::season(2021)).await.unwrap();
        assert_eq!(only_2021.len(), 1);
        assert_eq!(only_2021[0].season, 2021);

        let floor = db.weekly_stats(RowFilter::since(2021)).await.unwrap();
        assert_eq!(floor.len(), 1);
    }

    #[tokio::test]
    async fn position_stats_come_back_tagged() {
        let db = seeded();
        let qbs = db
            .position_stats(PositionKind::Qb, RowFilter::default())
            .await
            .unwrap();
        assert_eq!(qbs.len(), 1);
        match &qbs[0] {
            PositionStat::Qb(q) => {
                assert_eq!(q.passing_yards, 300.0);
                assert!(q.passer_rating.is_none());
            }
            other => panic!("expected QB row, got {other:?}"),
        }
        let rbs = db
            .position_stats(PositionKind::Rb, RowFilter::default())
            .await
            .unwrap();
        assert_eq!(rbs[0].kind(), PositionKind::Rb);
        assert!(db
            .position_stats(PositionKind::Wr, RowFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn nullable_columns_round_trip_as_none() {
        let db = seeded();
        let injuries = db.injuries(RowFilter::default()).await.unwrap();
        assert_eq!(injuries.len(), 2);
        assert!(injuries[0].is_qualifying());
        assert_eq!(injuries[1].week, None);

        let weather = db.weather(RowFilter::season(2021)).await.unwrap();
        assert_eq!(weather[0].weather_text.as_deref(), Some("Fog"));
        assert_eq!(weather[0].home_score, Some(21));
    }

    #[test]
    fn duplicate_usernames_are_rejected() {
        let db = Database::open(":memory:").unwrap();
        let first = db.create_user("sam", "hash").unwrap();
        assert!(first.is_some());
        assert!(db.create_user("sam", "other").unwrap().is_none());

        let found = db.find_user("sam").unwrap().expect("user exists");
        assert_eq!(found.password_hash, "hash");
        assert!(db.find_user("nobody").unwrap().is_none());
    }
}
