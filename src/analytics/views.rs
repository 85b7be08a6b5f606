//! Named analytical views.
//!
//! Each view validates its arguments, fetches the rows it needs through the
//! [`DatasetAccessor`], and reduces them in memory. Nothing here mutates the
//! fetched rows; a view either returns its full result set or an error.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use super::aggregate::{cmp_asc, cmp_desc, cmp_opt_desc, group_by, round_to, GroupStats, Having, Ratio};
use super::probability::{injury_followup, FollowupParams, InjuryFollowup};
use super::tiers::{performance_score, Tier};
use super::weather::{
    classify_description, classify_game, parse_temperature, parse_wind_speed, GameCondition,
    WeatherCondition,
};
use super::window::AdverseWeekIndex;
use super::{AnalyticsError, AnalyticsResult};
use crate::db::models::{Player, PositionKind, PositionStat, WeeklyStat};
use crate::db::{DatasetAccessor, RowFilter};

/// Weather groups need strictly more than this many rows.
const WEATHER_AVERAGE_MIN_EXCLUSIVE: usize = 5;
/// Quarterback games below this temperature (°F) count as cold.
const COLD_GAME_TEMPERATURE_F: i32 = 32;
/// Running-back weeks with fewer carries are ignored.
const GOAL_LINE_MIN_CARRIES: f64 = 3.0;
const CONSISTENT_SCORER_MIN_GAMES: usize = 10;
const RESILIENCE_MIN_GAMES: usize = 16;
const TEAM_COMPARISON_LIMIT: usize = 5;
/// Size of the league-wide pool that tier comparisons are drawn from.
const TIER_COMPARISON_POOL: usize = 1100;

pub const DEFAULT_SEASON_FLOOR: i32 = 2018;
pub const DEFAULT_MIN_TIER_PLAYERS: u32 = 1;

type WeekKey = (i32, i32);

fn roster(players: &[Player]) -> HashMap<&str, &str> {
    players
        .iter()
        .map(|p| (p.name.as_str(), p.position.as_str()))
        .collect()
}

fn week_keys(weekly: &[WeeklyStat]) -> HashSet<(&str, i32, i32)> {
    weekly
        .iter()
        .map(|w| (w.name.as_str(), w.season, w.week))
        .collect()
}

fn require_positive(name: &'static str, value: u32) -> AnalyticsResult<()> {
    if value == 0 {
        return Err(AnalyticsError::invalid(name, "must be a positive integer"));
    }
    Ok(())
}

fn require_non_empty<'a>(name: &'static str, value: &'a str) -> AnalyticsResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AnalyticsError::invalid(name, "must not be empty"));
    }
    Ok(trimmed)
}

// ── Weather-conditioned passing average ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherAverageRow {
    pub weather_condition: WeatherCondition,
    pub avg_passing_yards: f64,
    pub games: usize,
}

/// Average QB passing yards per weather category. A QB week is paired with
/// every game played that (season, week), since stat rows carry no team.
pub async fn weather_conditioned_average(
    ds: &dyn DatasetAccessor,
    condition: Option<WeatherCondition>,
    season: Option<i32>,
) -> AnalyticsResult<Vec<WeatherAverageRow>> {
    if let Some(c) = condition.filter(|c| !c.is_described()) {
        return Err(AnalyticsError::invalid(
            "weather_condition",
            format!("{} is not a weather description category", c.as_str()),
        ));
    }
    let filter = season.map(RowFilter::season).unwrap_or_default();
    let qbs = ds.position_stats(PositionKind::Qb, filter).await?;
    let weather = ds.weather(filter).await?;

    let mut by_week: HashMap<WeekKey, Vec<WeatherCondition>> = HashMap::new();
    for w in &weather {
        by_week
            .entry((w.season, w.week))
            .or_default()
            .push(classify_description(w.weather_text.as_deref()));
    }

    let mut groups: BTreeMap<WeatherCondition, GroupStats> = BTreeMap::new();
    for stat in &qbs {
        let PositionStat::Qb(qb) = stat else { continue };
        let Some(conditions) = by_week.get(&(qb.season, qb.week)) else {
            continue;
        };
        for c in conditions {
            groups.entry(*c).or_default().push(qb.passing_yards);
        }
    }

    let having = Having::more_than(WEATHER_AVERAGE_MIN_EXCLUSIVE);
    let mut rows: Vec<WeatherAverageRow> = groups
        .into_iter()
        .filter(|(c, _)| condition.map_or(true, |want| want == *c))
        .filter(|(_, s)| having.admits(s.count(), s.sum()))
        .filter_map(|(c, s)| {
            Some(WeatherAverageRow {
                weather_condition: c,
                avg_passing_yards: round_to(s.mean()?, 2),
                games: s.count(),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        cmp_desc(a.avg_passing_yards, b.avg_passing_yards)
            .then_with(|| a.weather_condition.as_str().cmp(b.weather_condition.as_str()))
    });
    Ok(rows)
}

// ── Ranked fantasy totals ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FantasyTotalRow {
    pub name: String,
    pub position: String,
    pub total_fantasy_points: f64,
}

/// Top-N rostered players by summed fantasy points.
pub async fn ranked_fantasy_totals(
    ds: &dyn DatasetAccessor,
    count: u32,
) -> AnalyticsResult<Vec<FantasyTotalRow>> {
    require_positive("num", count)?;
    let players = ds.players().await?;
    let weekly = ds.weekly_stats(RowFilter::default()).await?;
    let roster = roster(&players);

    let groups = group_by(&weekly, |w| {
        roster
            .get(w.name.as_str())
            .map(|pos| (w.name.clone(), pos.to_string()))
    });
    let mut rows: Vec<FantasyTotalRow> = groups
        .into_iter()
        .map(|((name, position), rows)| FantasyTotalRow {
            name,
            position,
            total_fantasy_points: round_to(rows.iter().map(|w| w.fantasy_points).sum(), 2),
        })
        .collect();
    rows.sort_by(|a, b| {
        cmp_desc(a.total_fantasy_points, b.total_fantasy_points).then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(count as usize);
    Ok(rows)
}

// ── Windy vs. normal delta ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindDeltaRow {
    pub name: String,
    pub avg_fantasy_windy: f64,
    pub avg_fantasy_normal: f64,
    pub performance_difference: f64,
}

/// Players who score more in weeks with a game at or above `min_wind_speed`
/// than in other weeks, largest gain first.
pub async fn adverse_weather_delta(
    ds: &dyn DatasetAccessor,
    min_wind_speed: f64,
    limit: u32,
) -> AnalyticsResult<Vec<WindDeltaRow>> {
    if !min_wind_speed.is_finite() {
        return Err(AnalyticsError::invalid("wind_speed", "must be a finite number"));
    }
    require_positive("limit", limit)?;
    let weather = ds.weather(RowFilter::default()).await?;
    let weekly = ds.weekly_stats(RowFilter::default()).await?;

    let windy_weeks: HashSet<WeekKey> = weather
        .iter()
        .filter(|w| {
            w.wind_text
                .as_deref()
                .and_then(parse_wind_speed)
                .is_some_and(|speed| speed >= min_wind_speed)
        })
        .map(|w| (w.season, w.week))
        .collect();

    let mut per_player: BTreeMap<&str, (GroupStats, GroupStats)> = BTreeMap::new();
    for w in &weekly {
        let entry = per_player.entry(w.name.as_str()).or_default();
        if windy_weeks.contains(&(w.season, w.week)) {
            entry.0.push(w.fantasy_points);
        } else {
            entry.1.push(w.fantasy_points);
        }
    }

    let mut rows: Vec<WindDeltaRow> = per_player
        .into_iter()
        .filter_map(|(name, (windy, normal))| {
            let windy = windy.mean()?;
            let normal = normal.mean()?;
            (windy > normal).then(|| WindDeltaRow {
                name: name.to_string(),
                avg_fantasy_windy: windy,
                avg_fantasy_normal: normal,
                performance_difference: windy - normal,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        cmp_desc(a.performance_difference, b.performance_difference)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(limit as usize);
    for row in &mut rows {
        row.avg_fantasy_windy = round_to(row.avg_fantasy_windy, 2);
        row.avg_fantasy_normal = round_to(row.avg_fantasy_normal, 2);
        row.performance_difference = round_to(row.performance_difference, 2);
    }
    Ok(rows)
}

// ── Team margins by game condition ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamComparisonRow {
    pub team: String,
    /// `null` when the team played no such game
    pub avg_margin_rain_snow: Option<f64>,
    pub avg_margin_cold: Option<f64>,
    pub avg_margin_windy: Option<f64>,
    pub avg_margin_normal: f64,
    pub performance_difference: f64,
}

/// Per-team average margin of victory split by game condition. Only teams
/// with a positive normal-weather margin are ranked; the difference is the
/// best adverse margin (absent conditions count as 0) minus the normal margin.
pub async fn team_weather_comparison(
    ds: &dyn DatasetAccessor,
    teams: &BTreeSet<String>,
) -> AnalyticsResult<Vec<TeamComparisonRow>> {
    if teams.is_empty() || teams.iter().any(|t| t.trim().is_empty()) {
        return Err(AnalyticsError::invalid("teams", "at least one team code is required"));
    }
    let weather = ds.weather(RowFilter::default()).await?;

    // team → condition → margins from that team's side
    let mut margins: HashMap<&str, HashMap<GameCondition, GroupStats>> = HashMap::new();
    for game in &weather {
        let (Some(home), Some(away)) = (game.home_score, game.away_score) else {
            continue;
        };
        let condition = classify_game(game);
        for (team, margin) in [(&game.home_team, home - away), (&game.away_team, away - home)] {
            if teams.contains(team) {
                margins
                    .entry(team.as_str())
                    .or_default()
                    .entry(condition)
                    .or_default()
                    .push(f64::from(margin));
            }
        }
    }

    let avg = |team: &str, condition: GameCondition| {
        margins
            .get(team)
            .and_then(|by_condition| by_condition.get(&condition))
            .and_then(GroupStats::mean)
    };
    let round = |m: Option<f64>| m.map(|m| round_to(m, 2));

    let mut rows: Vec<TeamComparisonRow> = teams
        .iter()
        .filter_map(|team| {
            let normal = avg(team.as_str(), GameCondition::Normal).filter(|n| *n > 0.0)?;
            let rain_snow = avg(team.as_str(), GameCondition::RainSnow);
            let cold = avg(team.as_str(), GameCondition::Cold);
            let windy = avg(team.as_str(), GameCondition::Windy);
            let best_adverse = [rain_snow, cold, windy]
                .into_iter()
                .map(|m| m.unwrap_or(0.0))
                .fold(f64::NEG_INFINITY, f64::max);
            Some(TeamComparisonRow {
                team: team.clone(),
                avg_margin_rain_snow: round(rain_snow),
                avg_margin_cold: round(cold),
                avg_margin_windy: round(windy),
                avg_margin_normal: normal,
                performance_difference: best_adverse - normal,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        cmp_desc(a.performance_difference, b.performance_difference)
            .then_with(|| a.team.cmp(&b.team))
    });
    rows.truncate(TEAM_COMPARISON_LIMIT);
    for row in &mut rows {
        row.avg_margin_normal = round_to(row.avg_margin_normal, 2);
        row.performance_difference = round_to(row.performance_difference, 2);
    }
    Ok(rows)
}

// ── Cold-weather quarterbacks ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColdQuarterbackRow {
    pub player_name: String,
    pub games_played: usize,
    /// Averaged over rows that carry a rating
    pub avg_rating: Option<f64>,
    pub avg_passing_yards: f64,
    pub avg_tds: f64,
}

/// QB production in games below freezing, for QBs with at least `min_games`
/// such (QB-week, game) pairings.
pub async fn cold_weather_quarterbacks(
    ds: &dyn DatasetAccessor,
    min_games: u32,
) -> AnalyticsResult<Vec<ColdQuarterbackRow>> {
    require_positive("min_games", min_games)?;
    let weekly = ds.weekly_stats(RowFilter::default()).await?;
    let qbs = ds.position_stats(PositionKind::Qb, RowFilter::default()).await?;
    let weather = ds.weather(RowFilter::default()).await?;

    let mut cold_games: HashMap<WeekKey, usize> = HashMap::new();
    for w in &weather {
        let temp = w.temperature_text.as_deref().and_then(parse_temperature);
        if temp.is_some_and(|t| t < COLD_GAME_TEMPERATURE_F) {
            *cold_games.entry((w.season, w.week)).or_default() += 1;
        }
    }
    let played = week_keys(&weekly);

    #[derive(Default)]
    struct Acc {
        games: usize,
        rating: GroupStats,
        yards: GroupStats,
        tds: GroupStats,
    }
    let mut per_qb: BTreeMap<&str, Acc> = BTreeMap::new();
    for stat in &qbs {
        let PositionStat::Qb(qb) = stat else { continue };
        if !played.contains(&(qb.name.as_str(), qb.season, qb.week)) {
            continue;
        }
        let n = cold_games.get(&(qb.season, qb.week)).copied().unwrap_or(0);
        if n == 0 {
            continue;
        }
        let acc = per_qb.entry(qb.name.as_str()).or_default();
        for _ in 0..n {
            acc.games += 1;
            acc.yards.push(qb.passing_yards);
            acc.tds.push(qb.passing_tds);
            if let Some(rating) = qb.passer_rating {
                acc.rating.push(rating);
            }
        }
    }

    let having = Having::at_least(min_games as usize);
    let mut rows: Vec<ColdQuarterbackRow> = per_qb
        .into_iter()
        .filter(|(_, acc)| having.admits(acc.games, acc.yards.sum()))
        .filter_map(|(name, acc)| {
            Some(ColdQuarterbackRow {
                player_name: name.to_string(),
                games_played: acc.games,
                avg_rating: acc.rating.mean().map(|r| round_to(r, 2)),
                avg_passing_yards: round_to(acc.yards.mean()?, 2),
                avg_tds: round_to(acc.tds.mean()?, 2),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        cmp_opt_desc(a.avg_rating, b.avg_rating).then_with(|| a.player_name.cmp(&b.player_name))
    });
    Ok(rows)
}

// ── Goal-line backs ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalLineBackRow {
    pub player_name: String,
    pub season: i32,
    pub games_played: usize,
    pub td_count: f64,
    pub avg_rushing_yards: f64,
    /// `null` when the back gained no net rushing yards
    pub td_per_100_yards: Ratio,
}

/// Rushing touchdown efficiency per (player, season) over weeks with at
/// least three carries.
pub async fn goal_line_backs(
    ds: &dyn DatasetAccessor,
    min_tds: u32,
    min_games: u32,
) -> AnalyticsResult<Vec<GoalLineBackRow>> {
    require_positive("min_games", min_games)?;
    let weekly = ds.weekly_stats(RowFilter::default()).await?;
    let rbs = ds.position_stats(PositionKind::Rb, RowFilter::default()).await?;
    let played = week_keys(&weekly);

    let eligible = rbs.iter().filter_map(|s| match s {
        PositionStat::Rb(rb)
            if rb.carries >= GOAL_LINE_MIN_CARRIES
                && played.contains(&(rb.name.as_str(), rb.season, rb.week)) =>
        {
            Some(rb)
        }
        _ => None,
    });
    let groups = group_by(eligible, |rb| Some((rb.name.clone(), rb.season)));

    let having = Having::at_least(min_games as usize).with_min_sum(f64::from(min_tds));
    let mut rows: Vec<GoalLineBackRow> = groups
        .into_iter()
        .filter_map(|((name, season), weeks)| {
            let tds: GroupStats = weeks.iter().map(|rb| rb.rushing_tds).collect();
            let yards: GroupStats = weeks.iter().map(|rb| rb.rushing_yards).collect();
            if !having.admits(tds.count(), tds.sum()) {
                return None;
            }
            Some(GoalLineBackRow {
                player_name: name,
                season,
                games_played: tds.count(),
                td_count: tds.sum(),
                avg_rushing_yards: round_to(yards.mean()?, 1),
                td_per_100_yards: Ratio::of(tds.sum(), yards.sum()).scaled(100.0).rounded(2),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        a.td_per_100_yards
            .cmp_desc(&b.td_per_100_yards)
            .then_with(|| a.player_name.cmp(&b.player_name))
            .then_with(|| a.season.cmp(&b.season))
    });
    Ok(rows)
}

// ── Consistent scorers ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistentScorerRow {
    pub player_name: String,
    pub position: String,
    pub games_played: usize,
    pub avg_points: f64,
    pub point_variability: f64,
    pub lowest_score: f64,
    pub highest_score: f64,
}

/// Least volatile PPR scorers at a position (population stddev), with at
/// least ten games.
pub async fn consistent_scorers(
    ds: &dyn DatasetAccessor,
    position: &str,
) -> AnalyticsResult<Vec<ConsistentScorerRow>> {
    let position = require_non_empty("position", position)?;
    let players = ds.players().await?;
    let weekly = ds.weekly_stats(RowFilter::default()).await?;
    let roster = roster(&players);

    let groups = group_by(&weekly, |w| {
        roster
            .get(w.name.as_str())
            .filter(|pos| pos.eq_ignore_ascii_case(position))
            .map(|pos| (w.name.clone(), pos.to_string()))
    });

    let having = Having::at_least(CONSISTENT_SCORER_MIN_GAMES);
    let mut rows: Vec<ConsistentScorerRow> = groups
        .into_iter()
        .filter_map(|((name, position), weeks)| {
            let ppr: GroupStats = weeks.iter().map(|w| w.fantasy_points_ppr).collect();
            if !having.admits(ppr.count(), ppr.sum()) {
                return None;
            }
            Some(ConsistentScorerRow {
                player_name: name,
                position,
                games_played: ppr.count(),
                avg_points: round_to(ppr.mean()?, 1),
                point_variability: round_to(ppr.stddev()?, 2),
                lowest_score: round_to(ppr.min()?, 1),
                highest_score: round_to(ppr.max()?, 1),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        cmp_asc(a.point_variability, b.point_variability)
            .then_with(|| cmp_desc(a.avg_points, b.avg_points))
            .then_with(|| a.player_name.cmp(&b.player_name))
    });
    Ok(rows)
}

// ── Injury resilience ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjuryResilienceRow {
    pub player_name: String,
    pub position: String,
    pub seasons_played: usize,
    pub total_games: usize,
    pub total_injuries: usize,
    pub injuries_per_season: Ratio,
}

/// Distinct injury weeks (any status) per season played, for rostered
/// players with at least 16 games.
pub async fn injury_resilience(
    ds: &dyn DatasetAccessor,
    position: Option<&str>,
) -> AnalyticsResult<Vec<InjuryResilienceRow>> {
    let position = position.map(str::trim).filter(|p| !p.is_empty());
    let players = ds.players().await?;
    let weekly = ds.weekly_stats(RowFilter::default()).await?;
    let injuries = ds.injuries(RowFilter::default()).await?;
    let roster = roster(&players);

    let mut injury_weeks: HashMap<&str, HashSet<WeekKey>> = HashMap::new();
    for i in &injuries {
        if let Some(week) = i.week {
            injury_weeks
                .entry(i.player.as_str())
                .or_default()
                .insert((i.season, week));
        }
    }

    let groups = group_by(&weekly, |w| {
        roster
            .get(w.name.as_str())
            .filter(|pos| position.map_or(true, |want| pos.eq_ignore_ascii_case(want)))
            .map(|pos| (w.name.clone(), pos.to_string()))
    });

    let having = Having::at_least(RESILIENCE_MIN_GAMES);
    let mut rows: Vec<InjuryResilienceRow> = groups
        .into_iter()
        .filter_map(|((name, position), weeks)| {
            let seasons: HashSet<i32> = weeks.iter().map(|w| w.season).collect();
            let games: HashSet<WeekKey> = weeks.iter().map(|w| (w.season, w.week)).collect();
            if !having.admits(games.len(), 0.0) {
                return None;
            }
            let total_injuries = injury_weeks.get(name.as_str()).map_or(0, HashSet::len);
            Some(InjuryResilienceRow {
                injuries_per_season: Ratio::of(total_injuries as f64, seasons.len() as f64)
                    .rounded(2),
                player_name: name,
                position,
                seasons_played: seasons.len(),
                total_games: games.len(),
                total_injuries,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        a.injuries_per_season
            .cmp_desc(&b.injuries_per_season)
            .then_with(|| b.total_injuries.cmp(&a.total_injuries))
            .then_with(|| a.player_name.cmp(&b.player_name))
    });
    Ok(rows)
}

// ── Performance tiers ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierRow {
    pub performance_tier: Tier,
    pub position: String,
    pub player_count: usize,
    pub avg_tier_performance: f64,
    pub avg_performance_volatility: f64,
    /// Tier average × the same tier's average within the league-wide top pool
    pub cross_calc: f64,
    pub comparison_count: usize,
    pub avg_fantasy_points: Option<f64>,
    /// Players whose season average beat their previous season, comma-separated
    pub improved_players: Option<String>,
}

/// One (player, season, position) summary.
#[derive(Debug, Clone)]
struct PlayerSeason {
    name: String,
    season: i32,
    kind: PositionKind,
    avg: f64,
    stddev: f64,
    avg_fantasy_points: Option<f64>,
    tier: Tier,
}

/// Tier breakdown for one position from `season_floor` on. Positions with
/// no tier breakpoints produce no rows.
pub async fn performance_tiers(
    ds: &dyn DatasetAccessor,
    position: &str,
    season_floor: i32,
    min_players: u32,
) -> AnalyticsResult<Vec<TierRow>> {
    let position = require_non_empty("position", position)?;
    require_positive("min_players", min_players)?;
    let Some(kind) = PositionKind::from_code(position) else {
        debug!("No tier breakpoints for position {}", position);
        return Ok(Vec::new());
    };

    let mut stats = Vec::new();
    for k in PositionKind::ALL {
        stats.extend(ds.position_stats(k, RowFilter::default()).await?);
    }
    // Fantasy averages are only reported for the selected seasons.
    let weekly = ds.weekly_stats(RowFilter::since(season_floor)).await?;

    let fantasy: HashMap<(String, i32), f64> = group_by(&weekly, |w| Some((w.name.clone(), w.season)))
        .into_iter()
        .filter_map(|(key, weeks)| {
            let fp: GroupStats = weeks.iter().map(|w| w.fantasy_points).collect();
            fp.mean().map(|m| (key, m))
        })
        .collect();

    let seasons: Vec<PlayerSeason> = group_by(&stats, |s| {
        Some((s.name().to_string(), s.season(), s.kind()))
    })
    .into_iter()
    .filter_map(|((name, season, kind), weeks)| {
        let scores: GroupStats = weeks.iter().map(|s| performance_score(s)).collect();
        let avg = scores.mean()?;
        Some(PlayerSeason {
            avg_fantasy_points: fantasy.get(&(name.clone(), season)).copied(),
            tier: Tier::classify(kind, avg),
            stddev: scores.stddev()?,
            name,
            season,
            kind,
            avg,
        })
    })
    .collect();

    // League-wide comparison pool: the best player-seasons across all positions.
    let mut pool: Vec<&PlayerSeason> = seasons.iter().collect();
    pool.sort_by(|a, b| {
        cmp_desc(a.avg, b.avg)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.season.cmp(&b.season))
    });
    pool.truncate(TIER_COMPARISON_POOL);
    let mut comparison: HashMap<(Tier, PositionKind), GroupStats> = HashMap::new();
    for ps in pool {
        comparison.entry((ps.tier, ps.kind)).or_default().push(ps.avg);
    }

    // Season-over-season improvement per player.
    let mut history: BTreeMap<&str, Vec<&PlayerSeason>> = BTreeMap::new();
    for ps in &seasons {
        history.entry(ps.name.as_str()).or_default().push(ps);
    }
    let mut improved: HashSet<(&str, i32, PositionKind)> = HashSet::new();
    for entries in history.values_mut() {
        entries.sort_by_key(|ps| (ps.season, ps.kind));
        for pair in entries.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            if cur.avg > prev.avg {
                improved.insert((cur.name.as_str(), cur.season, cur.kind));
            }
        }
    }

    let selected = seasons
        .iter()
        .filter(|ps| ps.kind == kind && ps.season >= season_floor);
    let by_tier = group_by(selected, |ps| Some(ps.tier));

    let having = Having::at_least(min_players as usize);
    let mut rows: Vec<TierRow> = by_tier
        .into_iter()
        .filter(|(_, members)| having.admits(members.len(), 0.0))
        .filter_map(|(tier, members)| {
            let perf: GroupStats = members.iter().map(|ps| ps.avg).collect();
            let volatility: GroupStats = members.iter().map(|ps| ps.stddev).collect();
            let points: GroupStats = members.iter().filter_map(|ps| ps.avg_fantasy_points).collect();
            let avg_perf = perf.mean()?;
            let (cross_base, comparison_count) = match comparison.get(&(tier, kind)) {
                Some(c) => (c.mean().unwrap_or(avg_perf), c.count()),
                None => (avg_perf, members.len()),
            };
            let names: BTreeSet<&str> = members
                .iter()
                .filter(|ps| improved.contains(&(ps.name.as_str(), ps.season, ps.kind)))
                .map(|ps| ps.name.as_str())
                .collect();
            Some(TierRow {
                performance_tier: tier,
                position: kind.as_str().to_string(),
                player_count: members.len(),
                avg_tier_performance: round_to(avg_perf, 2),
                avg_performance_volatility: round_to(volatility.mean()?, 2),
                cross_calc: round_to(avg_perf * cross_base, 2),
                comparison_count,
                avg_fantasy_points: points.mean().map(|m| round_to(m, 2)),
                improved_players: (!names.is_empty())
                    .then(|| names.into_iter().collect::<Vec<_>>().join(", ")),
            })
        })
        .collect();
    rows.sort_by_key(|r| r.performance_tier.rank());
    Ok(rows)
}

// ── Injury follow-up probability ─────────────────────────────────────────────

/// P(injury near adverse weather) and P(re-injury | such an injury), as a
/// single-row result.
pub async fn injury_followup_probability(
    ds: &dyn DatasetAccessor,
    params: FollowupParams,
    condition: WeatherCondition,
) -> AnalyticsResult<Vec<InjuryFollowup>> {
    if !condition.is_adverse() {
        return Err(AnalyticsError::invalid(
            "condition",
            format!("{} is not an adverse-weather condition", condition.as_str()),
        ));
    }
    require_positive("min_seasons", params.min_seasons)?;

    let players = ds.players().await?;
    let injuries = ds.injuries(RowFilter::default()).await?;
    let weather = ds.weather(RowFilter::default()).await?;

    let adverse = AdverseWeekIndex::from_weather(&weather, |r| condition.matches_record(r));
    if adverse.is_empty() {
        debug!("No {} weeks in the weather table", condition.as_str());
    }
    debug!(
        "{} adverse week(s) indexed for {} (W={})",
        adverse.len(),
        condition.as_str(),
        params.half_width
    );
    Ok(vec![injury_followup(&players, &injuries, &adverse, params)])
}
