//! Chained injury probabilities:
//!
//! 1. `P(injury | adverse weather) = injured_number / player_number`
//! 2. `P(re-injury | injury)        = injured_again / injured_number`
//!
//! An injury counts toward (1) when it is qualifying (`Out`) and falls within
//! the association window of an adverse-weather week. A player counts toward
//! (2) when some qualifying injury of theirs comes strictly after one of
//! those weather-associated injuries, ordered by `(season, week)`.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::aggregate::Ratio;
use super::window::AdverseWeekIndex;
use crate::db::models::{InjuryRecord, Player};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowupParams {
    /// `W` in `[week - W, week + W]`
    pub half_width: u32,
    /// Count only weather-associated injuries from this season.
    pub season: Option<i32>,
    /// Associated injuries must span at least this many distinct seasons.
    pub min_seasons: u32,
}

impl Default for FollowupParams {
    fn default() -> Self {
        FollowupParams {
            half_width: 0,
            season: None,
            min_seasons: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjuryFollowup {
    pub player_number: usize,
    pub injured_number: usize,
    pub injured_again: usize,
    pub injury_prob: Ratio,
    pub another_injury_prob: Ratio,
}

pub fn injury_followup(
    players: &[Player],
    injuries: &[InjuryRecord],
    adverse: &AdverseWeekIndex,
    params: FollowupParams,
) -> InjuryFollowup {
    let player_number = players
        .iter()
        .map(|p| p.name.as_str())
        .collect::<HashSet<_>>()
        .len();

    // player → every qualifying (season, week), deduplicated
    let mut qualifying: BTreeMap<&str, BTreeSet<(i32, i32)>> = BTreeMap::new();
    for injury in injuries.iter().filter(|i| i.is_qualifying()) {
        if let Some(week) = injury.week {
            qualifying
                .entry(injury.player.as_str())
                .or_default()
                .insert((injury.season, week));
        }
    }

    let mut injured_number = 0;
    let mut injured_again = 0;
    for keys in qualifying.values() {
        let associated: Vec<(i32, i32)> = keys
            .iter()
            .copied()
            .filter(|(season, _)| params.season.map_or(true, |s| s == *season))
            .filter(|(season, week)| adverse.is_associated(*season, *week, params.half_width))
            .collect();

        let seasons: BTreeSet<i32> = associated.iter().map(|(s, _)| *s).collect();
        if seasons.is_empty() || seasons.len() < params.min_seasons as usize {
            continue;
        }
        injured_number += 1;

        // `keys` is ordered, so anything after the earliest associated injury
        // is a follow-up.
        let first = associated[0];
        if keys.range((first.0, first.1 + 1)..).next().is_some() {
            injured_again += 1;
        }
    }

    InjuryFollowup {
        player_number,
        injured_number,
        injured_again,
        injury_prob: Ratio::of(injured_number as f64, player_number as f64),
        another_injury_prob: Ratio::of(injured_again as f64, injured_number as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str, position: &str) -> Player {
        Player {
            name: name.into(),
            position: position.into(),
        }
    }

    fn injury(player: &str, season: i32, week: i32, status: &str) -> InjuryRecord {
        InjuryRecord {
            player: player.into(),
            season,
            week: Some(week),
            game_status: Some(status.into()),
        }
    }

    fn fog(entries: &[(i32, i32)]) -> AdverseWeekIndex {
        let mut idx = AdverseWeekIndex::new();
        for (s, w) in entries {
            idx.insert(*s, *w);
        }
        idx
    }

    #[test]
    fn empty_population_is_undefined() {
        let out = injury_followup(&[], &[], &AdverseWeekIndex::new(), FollowupParams::default());
        assert_eq!(out.player_number, 0);
        assert_eq!(out.injury_prob, Ratio::Undefined);
        assert_eq!(out.another_injury_prob, Ratio::Undefined);
    }

    #[test]
    fn reinjury_in_a_later_season() {
        let players = vec![player("A", "QB")];
        let injuries = vec![injury("A", 2020, 5, "Out"), injury("A", 2021, 5, "Out")];
        let out = injury_followup(&players, &injuries, &fog(&[(2020, 5)]), FollowupParams::default());
        assert_eq!(out.injured_number, 1);
        assert_eq!(out.injured_again, 1);
        assert_eq!(out.injury_prob, Ratio::Defined(1.0));
        assert_eq!(out.another_injury_prob, Ratio::Defined(1.0));
    }

    #[test]
    fn earlier_injuries_do_not_count_as_followups() {
        let players = vec![player("A", "QB"), player("B", "RB")];
        let injuries = vec![injury("A", 2020, 3, "Out"), injury("A", 2020, 9, "Out")];
        // Only the later injury is near fog.
        let out = injury_followup(&players, &injuries, &fog(&[(2020, 9)]), FollowupParams::default());
        assert_eq!(out.injured_number, 1);
        assert_eq!(out.injured_again, 0);
        assert_eq!(out.injury_prob, Ratio::Defined(0.5));
        assert_eq!(out.another_injury_prob, Ratio::Defined(0.0));
    }

    #[test]
    fn non_out_statuses_are_ignored() {
        let players = vec![player("A", "WR")];
        let injuries = vec![
            injury("A", 2020, 5, "Questionable"),
            injury("A", 2020, 6, "Doubtful"),
        ];
        let out = injury_followup(&players, &injuries, &fog(&[(2020, 5)]), FollowupParams::default());
        assert_eq!(out.injured_number, 0);
        assert_eq!(out.injury_prob, Ratio::Defined(0.0));
        assert_eq!(out.another_injury_prob, Ratio::Undefined);
    }

    #[test]
    fn window_width_controls_association() {
        let players = vec![player("A", "QB")];
        let injuries = vec![injury("A", 2021, 10, "Out")];
        let idx = fog(&[(2021, 8)]);
        let narrow = FollowupParams {
            half_width: 1,
            ..FollowupParams::default()
        };
        let wide = FollowupParams {
            half_width: 2,
            ..FollowupParams::default()
        };
        assert_eq!(injury_followup(&players, &injuries, &idx, narrow).injured_number, 0);
        assert_eq!(injury_followup(&players, &injuries, &idx, wide).injured_number, 1);
    }

    #[test]
    fn duplicate_records_and_missing_weeks() {
        let players = vec![player("A", "QB")];
        let injuries = vec![
            injury("A", 2020, 5, "Out"),
            injury("A", 2020, 5, "Out"),
            InjuryRecord {
                player: "A".into(),
                season: 2020,
                week: None,
                game_status: Some("Out".into()),
            },
        ];
        let out = injury_followup(&players, &injuries, &fog(&[(2020, 5)]), FollowupParams::default());
        assert_eq!(out.injured_number, 1);
        assert_eq!(out.injured_again, 0);
    }

    #[test]
    fn season_filter_and_min_seasons() {
        let players = vec![player("A", "QB"), player("B", "RB")];
        let injuries = vec![
            injury("A", 2020, 5, "Out"),
            injury("A", 2021, 5, "Out"),
            injury("B", 2021, 5, "Out"),
        ];
        let idx = fog(&[(2020, 5), (2021, 5)]);

        let only_2021 = FollowupParams {
            season: Some(2021),
            ..FollowupParams::default()
        };
        let out = injury_followup(&players, &injuries, &idx, only_2021);
        assert_eq!(out.injured_number, 2);
        assert_eq!(out.injured_again, 0);

        let two_seasons = FollowupParams {
            min_seasons: 2,
            ..FollowupParams::default()
        };
        let out = injury_followup(&players, &injuries, &idx, two_seasons);
        assert_eq!(out.injured_number, 1);
        assert_eq!(out.injured_again, 1);
        assert_eq!(out.another_injury_prob, Ratio::Defined(1.0));
    }
}
