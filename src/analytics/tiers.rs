//! Position-specific performance scores and tier breakpoints.

use serde::Serialize;

use crate::db::models::{PositionKind, PositionStat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Tier {
    Elite,
    #[serde(rename = "Above Average")]
    AboveAverage,
    Average,
    #[serde(rename = "Below Average")]
    BelowAverage,
}

impl Tier {
    /// Presentation order, best first.
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Elite => 1,
            Tier::AboveAverage => 2,
            Tier::Average => 3,
            Tier::BelowAverage => 4,
        }
    }

    /// Breakpoints are exclusive lower bounds: a score equal to a breakpoint
    /// lands in the tier below.
    pub fn classify(kind: PositionKind, avg_performance: f64) -> Tier {
        let b = breakpoints(kind);
        if avg_performance > b.elite {
            Tier::Elite
        } else if avg_performance > b.above_average {
            Tier::AboveAverage
        } else if avg_performance > b.average {
            Tier::Average
        } else {
            Tier::BelowAverage
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoints {
    pub elite: f64,
    pub above_average: f64,
    pub average: f64,
}

pub fn breakpoints(kind: PositionKind) -> Breakpoints {
    match kind {
        PositionKind::Qb => Breakpoints {
            elite: 24.0,
            above_average: 20.0,
            average: 15.0,
        },
        PositionKind::Rb => Breakpoints {
            elite: 18.0,
            above_average: 14.0,
            average: 10.0,
        },
        PositionKind::Wr => Breakpoints {
            elite: 15.0,
            above_average: 12.0,
            average: 8.0,
        },
    }
}

/// Weighted per-game performance score.
pub fn performance_score(stat: &PositionStat) -> f64 {
    match stat {
        PositionStat::Qb(q) => {
            0.04 * q.passing_yards + 4.0 * q.passing_tds + 0.1 * q.rushing_yards
                + 6.0 * q.rushing_tds
                - 2.0 * q.interceptions
        }
        PositionStat::Rb(r) => {
            0.1 * r.rushing_yards + 6.0 * r.rushing_tds + 0.1 * r.receiving_yards
                + 6.0 * r.receiving_tds
        }
        PositionStat::Wr(w) => 0.1 * w.receiving_yards + 6.0 * w.receiving_tds,
    }
}
