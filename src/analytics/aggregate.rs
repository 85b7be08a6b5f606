//! Grouped reductions with post-aggregation ("HAVING") filters.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Running count / sum / mean / population variance / min / max.
///
/// Uses Welford's update so long groups don't lose precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupStats {
    count: usize,
    sum: f64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for GroupStats {
    fn default() -> Self {
        GroupStats {
            count: 0,
            sum: 0.0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl GroupStats {
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Population standard deviation. A single-row group has stddev `0`.
    pub fn stddev(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.m2 / self.count as f64).max(0.0).sqrt())
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }
}

impl FromIterator<f64> for GroupStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = GroupStats::default();
        for x in iter {
            stats.push(x);
        }
        stats
    }
}

/// Partition rows by key. Rows whose key is `None` are dropped rather than
/// collected into a synthetic group. Groups come back in key order.
pub fn group_by<T, K, F>(rows: impl IntoIterator<Item = T>, key: F) -> BTreeMap<K, Vec<T>>
where
    K: Ord,
    F: Fn(&T) -> Option<K>,
{
    let mut groups: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for row in rows {
        if let Some(k) = key(&row) {
            groups.entry(k).or_default().push(row);
        }
    }
    groups
}

/// Post-aggregation filter on group cardinality and summed value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Having {
    min_count: usize,
    min_sum: Option<f64>,
}

impl Having {
    /// `COUNT(*) >= n`
    pub fn at_least(n: usize) -> Self {
        Having {
            min_count: n,
            min_sum: None,
        }
    }

    /// `COUNT(*) > n`
    pub fn more_than(n: usize) -> Self {
        Self::at_least(n.saturating_add(1))
    }

    /// Additionally require `SUM(..) >= min`.
    pub fn with_min_sum(mut self, min: f64) -> Self {
        self.min_sum = Some(min);
        self
    }

    pub fn admits(&self, count: usize, sum: f64) -> bool {
        count >= self.min_count && self.min_sum.map_or(true, |m| sum >= m)
    }
}

/// A ratio whose denominator may be zero. `Undefined` serializes as `null`,
/// which callers must not confuse with a computed `0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    Defined(f64),
    Undefined,
}

impl Ratio {
    pub fn of(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
            Ratio::Undefined
        } else {
            Ratio::Defined(numerator / denominator)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Ratio::Defined(v) => Some(*v),
            Ratio::Undefined => None,
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        match self {
            Ratio::Defined(v) => Ratio::Defined(v * factor),
            Ratio::Undefined => Ratio::Undefined,
        }
    }

    pub fn rounded(self, places: u32) -> Self {
        match self {
            Ratio::Defined(v) => Ratio::Defined(round_to(v, places)),
            Ratio::Undefined => Ratio::Undefined,
        }
    }

    /// Descending order with `Undefined` last.
    pub fn cmp_desc(&self, other: &Ratio) -> Ordering {
        cmp_opt_desc(self.value(), other.value())
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Ratio::Defined(v) => serializer.serialize_f64(*v),
            Ratio::Undefined => serializer.serialize_none(),
        }
    }
}

pub fn round_to(x: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (x * factor).round() / factor
}

pub fn cmp_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

pub fn cmp_asc(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

/// Descending order with `None` last.
pub fn cmp_opt_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp_desc(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
