//! Statistical aggregation and probability pipeline.
//!
//! Leaf-first: `weather` and `window` annotate rows, `aggregate` reduces
//! them, `tiers` and `probability` derive the final labels and ratios, and
//! `views` wires those pieces into the named analytical operations.

pub mod aggregate;
pub mod params;
pub mod probability;
pub mod tiers;
pub mod views;
pub mod weather;
pub mod window;

/// Failure of an analytical request. An empty result set is not an error.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Rejected before any data access.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The dataset accessor could not return rows. Not retried here.
    #[error("data access failed: {0:#}")]
    DataAccess(#[from] anyhow::Error),
}

impl AnalyticsError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        AnalyticsError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
