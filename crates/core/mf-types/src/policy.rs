//! Hourly reduction policy.

use serde::{Deserialize, Serialize};

/// How sub-hourly samples are reduced to one value per hour.
///
/// The policy is explicit configuration: with cumulative energy columns
/// (kWh per interval) the hourly value is the **sum** of the interval
/// values, while with instantaneous-rate columns (kW) it is the **mean**.
/// The two are not interchangeable and the pipeline never infers one
/// from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionPolicy {
    /// Sum the samples in each hour (cumulative consumption semantics)
    Sum,

    /// Average the samples in each hour (instantaneous-rate semantics)
    Mean,
}

impl std::fmt::Display for ReductionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sum => write!(f, "sum"),
            Self::Mean => write!(f, "mean"),
        }
    }
}
