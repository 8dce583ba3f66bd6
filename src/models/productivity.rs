use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Week-over-week directional signal derived from completion counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    NoData,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
            Trend::NoData => "no_data",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "improving" => Ok(Trend::Improving),
            "declining" => Ok(Trend::Declining),
            "stable" => Ok(Trend::Stable),
            "no_data" => Ok(Trend::NoData),
            _ => Err(AppError::validation("趋势取值非法")),
        }
    }
}

/// Result returned to the caller of a score computation. Percentages are
/// rounded to whole percent here; the persisted record keeps two decimals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: f64,
    pub task_completion_rate: i64,
    pub on_time_rate: i64,
    pub complexity_score: i64,
    pub recent_activity_bonus: i64,
    pub trend: Trend,
    pub recommendations: Vec<String>,
    pub total_tasks: i64,
    pub completed_tasks: i64,
}

/// Persisted productivity record, one row per employee, replaced wholesale
/// on every recomputation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityRecord {
    pub employee_id: String,
    pub score: f64,
    pub task_completion_rate: f64,
    pub on_time_rate: f64,
    pub trend: Trend,
    pub recommendations: Vec<String>,
    pub last_calculated: String,
}

/// Outcome of a bulk recomputation across an organization. Individual
/// failures are counted, never aborting the batch.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationSummary {
    pub succeeded: usize,
    pub failed: usize,
}
