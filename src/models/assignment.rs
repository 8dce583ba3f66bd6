use serde::{Deserialize, Serialize};

/// A ranked candidate for a new task, annotated with the composite
/// recommendation score and its inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecommendation {
    pub employee_id: String,
    pub name: String,
    pub recommendation_score: i64,
    pub skill_match: f64,
    pub active_task_count: i64,
    pub productivity_score: f64,
}
