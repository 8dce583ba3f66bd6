//! Ranks candidate employees for a new task by combining skill match,
//! current workload and the last persisted productivity score. Read-only;
//! it never recomputes scores.

use tracing::debug;

use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::assignment::CandidateRecommendation;

const SKILL_MATCH_WEIGHT: f64 = 0.4;
const WORKLOAD_WEIGHT: f64 = 0.35;
const PRODUCTIVITY_WEIGHT: f64 = 0.25;

// Without required skills every candidate sits at the neutral midpoint.
const NEUTRAL_SKILL_MATCH: f64 = 0.5;
// Workload score decays linearly and bottoms out at this many active tasks.
const WORKLOAD_CEILING: f64 = 10.0;
const MAX_RECOMMENDATIONS: usize = 5;

#[derive(Clone)]
pub struct AssignmentService {
    db: DbPool,
}

impl AssignmentService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Top candidates for a task requiring `required_skills` (may be empty),
    /// at most five, ordered by descending recommendation score. Ties break
    /// by ascending employee id so the ordering is deterministic.
    pub fn rank_candidates(
        &self,
        organization_id: &str,
        required_skills: &[String],
    ) -> AppResult<Vec<CandidateRecommendation>> {
        let rows = self.db.with_connection(|conn| {
            EmployeeRepository::find_organization(conn, organization_id)?
                .ok_or_else(AppError::not_found)?;
            EmployeeRepository::list_candidates(conn, organization_id)
        })?;

        let mut ranked = rows
            .into_iter()
            .map(|row| {
                let skills = row.skills()?;
                let skill_match = skill_match(required_skills, &skills);
                let workload_score =
                    (1.0 - row.active_task_count as f64 / WORKLOAD_CEILING).max(0.0);
                let productivity = row.productivity_score / 100.0;

                let total = skill_match * SKILL_MATCH_WEIGHT
                    + workload_score * WORKLOAD_WEIGHT
                    + productivity * PRODUCTIVITY_WEIGHT;

                Ok(CandidateRecommendation {
                    employee_id: row.employee_id,
                    name: row.name,
                    recommendation_score: (total * 100.0).round() as i64,
                    skill_match,
                    active_task_count: row.active_task_count,
                    productivity_score: row.productivity_score,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        ranked.sort_by(|a, b| {
            b.recommendation_score
                .cmp(&a.recommendation_score)
                .then_with(|| a.employee_id.cmp(&b.employee_id))
        });
        ranked.truncate(MAX_RECOMMENDATIONS);

        debug!(
            target: "app::assignment",
            %organization_id,
            required_skills = required_skills.len(),
            candidates = ranked.len(),
            "candidates ranked"
        );
        Ok(ranked)
    }
}

/// Fraction of required skills the candidate covers. Each required skill
/// matches when any candidate skill contains it, case-insensitively, so
/// "react" matches "React.js". One required skill contributes at most one
/// match however many candidate skills satisfy it.
fn skill_match(required: &[String], candidate: &[String]) -> f64 {
    if required.is_empty() {
        return NEUTRAL_SKILL_MATCH;
    }

    let lowered: Vec<String> = candidate
        .iter()
        .map(|skill| skill.to_lowercase())
        .collect();

    let matched = required
        .iter()
        .filter(|requirement| {
            let needle = requirement.trim().to_lowercase();
            !needle.is_empty() && lowered.iter().any(|skill| skill.contains(&needle))
        })
        .count();

    matched as f64 / required.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn empty_requirements_are_neutral() {
        assert_eq!(skill_match(&[], &strings(&["Rust"])), 0.5);
        assert_eq!(skill_match(&[], &[]), 0.5);
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let candidate = strings(&["react.js"]);
        assert_eq!(skill_match(&strings(&["React"]), &candidate), 1.0);
    }

    #[test]
    fn each_requirement_counts_once() {
        let candidate = strings(&["React.js", "React Native"]);
        assert_eq!(skill_match(&strings(&["react"]), &candidate), 1.0);
    }

    #[test]
    fn partial_coverage_is_fractional() {
        let candidate = strings(&["SQL"]);
        let required = strings(&["sql", "kubernetes"]);
        assert_eq!(skill_match(&required, &candidate), 0.5);
    }

    #[test]
    fn no_skills_means_zero_match() {
        assert_eq!(skill_match(&strings(&["go"]), &[]), 0.0);
    }
}
