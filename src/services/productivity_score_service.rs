//! Productivity scoring engine: a weighted composite over one employee's
//! current task snapshot. The computation is deterministic given the
//! snapshot and the injected clock; "recent" windows are relative to call
//! time, so results may legitimately differ across window boundaries.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info};

use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::repositories::score_repository::ScoreRepository;
use crate::db::repositories::task_repository::TaskRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::productivity::{
    ProductivityRecord, RecalculationSummary, ScoreResult, Trend,
};
use crate::models::task::TaskRecord;
use crate::services::task_service::{PRIORITY_HIGH, PRIORITY_MEDIUM, STATUS_COMPLETED};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::time::parse_utc;

const COMPLETION_WEIGHT: f64 = 40.0;
const ON_TIME_WEIGHT: f64 = 30.0;
const COMPLEXITY_WEIGHT: f64 = 20.0;
const RECENT_ACTIVITY_WEIGHT: f64 = 10.0;

const HIGH_PRIORITY_CREDIT: f64 = 1.0;
const MEDIUM_PRIORITY_CREDIT: f64 = 0.6;

const RECENT_WINDOW_DAYS: i64 = 7;
// 3+ completions inside the recent window saturate the activity bonus.
const RECENT_BONUS_TARGET: f64 = 3.0;
// Week-over-week difference must exceed this to leave "stable".
const TREND_THRESHOLD: i64 = 1;

const REC_FIRST_TASK: &str = "Get started by completing your first task!";
const REC_COMPLETE_TASKS: &str = "Focus on completing assigned tasks";
const REC_TIME_MANAGEMENT: &str = "Improve time management to meet deadlines";
const REC_HIGHER_PRIORITY: &str = "Take on higher priority tasks to boost score";
const REC_STAY_ACTIVE: &str = "Stay active — complete tasks regularly";
const REC_KEEP_MOMENTUM: &str = "Great work! Keep up the momentum!";

pub struct ProductivityScoreService {
    db: DbPool,
    clock: Arc<dyn Clock>,
}

impl ProductivityScoreService {
    pub fn new(db: DbPool) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Compute, persist and return the productivity score for one employee.
    ///
    /// An employee with zero tasks gets a transient zero-valued result and
    /// nothing is persisted. Otherwise the previous record is replaced
    /// wholesale (last write wins, no version check).
    pub fn compute_score(&self, employee_id: &str) -> AppResult<ScoreResult> {
        let now = self.clock.now();
        let conn = self.db.get_connection()?;

        EmployeeRepository::find_by_id(&conn, employee_id)?.ok_or_else(AppError::not_found)?;

        let tasks = TaskRepository::list_for_assignee(&conn, employee_id)?;
        if tasks.is_empty() {
            debug!(target: "app::score", %employee_id, "no tasks, returning transient zero result");
            return Ok(zero_task_result());
        }

        let breakdown = analyze_tasks(&tasks, now)?;
        let score = weighted_score(&breakdown);
        let trend = derive_trend(&breakdown);
        let recommendations = build_recommendations(&breakdown);

        let record = ProductivityRecord {
            employee_id: employee_id.to_string(),
            score,
            task_completion_rate: round2(breakdown.completion_rate * 100.0),
            on_time_rate: round2(breakdown.on_time_rate * 100.0),
            trend,
            recommendations: recommendations.clone(),
            last_calculated: now.to_rfc3339(),
        };
        ScoreRepository::upsert(&conn, &record)?;

        info!(
            target: "app::score",
            %employee_id,
            score,
            trend = trend.as_str(),
            total_tasks = breakdown.total_tasks,
            "productivity score computed"
        );

        Ok(ScoreResult {
            score,
            task_completion_rate: whole_percent(breakdown.completion_rate),
            on_time_rate: whole_percent(breakdown.on_time_rate),
            complexity_score: whole_percent(breakdown.complexity_score),
            recent_activity_bonus: whole_percent(breakdown.recent_bonus),
            trend,
            recommendations,
            total_tasks: breakdown.total_tasks,
            completed_tasks: breakdown.completed_tasks,
        })
    }

    /// Latest persisted record for an employee, if one has been computed.
    pub fn latest_score(&self, employee_id: &str) -> AppResult<Option<ProductivityRecord>> {
        self.db.with_connection(|conn| {
            EmployeeRepository::find_by_id(conn, employee_id)?.ok_or_else(AppError::not_found)?;
            ScoreRepository::find_by_employee(conn, employee_id)
        })
    }

    /// Recompute scores for every active employee of one organization.
    /// Each computation is independent; one failure never aborts the rest.
    pub fn recalculate_organization(
        &self,
        organization_id: &str,
    ) -> AppResult<RecalculationSummary> {
        let employees = self.db.with_connection(|conn| {
            EmployeeRepository::find_organization(conn, organization_id)?
                .ok_or_else(AppError::not_found)?;
            EmployeeRepository::list_active_for_organization(conn, organization_id)
        })?;

        let mut summary = RecalculationSummary::default();
        for employee in &employees {
            match self.compute_score(&employee.id) {
                Ok(_) => summary.succeeded += 1,
                Err(err) => {
                    summary.failed += 1;
                    error!(
                        target: "app::score",
                        employee_id = %employee.id,
                        error = %err,
                        "score recalculation failed"
                    );
                }
            }
        }

        info!(
            target: "app::score",
            %organization_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "organization scores recalculated"
        );
        Ok(summary)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ScoreBreakdown {
    completion_rate: f64,
    on_time_rate: f64,
    complexity_score: f64,
    recent_bonus: f64,
    recent_completed: i64,
    previous_completed: i64,
    completed_high_priority: i64,
    total_tasks: i64,
    completed_tasks: i64,
}

fn analyze_tasks(tasks: &[TaskRecord], now: DateTime<Utc>) -> AppResult<ScoreBreakdown> {
    let recent_start = now - Duration::days(RECENT_WINDOW_DAYS);
    let previous_start = now - Duration::days(2 * RECENT_WINDOW_DAYS);

    let total_tasks = tasks.len() as i64;
    let mut completed_tasks = 0i64;
    let mut on_time_tasks = 0i64;
    let mut high_priority = 0i64;
    let mut medium_priority = 0i64;
    let mut recent_completed = 0i64;
    let mut previous_completed = 0i64;

    for task in tasks {
        if task.status != STATUS_COMPLETED {
            continue;
        }
        completed_tasks += 1;

        let completed_at = task
            .completed_at
            .as_deref()
            .map(parse_utc)
            .transpose()?;

        // An absent due date counts as on-time regardless of completion time.
        let on_time = match (task.due_at.as_deref(), completed_at) {
            (None, _) => true,
            (Some(due), Some(done)) => done <= parse_utc(due)?,
            (Some(_), None) => false,
        };
        if on_time {
            on_time_tasks += 1;
        }

        if task.priority == PRIORITY_HIGH {
            high_priority += 1;
        } else if task.priority == PRIORITY_MEDIUM {
            medium_priority += 1;
        }

        if let Some(done) = completed_at {
            if done >= recent_start && done <= now {
                recent_completed += 1;
            } else if done >= previous_start && done < recent_start {
                previous_completed += 1;
            }
        }
    }

    let completion_rate = completed_tasks as f64 / total_tasks as f64;
    let on_time_rate = if completed_tasks > 0 {
        on_time_tasks as f64 / completed_tasks as f64
    } else {
        0.0
    };
    let complexity_score = if completed_tasks > 0 {
        (high_priority as f64 * HIGH_PRIORITY_CREDIT
            + medium_priority as f64 * MEDIUM_PRIORITY_CREDIT)
            / completed_tasks as f64
    } else {
        0.0
    };
    let recent_bonus = (recent_completed as f64 / RECENT_BONUS_TARGET).min(1.0);

    Ok(ScoreBreakdown {
        completion_rate,
        on_time_rate,
        complexity_score,
        recent_bonus,
        recent_completed,
        previous_completed,
        completed_high_priority: high_priority,
        total_tasks,
        completed_tasks,
    })
}

fn weighted_score(breakdown: &ScoreBreakdown) -> f64 {
    let raw = breakdown.completion_rate * COMPLETION_WEIGHT
        + breakdown.on_time_rate * ON_TIME_WEIGHT
        + breakdown.complexity_score * COMPLEXITY_WEIGHT
        + breakdown.recent_bonus * RECENT_ACTIVITY_WEIGHT;
    round2(raw.min(100.0))
}

fn derive_trend(breakdown: &ScoreBreakdown) -> Trend {
    let delta = breakdown.recent_completed - breakdown.previous_completed;
    if delta > TREND_THRESHOLD {
        Trend::Improving
    } else if delta < -TREND_THRESHOLD {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

// Conditions are independent and ordered; several may fire together.
fn build_recommendations(breakdown: &ScoreBreakdown) -> Vec<String> {
    let mut recommendations = Vec::new();
    if breakdown.completion_rate < 0.5 {
        recommendations.push(REC_COMPLETE_TASKS.to_string());
    }
    if breakdown.on_time_rate < 0.6 {
        recommendations.push(REC_TIME_MANAGEMENT.to_string());
    }
    if breakdown.completed_high_priority == 0 {
        recommendations.push(REC_HIGHER_PRIORITY.to_string());
    }
    if breakdown.recent_completed == 0 {
        recommendations.push(REC_STAY_ACTIVE.to_string());
    }
    if recommendations.is_empty() {
        recommendations.push(REC_KEEP_MOMENTUM.to_string());
    }
    recommendations
}

fn zero_task_result() -> ScoreResult {
    ScoreResult {
        score: 0.0,
        task_completion_rate: 0,
        on_time_rate: 0,
        complexity_score: 0,
        recent_activity_bonus: 0,
        trend: Trend::NoData,
        recommendations: vec![REC_FIRST_TASK.to_string()],
        total_tasks: 0,
        completed_tasks: 0,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn whole_percent(fraction: f64) -> i64 {
    (fraction * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn task(status: &str, priority: &str, due_at: Option<&str>, completed_at: Option<&str>) -> TaskRecord {
        TaskRecord {
            id: uuid::Uuid::new_v4().to_string(),
            organization_id: "org".into(),
            assignee_id: "emp".into(),
            title: "Task".into(),
            description: None,
            status: status.into(),
            priority: priority.into(),
            due_at: due_at.map(|value| value.to_string()),
            completed_at: completed_at.map(|value| value.to_string()),
            created_at: "2025-05-01T08:00:00+00:00".into(),
        }
    }

    #[test]
    fn half_completed_all_on_time_low_priority_scores_fifty() {
        // 10 tasks, 5 completed on time, all low priority, none recent.
        let mut tasks = Vec::new();
        for _ in 0..5 {
            tasks.push(task(
                "completed",
                "low",
                Some("2025-05-10T17:00:00+00:00"),
                Some("2025-05-10T09:00:00+00:00"),
            ));
        }
        for _ in 0..5 {
            tasks.push(task("assigned", "low", None, None));
        }

        let breakdown = analyze_tasks(&tasks, fixed_now()).expect("analyze");
        assert_eq!(breakdown.completion_rate, 0.5);
        assert_eq!(breakdown.on_time_rate, 1.0);
        assert_eq!(breakdown.complexity_score, 0.0);
        assert_eq!(breakdown.recent_bonus, 0.0);
        assert_eq!(weighted_score(&breakdown), 50.0);

        let recommendations = build_recommendations(&breakdown);
        assert!(recommendations.contains(&REC_HIGHER_PRIORITY.to_string()));
        assert!(recommendations.contains(&REC_STAY_ACTIVE.to_string()));
        assert!(!recommendations.contains(&REC_COMPLETE_TASKS.to_string()));
        assert!(!recommendations.contains(&REC_TIME_MANAGEMENT.to_string()));
    }

    #[test]
    fn missing_due_date_counts_as_on_time() {
        let tasks = vec![task(
            "completed",
            "low",
            None,
            Some("2025-06-14T09:00:00+00:00"),
        )];
        let breakdown = analyze_tasks(&tasks, fixed_now()).expect("analyze");
        assert_eq!(breakdown.on_time_rate, 1.0);
    }

    #[test]
    fn late_completion_is_not_on_time() {
        let tasks = vec![task(
            "completed",
            "low",
            Some("2025-06-10T09:00:00+00:00"),
            Some("2025-06-14T09:00:00+00:00"),
        )];
        let breakdown = analyze_tasks(&tasks, fixed_now()).expect("analyze");
        assert_eq!(breakdown.on_time_rate, 0.0);
    }

    #[test]
    fn recent_bonus_saturates_at_three_completions() {
        let recent = Some("2025-06-14T09:00:00+00:00");
        let three: Vec<_> = (0..3).map(|_| task("completed", "low", None, recent)).collect();
        let five: Vec<_> = (0..5).map(|_| task("completed", "low", None, recent)).collect();

        let three_bonus = analyze_tasks(&three, fixed_now()).expect("analyze").recent_bonus;
        let five_bonus = analyze_tasks(&five, fixed_now()).expect("analyze").recent_bonus;
        assert_eq!(three_bonus, 1.0);
        assert_eq!(five_bonus, 1.0);
    }

    #[test]
    fn trend_boundaries_at_plus_minus_one() {
        let breakdown = |recent, previous| ScoreBreakdown {
            recent_completed: recent,
            previous_completed: previous,
            ..ScoreBreakdown::default()
        };

        assert_eq!(derive_trend(&breakdown(3, 1)), Trend::Improving);
        assert_eq!(derive_trend(&breakdown(2, 1)), Trend::Stable);
        assert_eq!(derive_trend(&breakdown(1, 2)), Trend::Stable);
        assert_eq!(derive_trend(&breakdown(1, 3)), Trend::Declining);
        assert_eq!(derive_trend(&breakdown(2, 2)), Trend::Stable);
    }

    #[test]
    fn complexity_weighs_high_and_medium_completions() {
        let done = Some("2025-05-20T09:00:00+00:00");
        let tasks = vec![
            task("completed", "high", None, done),
            task("completed", "medium", None, done),
            task("completed", "low", None, done),
            task("completed", "low", None, done),
        ];
        let breakdown = analyze_tasks(&tasks, fixed_now()).expect("analyze");
        assert!((breakdown.complexity_score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn momentum_message_when_nothing_fires() {
        let breakdown = ScoreBreakdown {
            completion_rate: 0.9,
            on_time_rate: 0.9,
            completed_high_priority: 2,
            recent_completed: 3,
            ..ScoreBreakdown::default()
        };
        let recommendations = build_recommendations(&breakdown);
        assert_eq!(recommendations, vec![REC_KEEP_MOMENTUM.to_string()]);
    }

    #[test]
    fn score_is_clamped_and_rounded() {
        let breakdown = ScoreBreakdown {
            completion_rate: 1.0,
            on_time_rate: 1.0,
            complexity_score: 1.0,
            recent_bonus: 1.0,
            ..ScoreBreakdown::default()
        };
        assert_eq!(weighted_score(&breakdown), 100.0);
        assert_eq!(round2(33.333333), 33.33);
    }
}
