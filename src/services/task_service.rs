use std::sync::Arc;

use tracing::{debug, info};

use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::repositories::task_repository::TaskRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::task::{TaskCreateInput, TaskRecord};
use crate::services::audit_log_service::{AuditEvent, AuditLog};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::time::normalize_optional_utc;

pub const STATUS_ASSIGNED: &str = "assigned";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";

pub const PRIORITY_LOW: &str = "low";
pub const PRIORITY_MEDIUM: &str = "medium";
pub const PRIORITY_HIGH: &str = "high";

const VALID_PRIORITIES: &[&str] = &[PRIORITY_LOW, PRIORITY_MEDIUM, PRIORITY_HIGH];
// Tasks enter the board assigned or already picked up, never completed.
const CREATABLE_STATUSES: &[&str] = &[STATUS_ASSIGNED, STATUS_IN_PROGRESS];

const AUDIT_ACTION_COMPLETED: &str = "task_completed";

const MAX_TITLE_CHARS: usize = 160;

pub struct TaskService {
    db: DbPool,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditLog>,
}

impl TaskService {
    pub fn new(db: DbPool, audit: Arc<dyn AuditLog>) -> Self {
        Self::with_clock(db, audit, Arc::new(SystemClock))
    }

    pub fn with_clock(db: DbPool, audit: Arc<dyn AuditLog>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock, audit }
    }

    pub fn create_task(&self, input: TaskCreateInput) -> AppResult<TaskRecord> {
        let title = normalize_title(&input.title)?;
        let status = normalize_status(input.status)?;
        let priority = normalize_priority(input.priority)?;
        let due_at = normalize_optional_utc(input.due_at)?;

        let record = TaskRecord {
            id: uuid::Uuid::new_v4().to_string(),
            organization_id: input.organization_id,
            assignee_id: input.assignee_id,
            title,
            description: input.description.filter(|value| !value.trim().is_empty()),
            status,
            priority,
            due_at,
            completed_at: None,
            created_at: self.clock.now().to_rfc3339(),
        };

        self.db.with_connection(|conn| {
            let assignee = EmployeeRepository::find_by_id(conn, &record.assignee_id)?
                .ok_or_else(AppError::not_found)?;
            if assignee.organization_id != record.organization_id {
                return Err(AppError::validation("任务与员工不属于同一组织"));
            }
            TaskRepository::insert(conn, &record)
        })?;

        info!(task_id = %record.id, assignee_id = %record.assignee_id, "task created");
        Ok(record)
    }

    pub fn start_task(&self, id: &str) -> AppResult<TaskRecord> {
        let mut task = self.get_task(id)?;
        if task.status == STATUS_COMPLETED {
            return Err(AppError::conflict("任务已完成，无法重新开始"));
        }
        task.status = STATUS_IN_PROGRESS.to_string();

        self.db.with_connection(|conn| {
            TaskRepository::update_status(conn, id, STATUS_IN_PROGRESS, None)
        })?;
        info!(task_id = %id, "task started");
        Ok(task)
    }

    /// Complete a task and publish an audit event. The audit submission is
    /// fire-and-forget: it runs on a spawned task and its outcome never
    /// reaches this caller.
    pub async fn complete_task(&self, id: &str) -> AppResult<TaskRecord> {
        let mut task = self.get_task(id)?;
        if task.status == STATUS_COMPLETED {
            return Err(AppError::conflict("任务已完成"));
        }

        let completed_at = self.clock.now().to_rfc3339();
        self.db.with_connection(|conn| {
            TaskRepository::update_status(conn, id, STATUS_COMPLETED, Some(&completed_at))
        })?;
        task.status = STATUS_COMPLETED.to_string();
        task.completed_at = Some(completed_at.clone());
        info!(task_id = %id, "task completed");

        let audit = Arc::clone(&self.audit);
        let event = AuditEvent {
            employee_id: task.assignee_id.clone(),
            task_id: task.id.clone(),
            action: AUDIT_ACTION_COMPLETED.to_string(),
            occurred_at: completed_at,
        };
        tokio::spawn(async move {
            audit.record(event).await;
        });

        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> AppResult<TaskRecord> {
        let record = self
            .db
            .with_connection(|conn| TaskRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)?;
        debug!(task_id = %record.id, "task fetched");
        Ok(record)
    }

    pub fn list_for_employee(&self, employee_id: &str) -> AppResult<Vec<TaskRecord>> {
        let tasks = self.db.with_connection(|conn| {
            EmployeeRepository::find_by_id(conn, employee_id)?.ok_or_else(AppError::not_found)?;
            TaskRepository::list_for_assignee(conn, employee_id)
        })?;
        debug!(employee_id = %employee_id, count = tasks.len(), "tasks listed");
        Ok(tasks)
    }
}

fn normalize_title(title: &str) -> AppResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("标题不能为空"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::validation("标题长度需在 160 字以内"));
    }
    Ok(trimmed.to_string())
}

fn normalize_status(status: Option<String>) -> AppResult<String> {
    match status {
        None => Ok(STATUS_ASSIGNED.to_string()),
        Some(value) => {
            let value = value.trim().to_string();
            if CREATABLE_STATUSES.contains(&value.as_str()) {
                Ok(value)
            } else {
                Err(AppError::validation_with_details(
                    "状态取值非法",
                    serde_json::json!({ "status": value }),
                ))
            }
        }
    }
}

fn normalize_priority(priority: Option<String>) -> AppResult<String> {
    match priority {
        None => Ok(PRIORITY_MEDIUM.to_string()),
        Some(value) => {
            let value = value.trim().to_string();
            if VALID_PRIORITIES.contains(&value.as_str()) {
                Ok(value)
            } else {
                Err(AppError::validation_with_details(
                    "优先级取值非法",
                    serde_json::json!({ "priority": value }),
                ))
            }
        }
    }
}
