use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::task::TaskRecord;

const BASE_SELECT: &str = r#"
    SELECT
        id,
        organization_id,
        assignee_id,
        title,
        description,
        status,
        priority,
        due_at,
        completed_at,
        created_at
    FROM tasks
"#;

impl TryFrom<&Row<'_>> for TaskRecord {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            organization_id: row.get("organization_id")?,
            assignee_id: row.get("assignee_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: row.get("status")?,
            priority: row.get("priority")?,
            due_at: row.get("due_at")?,
            completed_at: row.get("completed_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct TaskRepository;

impl TaskRepository {
    pub fn insert(conn: &Connection, record: &TaskRecord) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO tasks (
                    id,
                    organization_id,
                    assignee_id,
                    title,
                    description,
                    status,
                    priority,
                    due_at,
                    completed_at,
                    created_at
                ) VALUES (
                    :id,
                    :organization_id,
                    :assignee_id,
                    :title,
                    :description,
                    :status,
                    :priority,
                    :due_at,
                    :completed_at,
                    :created_at
                )
            "#,
            named_params! {
                ":id": &record.id,
                ":organization_id": &record.organization_id,
                ":assignee_id": &record.assignee_id,
                ":title": &record.title,
                ":description": &record.description,
                ":status": &record.status,
                ":priority": &record.priority,
                ":due_at": &record.due_at,
                ":completed_at": &record.completed_at,
                ":created_at": &record.created_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<TaskRecord>> {
        let sql = format!("{BASE_SELECT} WHERE id = :id");
        let mut stmt = conn.prepare(&sql)?;

        let record = stmt
            .query_row(named_params! {":id": id}, |row| TaskRecord::try_from(row))
            .optional()?;

        Ok(record)
    }

    /// All tasks currently assigned to one employee, oldest first.
    pub fn list_for_assignee(conn: &Connection, assignee_id: &str) -> AppResult<Vec<TaskRecord>> {
        let sql = format!("{BASE_SELECT} WHERE assignee_id = :assignee_id ORDER BY created_at ASC");
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(named_params! {":assignee_id": assignee_id}, |row| {
                TaskRecord::try_from(row)
            })?
            .map(|row| row.map_err(AppError::from))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn update_status(
        conn: &Connection,
        id: &str,
        status: &str,
        completed_at: Option<&str>,
    ) -> AppResult<()> {
        let updated = conn.execute(
            r#"
                UPDATE tasks
                SET status = :status,
                    completed_at = :completed_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": id,
                ":status": status,
                ":completed_at": completed_at,
            },
        )?;

        if updated == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }
}
