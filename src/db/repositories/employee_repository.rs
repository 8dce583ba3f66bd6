use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::employee::{EmployeeRecord, OrganizationRecord};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        organization_id,
        name,
        skills,
        is_active,
        created_at
    FROM employees
"#;

#[derive(Debug, Clone)]
pub struct EmployeeRow {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub skills: String,
    pub is_active: bool,
    pub created_at: String,
}

impl EmployeeRow {
    pub fn from_record(record: &EmployeeRecord) -> AppResult<Self> {
        Ok(Self {
            id: record.id.clone(),
            organization_id: record.organization_id.clone(),
            name: record.name.clone(),
            skills: serde_json::to_string(&record.skills)?,
            is_active: record.is_active,
            created_at: record.created_at.clone(),
        })
    }

    pub fn into_record(self) -> AppResult<EmployeeRecord> {
        Ok(EmployeeRecord {
            id: self.id,
            organization_id: self.organization_id,
            name: self.name,
            skills: serde_json::from_str(&self.skills)?,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for EmployeeRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            organization_id: row.get("organization_id")?,
            name: row.get("name")?,
            skills: row.get("skills")?,
            is_active: row.get("is_active")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Candidate retrieval row for assignment ranking: an active employee with
/// the aggregates the ranking formula consumes. Rows arrive ordered by
/// ascending active-task count, then descending productivity score.
#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub employee_id: String,
    pub name: String,
    skills: String,
    pub active_task_count: i64,
    pub productivity_score: f64,
}

impl CandidateRow {
    pub fn skills(&self) -> AppResult<Vec<String>> {
        serde_json::from_str(&self.skills).map_err(AppError::from)
    }
}

impl TryFrom<&Row<'_>> for CandidateRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            employee_id: row.get("id")?,
            name: row.get("name")?,
            skills: row.get("skills")?,
            active_task_count: row.get("active_task_count")?,
            productivity_score: row.get("productivity_score")?,
        })
    }
}

pub struct EmployeeRepository;

impl EmployeeRepository {
    pub fn insert_organization(conn: &Connection, record: &OrganizationRecord) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO organizations (id, name, created_at)
                VALUES (:id, :name, :created_at)
            "#,
            named_params! {
                ":id": &record.id,
                ":name": &record.name,
                ":created_at": &record.created_at,
            },
        )?;
        Ok(())
    }

    pub fn find_organization(conn: &Connection, id: &str) -> AppResult<Option<OrganizationRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, name, created_at
                FROM organizations
                WHERE id = :id
            "#,
        )?;

        let record = stmt
            .query_row(named_params! {":id": id}, |row| {
                Ok(OrganizationRecord {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    created_at: row.get("created_at")?,
                })
            })
            .optional()?;

        Ok(record)
    }

    pub fn insert(conn: &Connection, row: &EmployeeRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO employees (
                    id,
                    organization_id,
                    name,
                    skills,
                    is_active,
                    created_at
                ) VALUES (
                    :id,
                    :organization_id,
                    :name,
                    :skills,
                    :is_active,
                    :created_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":organization_id": &row.organization_id,
                ":name": &row.name,
                ":skills": &row.skills,
                ":is_active": &row.is_active,
                ":created_at": &row.created_at,
            },
        )?;
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<EmployeeRow>> {
        let sql = format!("{BASE_SELECT} WHERE id = :id");
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row(named_params! {":id": id}, |row| EmployeeRow::try_from(row))
            .optional()?;

        Ok(row)
    }

    pub fn list_active_for_organization(
        conn: &Connection,
        organization_id: &str,
    ) -> AppResult<Vec<EmployeeRow>> {
        let sql = format!(
            "{BASE_SELECT} WHERE organization_id = :organization_id AND is_active = 1 ORDER BY id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(named_params! {":organization_id": organization_id}, |row| {
                EmployeeRow::try_from(row)
            })?
            .map(|row| row.map_err(AppError::from))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(rows)
    }

    /// Active employees of one organization joined with their current
    /// active-task count and latest persisted productivity score (0 when no
    /// score has been computed yet).
    pub fn list_candidates(
        conn: &Connection,
        organization_id: &str,
    ) -> AppResult<Vec<CandidateRow>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    e.id,
                    e.name,
                    e.skills,
                    COALESCE(t.active_task_count, 0) AS active_task_count,
                    COALESCE(p.score, 0.0) AS productivity_score
                FROM employees e
                LEFT JOIN (
                    SELECT assignee_id, COUNT(*) AS active_task_count
                    FROM tasks
                    WHERE status != 'completed'
                    GROUP BY assignee_id
                ) t ON t.assignee_id = e.id
                LEFT JOIN productivity_scores p ON p.employee_id = e.id
                WHERE e.organization_id = :organization_id
                  AND e.is_active = 1
                ORDER BY active_task_count ASC, productivity_score DESC
            "#,
        )?;

        let rows = stmt
            .query_map(named_params! {":organization_id": organization_id}, |row| {
                CandidateRow::try_from(row)
            })?
            .map(|row| row.map_err(AppError::from))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(rows)
    }
}
