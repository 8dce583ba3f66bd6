use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;
use crate::models::productivity::{ProductivityRecord, Trend};

#[derive(Debug, Clone)]
pub struct ScoreRow {
    pub employee_id: String,
    pub score: f64,
    pub task_completion_rate: f64,
    pub on_time_rate: f64,
    pub trend: String,
    pub recommendations: String,
    pub last_calculated: String,
}

impl ScoreRow {
    pub fn from_record(record: &ProductivityRecord) -> AppResult<Self> {
        Ok(Self {
            employee_id: record.employee_id.clone(),
            score: record.score,
            task_completion_rate: record.task_completion_rate,
            on_time_rate: record.on_time_rate,
            trend: record.trend.as_str().to_string(),
            recommendations: serde_json::to_string(&record.recommendations)?,
            last_calculated: record.last_calculated.clone(),
        })
    }

    pub fn into_record(self) -> AppResult<ProductivityRecord> {
        Ok(ProductivityRecord {
            employee_id: self.employee_id,
            score: self.score,
            task_completion_rate: self.task_completion_rate,
            on_time_rate: self.on_time_rate,
            trend: Trend::parse(&self.trend)?,
            recommendations: serde_json::from_str(&self.recommendations)?,
            last_calculated: self.last_calculated,
        })
    }
}

impl TryFrom<&Row<'_>> for ScoreRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            employee_id: row.get("employee_id")?,
            score: row.get("score")?,
            task_completion_rate: row.get("task_completion_rate")?,
            on_time_rate: row.get("on_time_rate")?,
            trend: row.get("trend")?,
            recommendations: row.get("recommendations")?,
            last_calculated: row.get("last_calculated")?,
        })
    }
}

pub struct ScoreRepository;

impl ScoreRepository {
    /// Replace the employee's record wholesale. Last write wins: there is no
    /// version check, so concurrent recomputations for the same employee
    /// leave whichever write lands last.
    pub fn upsert(conn: &Connection, record: &ProductivityRecord) -> AppResult<()> {
        let row = ScoreRow::from_record(record)?;

        conn.execute(
            r#"
                INSERT INTO productivity_scores (
                    employee_id,
                    score,
                    task_completion_rate,
                    on_time_rate,
                    trend,
                    recommendations,
                    last_calculated
                ) VALUES (
                    :employee_id,
                    :score,
                    :task_completion_rate,
                    :on_time_rate,
                    :trend,
                    :recommendations,
                    :last_calculated
                )
                ON CONFLICT(employee_id) DO UPDATE SET
                    score = excluded.score,
                    task_completion_rate = excluded.task_completion_rate,
                    on_time_rate = excluded.on_time_rate,
                    trend = excluded.trend,
                    recommendations = excluded.recommendations,
                    last_calculated = excluded.last_calculated
            "#,
            named_params! {
                ":employee_id": &row.employee_id,
                ":score": &row.score,
                ":task_completion_rate": &row.task_completion_rate,
                ":on_time_rate": &row.on_time_rate,
                ":trend": &row.trend,
                ":recommendations": &row.recommendations,
                ":last_calculated": &row.last_calculated,
            },
        )?;

        Ok(())
    }

    pub fn find_by_employee(
        conn: &Connection,
        employee_id: &str,
    ) -> AppResult<Option<ProductivityRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    employee_id,
                    score,
                    task_completion_rate,
                    on_time_rate,
                    trend,
                    recommendations,
                    last_calculated
                FROM productivity_scores
                WHERE employee_id = :employee_id
            "#,
        )?;

        let row = stmt
            .query_row(named_params! {":employee_id": employee_id}, |row| {
                ScoreRow::try_from(row)
            })
            .optional()?;

        row.map(|row| row.into_record()).transpose()
    }
}
