use chrono::Utc;
use tracing::{debug, info};

use crate::db::repositories::employee_repository::{EmployeeRepository, EmployeeRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::employee::{EmployeeCreateInput, EmployeeRecord, OrganizationRecord};

const MAX_NAME_CHARS: usize = 120;
const MAX_SKILLS: usize = 50;
const MAX_SKILL_CHARS: usize = 64;

#[derive(Clone)]
pub struct EmployeeService {
    db: DbPool,
}

impl EmployeeService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create_organization(&self, name: &str) -> AppResult<OrganizationRecord> {
        let name = normalize_name(name)?;
        let record = OrganizationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            created_at: Utc::now().to_rfc3339(),
        };

        self.db
            .with_connection(|conn| EmployeeRepository::insert_organization(conn, &record))?;
        info!(organization_id = %record.id, "organization created");
        Ok(record)
    }

    pub fn create_employee(&self, input: EmployeeCreateInput) -> AppResult<EmployeeRecord> {
        let name = normalize_name(&input.name)?;
        let skills = normalize_skills(input.skills.unwrap_or_default())?;

        let record = EmployeeRecord {
            id: uuid::Uuid::new_v4().to_string(),
            organization_id: input.organization_id,
            name,
            skills,
            is_active: true,
            created_at: Utc::now().to_rfc3339(),
        };

        self.db.with_connection(|conn| {
            EmployeeRepository::find_organization(conn, &record.organization_id)?
                .ok_or_else(AppError::not_found)?;
            let row = EmployeeRow::from_record(&record)?;
            EmployeeRepository::insert(conn, &row)
        })?;
        info!(employee_id = %record.id, organization_id = %record.organization_id, "employee created");
        Ok(record)
    }

    pub fn get_employee(&self, id: &str) -> AppResult<EmployeeRecord> {
        let row = self
            .db
            .with_connection(|conn| EmployeeRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)?;
        let record = row.into_record()?;
        debug!(employee_id = %record.id, "employee fetched");
        Ok(record)
    }
}

fn normalize_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("名称不能为空"));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::validation("名称长度需在 120 字以内"));
    }
    Ok(trimmed.to_string())
}

fn normalize_skills(skills: Vec<String>) -> AppResult<Vec<String>> {
    let mut normalized = Vec::new();
    for skill in skills {
        let trimmed = skill.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.chars().count() > MAX_SKILL_CHARS {
            return Err(AppError::validation("单个技能长度需小于 64 字符"));
        }
        if !normalized.iter().any(|existing: &String| existing == trimmed) {
            normalized.push(trimmed.to_string());
        }
    }
    if normalized.len() > MAX_SKILLS {
        return Err(AppError::validation("技能数量最多 50 个"));
    }
    Ok(normalized)
}
