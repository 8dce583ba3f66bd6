//! Composition root: wires the database pool, the audit side-channel chosen
//! from configuration, and the request-scoped services.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::services::assignment_service::AssignmentService;
use crate::services::audit_log_service::{self, AuditLog};
use crate::services::employee_service::EmployeeService;
use crate::services::productivity_score_service::ProductivityScoreService;
use crate::services::task_service::TaskService;

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    employee_service: Arc<EmployeeService>,
    task_service: Arc<TaskService>,
    productivity_score_service: Arc<ProductivityScoreService>,
    assignment_service: Arc<AssignmentService>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let db_pool = DbPool::new(&config.database.path)?;
        let audit: Arc<dyn AuditLog> = audit_log_service::from_config(&config.audit)?;
        Ok(Self::with_audit(db_pool, audit))
    }

    pub fn with_audit(db_pool: DbPool, audit: Arc<dyn AuditLog>) -> Self {
        let employee_service = Arc::new(EmployeeService::new(db_pool.clone()));
        let task_service = Arc::new(TaskService::new(db_pool.clone(), audit));
        let productivity_score_service =
            Arc::new(ProductivityScoreService::new(db_pool.clone()));
        let assignment_service = Arc::new(AssignmentService::new(db_pool.clone()));

        Self {
            db_pool,
            employee_service,
            task_service,
            productivity_score_service,
            assignment_service,
        }
    }

    pub fn db_pool(&self) -> &DbPool {
        &self.db_pool
    }

    pub fn employee_service(&self) -> &Arc<EmployeeService> {
        &self.employee_service
    }

    pub fn task_service(&self) -> &Arc<TaskService> {
        &self.task_service
    }

    pub fn productivity_score_service(&self) -> &Arc<ProductivityScoreService> {
        &self.productivity_score_service
    }

    pub fn assignment_service(&self) -> &Arc<AssignmentService> {
        &self.assignment_service
    }
}
