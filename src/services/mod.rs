pub mod assignment_service;
pub mod audit_log_service;
pub mod employee_service;
pub mod productivity_score_service;
pub mod task_service;
