pub mod employee_repository;
pub mod score_repository;
pub mod task_repository;
