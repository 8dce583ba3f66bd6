use std::sync::Arc;
use std::time::Duration as StdDuration;

use httpmock::prelude::*;
use tempfile::tempdir;
use workpulse::app::AppState;
use workpulse::config::{AppConfig, AuditConfig};
use workpulse::db::DbPool;
use workpulse::error::AppError;
use workpulse::models::employee::EmployeeCreateInput;
use workpulse::models::task::TaskCreateInput;
use workpulse::services::audit_log_service::{self, HttpAuditLog, NoopAuditLog};
use workpulse::services::employee_service::EmployeeService;
use workpulse::services::task_service::TaskService;

struct Fixture {
    pool: DbPool,
    employees: EmployeeService,
    organization_id: String,
    employee_id: String,
    _dir: tempfile::TempDir,
}

fn setup() -> Fixture {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("flow.sqlite")).expect("db pool");
    let employees = EmployeeService::new(pool.clone());

    let organization = employees.create_organization("Acme").expect("organization");
    let employee = employees
        .create_employee(EmployeeCreateInput {
            organization_id: organization.id.clone(),
            name: "Alice".into(),
            skills: Some(vec!["React.js".into(), "SQL".into()]),
        })
        .expect("employee");

    Fixture {
        pool,
        employees,
        organization_id: organization.id,
        employee_id: employee.id,
        _dir: dir,
    }
}

fn task_input(fixture: &Fixture, title: &str) -> TaskCreateInput {
    TaskCreateInput {
        organization_id: fixture.organization_id.clone(),
        assignee_id: fixture.employee_id.clone(),
        title: title.into(),
        ..TaskCreateInput::default()
    }
}

#[tokio::test]
async fn create_start_complete_flow() {
    let fixture = setup();
    let service = TaskService::new(fixture.pool.clone(), Arc::new(NoopAuditLog));

    let created = service
        .create_task(task_input(&fixture, "Onboarding paperwork"))
        .expect("create");
    assert_eq!(created.status, "assigned");
    assert_eq!(created.priority, "medium");
    assert!(created.completed_at.is_none());

    let started = service.start_task(&created.id).expect("start");
    assert_eq!(started.status, "in_progress");

    let completed = service.complete_task(&created.id).await.expect("complete");
    assert_eq!(completed.status, "completed");
    assert!(completed.completed_at.is_some());

    let listed = service
        .list_for_employee(&fixture.employee_id)
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, "completed");
}

#[tokio::test]
async fn completing_twice_is_a_conflict() {
    let fixture = setup();
    let service = TaskService::new(fixture.pool.clone(), Arc::new(NoopAuditLog));

    let created = service
        .create_task(task_input(&fixture, "Quarterly review"))
        .expect("create");
    service.complete_task(&created.id).await.expect("complete");

    let err = service.complete_task(&created.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));
}

#[test]
fn create_task_validates_input() {
    let fixture = setup();
    let service = TaskService::new(fixture.pool.clone(), Arc::new(NoopAuditLog));

    let mut blank_title = task_input(&fixture, "   ");
    blank_title.priority = Some("high".into());
    assert!(matches!(
        service.create_task(blank_title).unwrap_err(),
        AppError::Validation { .. }
    ));

    let mut bad_priority = task_input(&fixture, "Payroll run");
    bad_priority.priority = Some("urgent".into());
    assert!(matches!(
        service.create_task(bad_priority).unwrap_err(),
        AppError::Validation { .. }
    ));

    let mut ghost_assignee = task_input(&fixture, "Payroll run");
    ghost_assignee.assignee_id = "ghost".into();
    assert!(matches!(
        service.create_task(ghost_assignee).unwrap_err(),
        AppError::NotFound
    ));

    let other_org = fixture.employees.create_organization("Globex").expect("org");
    let mut cross_org = task_input(&fixture, "Payroll run");
    cross_org.organization_id = other_org.id;
    assert!(matches!(
        service.create_task(cross_org).unwrap_err(),
        AppError::Validation { .. }
    ));
}

#[tokio::test]
async fn completion_publishes_audit_event_without_blocking() {
    let fixture = setup();

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/events")
                .json_body_partial(r#"{"action": "task_completed"}"#);
            then.status(200);
        })
        .await;

    let audit = HttpAuditLog::new(server.url("/events"), StdDuration::from_secs(5))
        .expect("audit client");
    let service = TaskService::new(fixture.pool.clone(), Arc::new(audit));

    let created = service
        .create_task(task_input(&fixture, "Ship release"))
        .expect("create");
    service.complete_task(&created.id).await.expect("complete");

    // Fire-and-forget: poll the mock instead of awaiting the submission.
    let mut delivered = false;
    for _ in 0..200 {
        if mock.hits_async().await >= 1 {
            delivered = true;
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    assert!(delivered, "audit event never reached the gateway");
}

#[tokio::test]
async fn completion_survives_an_unreachable_audit_gateway() {
    let fixture = setup();

    let audit = HttpAuditLog::new(
        "http://127.0.0.1:1/events".to_string(),
        StdDuration::from_secs(1),
    )
    .expect("audit client");
    let service = TaskService::new(fixture.pool.clone(), Arc::new(audit));

    let created = service
        .create_task(task_input(&fixture, "Ship release"))
        .expect("create");
    let completed = service.complete_task(&created.id).await.expect("complete");
    assert_eq!(completed.status, "completed");
}

#[tokio::test]
async fn app_state_wires_services_from_config() {
    let dir = tempdir().expect("temp dir");
    let mut config = AppConfig::default();
    config.database.path = dir
        .path()
        .join("app.sqlite")
        .to_string_lossy()
        .into_owned();
    config.audit = AuditConfig::default();

    let state = AppState::new(&config).expect("app state");

    let organization = state
        .employee_service()
        .create_organization("Acme")
        .expect("organization");
    let employee = state
        .employee_service()
        .create_employee(EmployeeCreateInput {
            organization_id: organization.id.clone(),
            name: "Alice".into(),
            skills: Some(vec!["Rust".into()]),
        })
        .expect("employee");

    let task = state
        .task_service()
        .create_task(TaskCreateInput {
            organization_id: organization.id.clone(),
            assignee_id: employee.id.clone(),
            title: "First task".into(),
            ..TaskCreateInput::default()
        })
        .expect("task");
    state
        .task_service()
        .complete_task(&task.id)
        .await
        .expect("complete");

    let result = state
        .productivity_score_service()
        .compute_score(&employee.id)
        .expect("score");
    assert_eq!(result.total_tasks, 1);
    assert_eq!(result.completed_tasks, 1);
    assert!(result.score > 0.0);

    let ranked = state
        .assignment_service()
        .rank_candidates(&organization.id, &["rust".to_string()])
        .expect("rank");
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].employee_id, employee.id);
    assert_eq!(ranked[0].skill_match, 1.0);
}

#[test]
fn audit_selection_honours_configuration() {
    let disabled = AuditConfig {
        enabled: false,
        endpoint: Some("http://localhost:9/events".into()),
        timeout_seconds: 5,
    };
    assert!(audit_log_service::from_config(&disabled).is_ok());

    let enabled = AuditConfig {
        enabled: true,
        endpoint: Some("http://localhost:9/events".into()),
        timeout_seconds: 5,
    };
    assert!(audit_log_service::from_config(&enabled).is_ok());
}
