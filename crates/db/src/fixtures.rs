use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use talenthub_core::domain::balance::VacationBalance;
use talenthub_core::domain::employee::{Employee, EmployeeId};
use talenthub_core::domain::onboarding::{OnboardingTask, TaskId};
use talenthub_core::domain::request::{
    ApprovalRequest, DateRange, RequestId, RequestStatus, RequestType, StepRecord,
};
use talenthub_core::routes::{RequiredRole, RouteStep};

use crate::repositories::{
    BalanceRepository, EmployeeRepository, OnboardingRepository, RepositoryError,
    RequestRepository, RouteRepository, SqlBalanceRepository, SqlEmployeeRepository,
    SqlOnboardingRepository, SqlRequestRepository, SqlRouteRepository,
};
use crate::DbPool;

/// Deterministic demo dataset: the fixture directory roster, dense approval
/// routes for both request types, an onboarding checklist, and requests in
/// every lifecycle state. Loading twice is idempotent.
pub struct SeedDataset;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub employees: usize,
    pub route_steps: usize,
    pub onboarding_tasks: usize,
    pub requests: usize,
}

#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

fn seed_time(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, hour, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn seed_date(month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2026, month, day)
}

fn seed_employees() -> Vec<Employee> {
    let created = seed_time(1, 15, 8);
    let profile = |id: &str, directory_id, name: &str, position: &str, hire, manager, hr| Employee {
        id: EmployeeId(id.to_string()),
        directory_id,
        name: name.to_string(),
        email: format!(
            "{}@example.com",
            name.to_ascii_lowercase().replace(' ', ".")
        ),
        position: position.to_string(),
        hire_date: hire,
        is_manager: manager,
        is_hr: hr,
        active: true,
        created_at: created,
        updated_at: created,
    };

    vec![
        profile("EMP-0001", 1, "Ivan Petrov", "Team Lead", seed_date(3, 15), true, false),
        profile("EMP-0002", 2, "Maria Sidorova", "HR Manager", seed_date(7, 22), false, true),
        profile("EMP-0003", 3, "Alexey Ivanov", "Junior Developer", seed_date(2, 1), false, false),
        profile("EMP-0004", 4, "Elena Kozlova", "QA Engineer", seed_date(2, 15), false, false),
        profile(
            "EMP-0005",
            5,
            "Dmitry Sokolov",
            "Frontend Developer",
            seed_date(1, 10),
            false,
            false,
        ),
    ]
}

fn seed_route_steps() -> Vec<RouteStep> {
    let step = |request_type, step_no, required_role, sla_days| RouteStep {
        request_type,
        step_no,
        required_role,
        sla_days,
    };

    vec![
        step(RequestType::Vacation, 1, RequiredRole::Employee, 1),
        step(RequestType::Vacation, 2, RequiredRole::Manager, 2),
        step(RequestType::Vacation, 3, RequiredRole::Hr, 2),
        step(RequestType::BusinessTrip, 1, RequiredRole::Manager, 2),
        step(RequestType::BusinessTrip, 2, RequiredRole::Hr, 3),
    ]
}

fn seed_tasks() -> Vec<OnboardingTask> {
    let task = |id: &str, title: &str, position| OnboardingTask {
        id: TaskId(id.to_string()),
        title: title.to_string(),
        description: String::new(),
        position,
    };

    vec![
        task("TASK-0001", "Read the employee handbook", 1),
        task("TASK-0002", "Set up the workstation", 2),
        task("TASK-0003", "Meet the team", 3),
        task("TASK-0004", "Complete security training", 4),
        task("TASK-0005", "Schedule a 1:1 with the manager", 5),
    ]
}

fn seed_requests() -> Result<Vec<ApprovalRequest>, RepositoryError> {
    let range = |start_day, end_day| {
        seed_date(7, start_day)
            .zip(seed_date(7, end_day))
            .and_then(|(start, end)| DateRange::new(start, end))
            .ok_or_else(|| RepositoryError::Decode("invalid seed date range".to_string()))
    };

    let approved = ApprovalRequest {
        id: RequestId("REQ-SEED-0001".to_string()),
        employee_id: EmployeeId("EMP-0003".to_string()),
        request_type: RequestType::Vacation,
        date_range: range(6, 19)?,
        comment: "Summer vacation".to_string(),
        status: RequestStatus::Approved,
        current_step: 0,
        step_started_at: None,
        approved_by: Some(EmployeeId("EMP-0002".to_string())),
        approved_at: Some(seed_time(3, 4, 12)),
        step_history: vec![
            StepRecord {
                step: 1,
                started_at: seed_time(3, 2, 9),
                ended_at: seed_time(3, 2, 15),
                approved_by: Some(EmployeeId("EMP-0003".to_string())),
            },
            StepRecord {
                step: 2,
                started_at: seed_time(3, 2, 15),
                ended_at: seed_time(3, 3, 10),
                approved_by: Some(EmployeeId("EMP-0001".to_string())),
            },
            StepRecord {
                step: 3,
                started_at: seed_time(3, 3, 10),
                ended_at: seed_time(3, 4, 12),
                approved_by: Some(EmployeeId("EMP-0002".to_string())),
            },
        ],
        created_at: seed_time(3, 2, 9),
        updated_at: seed_time(3, 4, 12),
    };

    let in_approval = ApprovalRequest {
        id: RequestId("REQ-SEED-0002".to_string()),
        employee_id: EmployeeId("EMP-0005".to_string()),
        request_type: RequestType::BusinessTrip,
        date_range: range(20, 24)?,
        comment: "Customer workshop".to_string(),
        status: RequestStatus::InApproval,
        current_step: 2,
        step_started_at: Some(seed_time(4, 1, 12)),
        approved_by: Some(EmployeeId("EMP-0001".to_string())),
        approved_at: None,
        step_history: vec![StepRecord {
            step: 1,
            started_at: seed_time(4, 1, 9),
            ended_at: seed_time(4, 1, 12),
            approved_by: Some(EmployeeId("EMP-0001".to_string())),
        }],
        created_at: seed_time(4, 1, 9),
        updated_at: seed_time(4, 1, 12),
    };

    let rejected = ApprovalRequest {
        id: RequestId("REQ-SEED-0003".to_string()),
        employee_id: EmployeeId("EMP-0004".to_string()),
        request_type: RequestType::Vacation,
        date_range: range(1, 3)?,
        comment: "Overlaps the release window".to_string(),
        status: RequestStatus::Rejected,
        current_step: 0,
        step_started_at: None,
        approved_by: None,
        approved_at: None,
        step_history: Vec::new(),
        created_at: seed_time(4, 10, 9),
        updated_at: seed_time(4, 10, 14),
    };

    Ok(vec![approved, in_approval, rejected])
}

impl SeedDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let employee_repo = SqlEmployeeRepository::new(pool.clone());
        let route_repo = SqlRouteRepository::new(pool.clone());
        let onboarding_repo = SqlOnboardingRepository::new(pool.clone());
        let request_repo = SqlRequestRepository::new(pool.clone());
        let balance_repo = SqlBalanceRepository::new(pool.clone());

        let employees = seed_employees();
        for employee in &employees {
            employee_repo.save(employee.clone()).await?;
            if balance_repo.find(&employee.id, 2026).await?.is_none() {
                balance_repo.save(VacationBalance::new(employee.id.clone(), 2026)).await?;
            }
        }

        let route_steps = seed_route_steps();
        for step in &route_steps {
            route_repo.save(step.clone()).await?;
        }

        let tasks = seed_tasks();
        for task in &tasks {
            onboarding_repo.save_task(task.clone()).await?;
        }

        let requests = seed_requests()?;
        for request in &requests {
            if request_repo.find_by_id(&request.id).await?.is_none() {
                request_repo.insert(request.clone()).await?;
            }
        }

        Ok(SeedResult {
            employees: employees.len(),
            route_steps: route_steps.len(),
            onboarding_tasks: tasks.len(),
            requests: requests.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let employee_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employee")
            .fetch_one(pool)
            .await?;
        let route_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM route_step").fetch_one(pool).await?;
        let task_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM onboarding_task").fetch_one(pool).await?;
        let request_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM approval_request").fetch_one(pool).await?;
        let approved_history_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM approval_step_history WHERE request_id = 'REQ-SEED-0001'",
        )
        .fetch_one(pool)
        .await?;

        let checks = vec![
            ("employees", employee_count >= 5),
            ("route_steps", route_count >= 5),
            ("onboarding_tasks", task_count >= 5),
            ("requests", request_count >= 3),
            ("approved_request_history", approved_history_count == 3),
        ];
        let all_present = checks.iter().all(|(_, passed)| *passed);

        Ok(VerificationResult { all_present, checks })
    }
}
