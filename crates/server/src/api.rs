use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use talenthub_core::analytics::{aggregate, AggregateReport, RequestFilters};
use talenthub_core::directory::DirectoryClient;
use talenthub_core::domain::balance::VacationBalance;
use talenthub_core::domain::employee::{Employee, EmployeeId};
use talenthub_core::domain::notification::{Notification, NotificationId, NotificationKind};
use talenthub_core::domain::onboarding::{progress_percent, OnboardingProgress, TaskId};
use talenthub_core::domain::request::{
    ApprovalRequest, RequestId, RequestStatus, RequestType, StepRecord,
};
use talenthub_core::errors::{ApplicationError, InterfaceError};
use talenthub_core::report::{build_rows, build_structured, render_csv};
use talenthub_core::workflow::{ApprovalError, StepOutcome, WorkflowEngine};
use talenthub_db::repositories::{
    BalanceRepository, EmployeeRepository, NotificationRepository, OnboardingRepository,
    RepositoryError, RequestRepository, SqlBalanceRepository, SqlEmployeeRepository,
    SqlNotificationRepository, SqlOnboardingRepository, SqlRequestRepository,
};
use talenthub_db::sync::{run_sync, SyncError};
use talenthub_db::DbPool;

#[derive(Clone)]
pub struct ApiState {
    pub db_pool: DbPool,
    pub engine: Arc<WorkflowEngine>,
    pub directory_client: Arc<dyn DirectoryClient>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/requests", post(submit_request).get(list_requests))
        .route("/api/v1/requests/{request_id}", get(get_request))
        .route("/api/v1/requests/{request_id}/approve", post(approve_request))
        .route("/api/v1/requests/{request_id}/reject", post(reject_request))
        .route("/api/v1/reports/approvals", get(export_report))
        .route("/api/v1/reports/summary", get(report_summary))
        .route("/api/v1/employees", get(list_employees))
        .route("/api/v1/employees/{employee_id}/checklist", get(get_checklist))
        .route(
            "/api/v1/employees/{employee_id}/checklist/{task_id}",
            post(toggle_checklist_task),
        )
        .route("/api/v1/employees/{employee_id}/balance", get(get_balance))
        .route("/api/v1/employees/{employee_id}/notifications", get(list_notifications))
        .route("/api/v1/notifications/{notification_id}/read", post(mark_notification_read))
        .route("/api/v1/stats", get(dashboard_stats))
        .route("/api/v1/directory/sync", post(directory_sync))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

type Rejection = (StatusCode, Json<ApiError>);

fn bad_request(message: impl Into<String>) -> Rejection {
    (StatusCode::BAD_REQUEST, Json(ApiError { error: message.into() }))
}

fn not_found(message: impl Into<String>) -> Rejection {
    (StatusCode::NOT_FOUND, Json(ApiError { error: message.into() }))
}

fn interface_rejection(error: InterfaceError) -> Rejection {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiError { error: error.user_message().to_string() }))
}

fn repository_error(error: RepositoryError) -> Rejection {
    error!(error = %error, "repository error");
    interface_rejection(ApplicationError::Persistence(error.to_string()).into_interface("api"))
}

fn approval_error(error: ApprovalError) -> Rejection {
    let status = match &error {
        ApprovalError::NotEligible { .. } => StatusCode::FORBIDDEN,
        ApprovalError::InvalidState { .. } => StatusCode::CONFLICT,
        ApprovalError::EmployeeNotFound { .. } => StatusCode::NOT_FOUND,
        ApprovalError::NoRoute { .. } | ApprovalError::InvalidDateRange { .. } => {
            StatusCode::BAD_REQUEST
        }
    };
    (status, Json(ApiError { error: error.to_string() }))
}

fn transition_conflict(request_id: &RequestId) -> Rejection {
    warn!(
        event_name = "workflow.transition_conflict",
        request_id = %request_id.0,
        "concurrent transition lost the guarded update"
    );
    (
        StatusCode::CONFLICT,
        Json(ApiError {
            error: "the request was modified by another approver; reload and retry".to_string(),
        }),
    )
}

async fn load_employee(
    pool: &DbPool,
    employee_id: &str,
) -> Result<Option<Employee>, Rejection> {
    SqlEmployeeRepository::new(pool.clone())
        .find_by_id(&EmployeeId(employee_id.to_string()))
        .await
        .map_err(repository_error)
}

async fn require_actor(pool: &DbPool, actor_id: &str) -> Result<Employee, Rejection> {
    load_employee(pool, actor_id).await?.ok_or_else(|| {
        approval_error(ApprovalError::EmployeeNotFound {
            employee_id: EmployeeId(actor_id.to_string()),
        })
    })
}

#[derive(Debug, Serialize)]
struct StepHistoryResponse {
    step: u32,
    started_at: String,
    ended_at: String,
    approved_by: Option<String>,
}

impl From<&StepRecord> for StepHistoryResponse {
    fn from(record: &StepRecord) -> Self {
        Self {
            step: record.step,
            started_at: record.started_at.to_rfc3339(),
            ended_at: record.ended_at.to_rfc3339(),
            approved_by: record.approved_by.as_ref().map(|id| id.0.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestResponse {
    id: String,
    employee_id: String,
    request_type: &'static str,
    status: &'static str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    duration_days: i64,
    comment: String,
    current_step: u32,
    step_started_at: Option<String>,
    approved_by: Option<String>,
    approved_at: Option<String>,
    step_history: Vec<StepHistoryResponse>,
    created_at: String,
}

impl From<&ApprovalRequest> for RequestResponse {
    fn from(request: &ApprovalRequest) -> Self {
        Self {
            id: request.id.0.clone(),
            employee_id: request.employee_id.0.clone(),
            request_type: request.request_type.as_str(),
            status: request.status.as_str(),
            start_date: request.date_range.start,
            end_date: request.date_range.end,
            duration_days: request.date_range.duration_days(),
            comment: request.comment.clone(),
            current_step: request.current_step,
            step_started_at: request.step_started_at.map(|value| value.to_rfc3339()),
            approved_by: request.approved_by.as_ref().map(|id| id.0.clone()),
            approved_at: request.approved_at.map(|value| value.to_rfc3339()),
            step_history: request.step_history.iter().map(StepHistoryResponse::from).collect(),
            created_at: request.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitRequestBody {
    employee_id: String,
    request_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(default)]
    comment: String,
}

async fn submit_request(
    State(state): State<ApiState>,
    Json(body): Json<SubmitRequestBody>,
) -> Result<Json<RequestResponse>, Rejection> {
    let request_type = RequestType::parse(&body.request_type).ok_or_else(|| {
        bad_request(format!(
            "unknown request type `{}` (expected vacation|business_trip)",
            body.request_type
        ))
    })?;
    let employee = require_actor(&state.db_pool, &body.employee_id).await?;

    let now = Utc::now();
    let request = state
        .engine
        .submit(&employee, request_type, body.start_date, body.end_date, body.comment, now)
        .map_err(approval_error)?;

    SqlRequestRepository::new(state.db_pool.clone())
        .insert(request.clone())
        .await
        .map_err(repository_error)?;

    notify(
        &state.db_pool,
        &request.employee_id,
        "Request submitted",
        format!(
            "Your {} request is awaiting step 1 approval.",
            request.request_type.label().to_ascii_lowercase()
        ),
        NotificationKind::Info,
        &request.id,
        now,
    )
    .await;

    info!(
        event_name = "workflow.request_submitted",
        request_id = %request.id.0,
        request_type = request.request_type.as_str(),
        "approval request submitted"
    );
    Ok(Json(RequestResponse::from(&request)))
}

#[derive(Debug, Deserialize)]
struct ListRequestsQuery {
    #[serde(default)]
    employee_id: Option<String>,
}

async fn list_requests(
    State(state): State<ApiState>,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<RequestResponse>>, Rejection> {
    let repo = SqlRequestRepository::new(state.db_pool.clone());
    let requests = match query.employee_id {
        Some(employee_id) => repo
            .list_for_employee(&EmployeeId(employee_id))
            .await
            .map_err(repository_error)?,
        None => repo.list().await.map_err(repository_error)?,
    };

    Ok(Json(requests.iter().map(RequestResponse::from).collect()))
}

async fn get_request(
    State(state): State<ApiState>,
    Path(request_id): Path<String>,
) -> Result<Json<RequestResponse>, Rejection> {
    let request = SqlRequestRepository::new(state.db_pool.clone())
        .find_by_id(&RequestId(request_id.clone()))
        .await
        .map_err(repository_error)?
        .ok_or_else(|| not_found(format!("request `{request_id}` not found")))?;

    Ok(Json(RequestResponse::from(&request)))
}

#[derive(Debug, Deserialize)]
struct ActorBody {
    actor_id: String,
}

#[derive(Debug, Serialize)]
struct ApproveResponse {
    request_id: String,
    status: &'static str,
    outcome: StepOutcome,
}

async fn approve_request(
    State(state): State<ApiState>,
    Path(request_id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<ApproveResponse>, Rejection> {
    let repo = SqlRequestRepository::new(state.db_pool.clone());
    let mut request = repo
        .find_by_id(&RequestId(request_id.clone()))
        .await
        .map_err(repository_error)?
        .ok_or_else(|| not_found(format!("request `{request_id}` not found")))?;
    let actor = require_actor(&state.db_pool, &body.actor_id).await?;

    let now = Utc::now();
    let (prior_step, prior_status) = (request.current_step, request.status);
    let outcome = state.engine.approve(&mut request, &actor, now).map_err(approval_error)?;

    let accepted = repo
        .update_transition(&request, prior_step, prior_status)
        .await
        .map_err(repository_error)?;
    if !accepted {
        return Err(transition_conflict(&request.id));
    }

    if outcome == StepOutcome::Completed {
        if request.request_type == RequestType::Vacation {
            debit_vacation_balance(&state.db_pool, &request).await?;
        }
        notify(
            &state.db_pool,
            &request.employee_id,
            "Request approved",
            format!(
                "Your {} request was approved.",
                request.request_type.label().to_ascii_lowercase()
            ),
            NotificationKind::Success,
            &request.id,
            now,
        )
        .await;
    }

    info!(
        event_name = "workflow.request_approved",
        request_id = %request.id.0,
        actor_id = %actor.id.0,
        status = request.status.as_str(),
        "approval step recorded"
    );
    Ok(Json(ApproveResponse {
        request_id: request.id.0.clone(),
        status: request.status.as_str(),
        outcome,
    }))
}

#[derive(Debug, Serialize)]
struct RejectResponse {
    request_id: String,
    status: &'static str,
}

async fn reject_request(
    State(state): State<ApiState>,
    Path(request_id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<RejectResponse>, Rejection> {
    let repo = SqlRequestRepository::new(state.db_pool.clone());
    let mut request = repo
        .find_by_id(&RequestId(request_id.clone()))
        .await
        .map_err(repository_error)?
        .ok_or_else(|| not_found(format!("request `{request_id}` not found")))?;
    let actor = require_actor(&state.db_pool, &body.actor_id).await?;

    let now = Utc::now();
    let (prior_step, prior_status) = (request.current_step, request.status);
    state.engine.reject(&mut request, now).map_err(approval_error)?;

    let accepted = repo
        .update_transition(&request, prior_step, prior_status)
        .await
        .map_err(repository_error)?;
    if !accepted {
        return Err(transition_conflict(&request.id));
    }

    notify(
        &state.db_pool,
        &request.employee_id,
        "Request rejected",
        format!(
            "Your {} request was rejected.",
            request.request_type.label().to_ascii_lowercase()
        ),
        NotificationKind::Danger,
        &request.id,
        now,
    )
    .await;

    info!(
        event_name = "workflow.request_rejected",
        request_id = %request.id.0,
        actor_id = %actor.id.0,
        "approval request rejected"
    );
    Ok(Json(RejectResponse { request_id: request.id.0.clone(), status: request.status.as_str() }))
}

async fn debit_vacation_balance(
    pool: &DbPool,
    request: &ApprovalRequest,
) -> Result<(), Rejection> {
    let repo = SqlBalanceRepository::new(pool.clone());
    let year = request.date_range.start.year();
    let mut balance = repo
        .find(&request.employee_id, year)
        .await
        .map_err(repository_error)?
        .unwrap_or_else(|| VacationBalance::new(request.employee_id.clone(), year));

    balance.debit(request.date_range.duration_days() as f64);
    repo.save(balance).await.map_err(repository_error)
}

#[allow(clippy::too_many_arguments)]
async fn notify(
    pool: &DbPool,
    employee_id: &EmployeeId,
    title: &str,
    message: String,
    kind: NotificationKind,
    request_id: &RequestId,
    now: DateTime<Utc>,
) {
    let notification = Notification::new(
        employee_id.clone(),
        title,
        message,
        kind,
        Some(format!("/requests/{}", request_id.0)),
        now,
    );

    // Notification delivery must not fail the workflow action itself.
    if let Err(notify_error) =
        SqlNotificationRepository::new(pool.clone()).save(notification).await
    {
        warn!(error = %notify_error, "notification could not be stored");
    }
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    created_from: Option<NaiveDate>,
    #[serde(default)]
    created_to: Option<NaiveDate>,
    #[serde(default)]
    request_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl ReportQuery {
    fn filters(&self) -> Result<RequestFilters, Rejection> {
        let request_type = self
            .request_type
            .as_deref()
            .map(|raw| {
                RequestType::parse(raw)
                    .ok_or_else(|| bad_request(format!("unknown request type `{raw}`")))
            })
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(|raw| {
                RequestStatus::parse(raw)
                    .ok_or_else(|| bad_request(format!("unknown status `{raw}`")))
            })
            .transpose()?;

        Ok(RequestFilters {
            created_from: self.created_from,
            created_to: self.created_to,
            request_type,
            status,
        })
    }
}

async fn report_inputs(
    state: &ApiState,
) -> Result<(Vec<ApprovalRequest>, HashMap<EmployeeId, Employee>), Rejection> {
    let requests =
        SqlRequestRepository::new(state.db_pool.clone()).list().await.map_err(repository_error)?;
    let employees = SqlEmployeeRepository::new(state.db_pool.clone())
        .list(false)
        .await
        .map_err(repository_error)?
        .into_iter()
        .map(|employee| (employee.id.clone(), employee))
        .collect();
    Ok((requests, employees))
}

async fn export_report(
    State(state): State<ApiState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Rejection> {
    let filters = query.filters()?;
    let (requests, employees) = report_inputs(&state).await?;
    let rows = build_rows(&requests, &employees, state.engine.routes(), &filters);

    match query.format.as_deref().unwrap_or("csv") {
        "csv" => {
            let rendered = render_csv(&rows).map_err(|render_error| {
                error!(error = %render_error, "report rendering failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiError { error: "report rendering failed".to_string() }),
                )
            })?;
            Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], rendered).into_response())
        }
        "json" => {
            let structured = build_structured(&rows, &filters, Utc::now());
            Ok(Json(structured).into_response())
        }
        other => Err(bad_request(format!("unknown format `{other}` (expected csv|json)"))),
    }
}

async fn report_summary(
    State(state): State<ApiState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<AggregateReport>, Rejection> {
    let filters = query.filters()?;
    let (requests, _) = report_inputs(&state).await?;
    Ok(Json(aggregate(&requests, state.engine.routes(), &filters)))
}

#[derive(Debug, Deserialize)]
struct ListEmployeesQuery {
    #[serde(default)]
    active: Option<bool>,
}

#[derive(Debug, Serialize)]
struct EmployeeResponse {
    id: String,
    directory_id: i64,
    name: String,
    email: String,
    position: String,
    hire_date: Option<NaiveDate>,
    is_manager: bool,
    is_hr: bool,
    active: bool,
}

impl From<Employee> for EmployeeResponse {
    fn from(employee: Employee) -> Self {
        Self {
            id: employee.id.0,
            directory_id: employee.directory_id,
            name: employee.name,
            email: employee.email,
            position: employee.position,
            hire_date: employee.hire_date,
            is_manager: employee.is_manager,
            is_hr: employee.is_hr,
            active: employee.active,
        }
    }
}

async fn list_employees(
    State(state): State<ApiState>,
    Query(query): Query<ListEmployeesQuery>,
) -> Result<Json<Vec<EmployeeResponse>>, Rejection> {
    let employees = SqlEmployeeRepository::new(state.db_pool.clone())
        .list(query.active.unwrap_or(true))
        .await
        .map_err(repository_error)?;

    Ok(Json(employees.into_iter().map(EmployeeResponse::from).collect()))
}

#[derive(Debug, Serialize)]
struct ChecklistItemResponse {
    task_id: String,
    title: String,
    description: String,
    completed: bool,
    completed_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChecklistResponse {
    employee_id: String,
    completed: usize,
    total: usize,
    progress_percent: u32,
    items: Vec<ChecklistItemResponse>,
}

async fn load_checklist(
    state: &ApiState,
    employee_id: &EmployeeId,
) -> Result<ChecklistResponse, Rejection> {
    let repo = SqlOnboardingRepository::new(state.db_pool.clone());
    let tasks = repo.list_tasks().await.map_err(repository_error)?;

    let mut items = Vec::with_capacity(tasks.len());
    let mut completed = 0;
    for task in &tasks {
        // Progress rows appear lazily the first time a checklist is viewed.
        let progress = match repo
            .find_progress(employee_id, &task.id)
            .await
            .map_err(repository_error)?
        {
            Some(progress) => progress,
            None => {
                let fresh = OnboardingProgress::open(employee_id.clone(), task.id.clone());
                repo.save_progress(fresh.clone()).await.map_err(repository_error)?;
                fresh
            }
        };

        if progress.completed {
            completed += 1;
        }
        items.push(ChecklistItemResponse {
            task_id: task.id.0.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            completed: progress.completed,
            completed_at: progress.completed_at.map(|value| value.to_rfc3339()),
        });
    }

    Ok(ChecklistResponse {
        employee_id: employee_id.0.clone(),
        completed,
        total: tasks.len(),
        progress_percent: progress_percent(completed, tasks.len()),
        items,
    })
}

async fn get_checklist(
    State(state): State<ApiState>,
    Path(employee_id): Path<String>,
) -> Result<Json<ChecklistResponse>, Rejection> {
    let employee = load_employee(&state.db_pool, &employee_id)
        .await?
        .ok_or_else(|| not_found(format!("employee `{employee_id}` not found")))?;

    Ok(Json(load_checklist(&state, &employee.id).await?))
}

#[derive(Debug, Deserialize)]
struct ToggleTaskBody {
    completed: bool,
}

async fn toggle_checklist_task(
    State(state): State<ApiState>,
    Path((employee_id, task_id)): Path<(String, String)>,
    Json(body): Json<ToggleTaskBody>,
) -> Result<Json<ChecklistResponse>, Rejection> {
    let employee = load_employee(&state.db_pool, &employee_id)
        .await?
        .ok_or_else(|| not_found(format!("employee `{employee_id}` not found")))?;

    let repo = SqlOnboardingRepository::new(state.db_pool.clone());
    let task_id = TaskId(task_id);
    let known_task = repo
        .list_tasks()
        .await
        .map_err(repository_error)?
        .into_iter()
        .any(|task| task.id == task_id);
    if !known_task {
        return Err(not_found(format!("onboarding task `{}` not found", task_id.0)));
    }

    let mut progress = repo
        .find_progress(&employee.id, &task_id)
        .await
        .map_err(repository_error)?
        .unwrap_or_else(|| OnboardingProgress::open(employee.id.clone(), task_id.clone()));
    progress.set_completed(body.completed, Utc::now());
    repo.save_progress(progress).await.map_err(repository_error)?;

    Ok(Json(load_checklist(&state, &employee.id).await?))
}

#[derive(Debug, Deserialize)]
struct BalanceQuery {
    #[serde(default)]
    year: Option<i32>,
}

#[derive(Debug, Serialize)]
struct BalanceResponse {
    employee_id: String,
    year: i32,
    total_days: f64,
    used_days: f64,
    remaining_days: f64,
}

async fn get_balance(
    State(state): State<ApiState>,
    Path(employee_id): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, Rejection> {
    let employee = load_employee(&state.db_pool, &employee_id)
        .await?
        .ok_or_else(|| not_found(format!("employee `{employee_id}` not found")))?;

    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let balance = SqlBalanceRepository::new(state.db_pool.clone())
        .find(&employee.id, year)
        .await
        .map_err(repository_error)?
        .unwrap_or_else(|| VacationBalance::new(employee.id.clone(), year));

    Ok(Json(BalanceResponse {
        employee_id: balance.employee_id.0.clone(),
        year: balance.year,
        total_days: balance.total_days,
        used_days: balance.used_days,
        remaining_days: balance.remaining_days(),
    }))
}

#[derive(Debug, Deserialize)]
struct NotificationsQuery {
    #[serde(default)]
    unread: Option<bool>,
}

#[derive(Debug, Serialize)]
struct NotificationResponse {
    id: String,
    title: String,
    message: String,
    kind: &'static str,
    read: bool,
    link: Option<String>,
    created_at: String,
}

async fn list_notifications(
    State(state): State<ApiState>,
    Path(employee_id): Path<String>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<NotificationResponse>>, Rejection> {
    let notifications = SqlNotificationRepository::new(state.db_pool.clone())
        .list_for_employee(&EmployeeId(employee_id), query.unread.unwrap_or(false))
        .await
        .map_err(repository_error)?;

    Ok(Json(
        notifications
            .into_iter()
            .map(|notification| NotificationResponse {
                id: notification.id.0,
                title: notification.title,
                message: notification.message,
                kind: notification.kind.as_str(),
                read: notification.read,
                link: notification.link,
                created_at: notification.created_at.to_rfc3339(),
            })
            .collect(),
    ))
}

async fn mark_notification_read(
    State(state): State<ApiState>,
    Path(notification_id): Path<String>,
) -> Result<StatusCode, Rejection> {
    let marked = SqlNotificationRepository::new(state.db_pool.clone())
        .mark_read(&NotificationId(notification_id.clone()))
        .await
        .map_err(repository_error)?;

    if marked {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(format!("notification `{notification_id}` not found")))
    }
}

#[derive(Debug, Serialize)]
struct RequestCounts {
    pending: usize,
    approved: usize,
    rejected: usize,
}

#[derive(Debug, Serialize)]
struct OnboardingCounts {
    completed: usize,
    in_progress: usize,
    total_tasks: usize,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    total_employees: usize,
    new_employees: usize,
    requests: RequestCounts,
    on_vacation_now: usize,
    onboarding: OnboardingCounts,
}

async fn dashboard_stats(
    State(state): State<ApiState>,
) -> Result<Json<StatsResponse>, Rejection> {
    let today = Utc::now().date_naive();
    let month_ago = today - Duration::days(30);

    let employees = SqlEmployeeRepository::new(state.db_pool.clone())
        .list(true)
        .await
        .map_err(repository_error)?;
    let new_employees = employees
        .iter()
        .filter(|employee| employee.hire_date.map(|hired| hired >= month_ago).unwrap_or(false))
        .count();

    let requests =
        SqlRequestRepository::new(state.db_pool.clone()).list().await.map_err(repository_error)?;
    let counts = RequestCounts {
        pending: requests
            .iter()
            .filter(|request| {
                matches!(request.status, RequestStatus::Submitted | RequestStatus::InApproval)
            })
            .count(),
        approved: requests
            .iter()
            .filter(|request| request.status == RequestStatus::Approved)
            .count(),
        rejected: requests
            .iter()
            .filter(|request| request.status == RequestStatus::Rejected)
            .count(),
    };
    let on_vacation_now = requests
        .iter()
        .filter(|request| {
            request.status == RequestStatus::Approved
                && request.request_type == RequestType::Vacation
                && request.date_range.start <= today
                && request.date_range.end >= today
        })
        .count();

    let onboarding_repo = SqlOnboardingRepository::new(state.db_pool.clone());
    let total_tasks = onboarding_repo.list_tasks().await.map_err(repository_error)?.len();
    let mut completed_onboarding = 0;
    let mut in_progress = 0;
    if total_tasks > 0 {
        for employee in &employees {
            let done = onboarding_repo
                .list_progress_for(&employee.id)
                .await
                .map_err(repository_error)?
                .iter()
                .filter(|progress| progress.completed)
                .count();
            if done == total_tasks {
                completed_onboarding += 1;
            } else if done > 0 {
                in_progress += 1;
            }
        }
    }

    Ok(Json(StatsResponse {
        total_employees: employees.len(),
        new_employees,
        requests: counts,
        on_vacation_now,
        onboarding: OnboardingCounts {
            completed: completed_onboarding,
            in_progress,
            total_tasks,
        },
    }))
}

async fn directory_sync(
    State(state): State<ApiState>,
) -> Result<Json<talenthub_core::directory::SyncOutcome>, Rejection> {
    let outcome = run_sync(&state.db_pool, state.directory_client.as_ref(), Utc::now())
        .await
        .map_err(|sync_error| match sync_error {
            SyncError::Directory(directory_error) => {
                error!(error = %directory_error, "directory feed unavailable");
                interface_rejection(
                    ApplicationError::Integration(directory_error.to_string())
                        .into_interface("directory-sync"),
                )
            }
            SyncError::Repository(repo_error) => repository_error(repo_error),
        })?;

    info!(
        event_name = "directory.sync_completed",
        created = outcome.created,
        updated = outcome.updated,
        deactivated = outcome.deactivated,
        "directory sync finished"
    );
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use talenthub_core::directory::FixtureDirectoryClient;
    use talenthub_core::routes::RouteTable;
    use talenthub_core::workflow::WorkflowEngine;
    use talenthub_db::repositories::{RouteRepository, SqlRouteRepository};
    use talenthub_db::{connect_with_settings, migrations, SeedDataset};

    use super::{router, ApiState};

    async fn test_state() -> ApiState {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SeedDataset::load(&pool).await.expect("seed");

        let steps = SqlRouteRepository::new(pool.clone()).list_all().await.expect("routes");
        let routes = RouteTable::new(steps).expect("valid routes");

        ApiState {
            db_pool: pool,
            engine: Arc::new(WorkflowEngine::new(routes)),
            directory_client: Arc::new(FixtureDirectoryClient::default()),
        }
    }

    async fn send_json(
        state: &ApiState,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = match body {
            Some(payload) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        };

        let response = router(state.clone()).oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn vacation_request_walks_the_full_route() {
        let state = test_state().await;

        let (status, submitted) = send_json(
            &state,
            "POST",
            "/api/v1/requests",
            Some(json!({
                "employee_id": "EMP-0004",
                "request_type": "vacation",
                "start_date": "2026-09-01",
                "end_date": "2026-09-05",
                "comment": "autumn break"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(submitted["status"], "submitted");
        assert_eq!(submitted["current_step"], 1);
        let request_id = submitted["id"].as_str().expect("id").to_string();

        // employee -> manager -> hr
        for (actor, expected_status) in
            [("EMP-0004", "in_approval"), ("EMP-0001", "in_approval"), ("EMP-0002", "approved")]
        {
            let (status, response) = send_json(
                &state,
                "POST",
                &format!("/api/v1/requests/{request_id}/approve"),
                Some(json!({ "actor_id": actor })),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "actor {actor} should be eligible");
            assert_eq!(response["status"], expected_status);
        }

        let (status, detail) =
            send_json(&state, "GET", &format!("/api/v1/requests/{request_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["status"], "approved");
        assert_eq!(detail["current_step"], 0);
        assert_eq!(detail["step_history"].as_array().expect("history").len(), 3);
        assert!(detail["approved_at"].is_string());

        // Terminal vacation approval debits the balance for the start year.
        let (status, balance) = send_json(
            &state,
            "GET",
            "/api/v1/employees/EMP-0004/balance?year=2026",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(balance["used_days"], 5.0);
    }

    #[tokio::test]
    async fn ineligible_actor_is_refused_without_mutation() {
        let state = test_state().await;

        let (_, submitted) = send_json(
            &state,
            "POST",
            "/api/v1/requests",
            Some(json!({
                "employee_id": "EMP-0004",
                "request_type": "vacation",
                "start_date": "2026-09-01",
                "end_date": "2026-09-02"
            })),
        )
        .await;
        let request_id = submitted["id"].as_str().expect("id").to_string();

        // Step 1 requires the owning employee; a manager cannot jump in.
        let (status, _) = send_json(
            &state,
            "POST",
            &format!("/api/v1/requests/{request_id}/approve"),
            Some(json!({ "actor_id": "EMP-0001" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, detail) =
            send_json(&state, "GET", &format!("/api/v1/requests/{request_id}"), None).await;
        assert_eq!(detail["status"], "submitted");
        assert_eq!(detail["current_step"], 1);
    }

    #[tokio::test]
    async fn terminal_requests_refuse_further_actions() {
        let state = test_state().await;

        let (_, submitted) = send_json(
            &state,
            "POST",
            "/api/v1/requests",
            Some(json!({
                "employee_id": "EMP-0005",
                "request_type": "business_trip",
                "start_date": "2026-10-01",
                "end_date": "2026-10-03"
            })),
        )
        .await;
        let request_id = submitted["id"].as_str().expect("id").to_string();

        let (status, _) = send_json(
            &state,
            "POST",
            &format!("/api/v1/requests/{request_id}/reject"),
            Some(json!({ "actor_id": "EMP-0001" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send_json(
            &state,
            "POST",
            &format!("/api/v1/requests/{request_id}/approve"),
            Some(json!({ "actor_id": "EMP-0001" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn report_exports_csv_and_json_consistently() {
        let state = test_state().await;

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/reports/approvals?format=csv")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let csv = String::from_utf8(bytes.to_vec()).expect("utf-8");
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("id,type,employee,created_at,approved_at,duration_days,sla_days,overdue")
        );
        let seeded_row = lines.next().expect("seeded approved request row");
        assert!(seeded_row.starts_with("REQ-SEED-0001,Vacation,Alexey Ivanov,"));

        let (status, structured) =
            send_json(&state, "GET", "/api/v1/reports/approvals?format=json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(structured["total"], 1);
        assert_eq!(structured["requests"][0]["id"], "REQ-SEED-0001");
        assert_eq!(structured["requests"][0]["employee"]["name"], "Alexey Ivanov");

        let (status, summary) =
            send_json(&state, "GET", "/api/v1/reports/summary?request_type=vacation", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["overall"]["count"], 1);
    }

    #[tokio::test]
    async fn checklist_toggle_updates_progress_percent() {
        let state = test_state().await;

        let (status, checklist) =
            send_json(&state, "GET", "/api/v1/employees/EMP-0003/checklist", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(checklist["total"], 5);
        assert_eq!(checklist["progress_percent"], 0);

        let (status, checklist) = send_json(
            &state,
            "POST",
            "/api/v1/employees/EMP-0003/checklist/TASK-0001",
            Some(json!({ "completed": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(checklist["completed"], 1);
        assert_eq!(checklist["progress_percent"], 20);
    }

    #[tokio::test]
    async fn stats_reflect_seeded_data() {
        let state = test_state().await;

        let (status, stats) = send_json(&state, "GET", "/api/v1/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_employees"], 5);
        assert_eq!(stats["requests"]["approved"], 1);
        assert_eq!(stats["requests"]["rejected"], 1);
        assert_eq!(stats["requests"]["pending"], 1);
        assert_eq!(stats["onboarding"]["total_tasks"], 5);
    }

    #[tokio::test]
    async fn directory_sync_endpoint_reports_the_outcome() {
        let state = test_state().await;

        let (status, outcome) = send_json(&state, "POST", "/api/v1/directory/sync", None).await;
        assert_eq!(status, StatusCode::OK);
        // The seed roster mirrors the fixture directory, so nothing new is
        // created; profile drift only produces updates.
        assert_eq!(outcome["created"], 0);
        assert_eq!(outcome["deactivated"], 0);
    }
}
