use async_trait::async_trait;
use thiserror::Error;

use talenthub_core::domain::balance::VacationBalance;
use talenthub_core::domain::employee::{Employee, EmployeeId};
use talenthub_core::domain::notification::{Notification, NotificationId};
use talenthub_core::domain::onboarding::{OnboardingProgress, OnboardingTask, TaskId};
use talenthub_core::domain::request::{ApprovalRequest, RequestId, RequestStatus};
use talenthub_core::routes::RouteStep;

pub mod balance;
pub mod employee;
pub mod memory;
pub mod notification;
pub mod onboarding;
pub mod request;
pub mod route;

pub use balance::SqlBalanceRepository;
pub use employee::SqlEmployeeRepository;
pub use memory::{InMemoryEmployeeRepository, InMemoryRequestRepository, InMemoryRouteRepository};
pub use notification::SqlNotificationRepository;
pub use onboarding::SqlOnboardingRepository;
pub use request::SqlRequestRepository;
pub use route::SqlRouteRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    async fn find_by_directory_id(
        &self,
        directory_id: i64,
    ) -> Result<Option<Employee>, RepositoryError>;
    async fn list(&self, only_active: bool) -> Result<Vec<Employee>, RepositoryError>;
    async fn save(&self, employee: Employee) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestId)
        -> Result<Option<ApprovalRequest>, RepositoryError>;
    async fn list(&self) -> Result<Vec<ApprovalRequest>, RepositoryError>;
    async fn list_for_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Vec<ApprovalRequest>, RepositoryError>;
    async fn insert(&self, request: ApprovalRequest) -> Result<(), RepositoryError>;

    /// Persist an engine transition, guarded on the state the transition was
    /// computed from. Returns `false` when a concurrent writer advanced the
    /// request first; nothing is written in that case.
    async fn update_transition(
        &self,
        request: &ApprovalRequest,
        expected_step: u32,
        expected_status: RequestStatus,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<RouteStep>, RepositoryError>;
    async fn save(&self, step: RouteStep) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OnboardingRepository: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<OnboardingTask>, RepositoryError>;
    async fn save_task(&self, task: OnboardingTask) -> Result<(), RepositoryError>;
    async fn list_progress_for(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Vec<OnboardingProgress>, RepositoryError>;
    async fn find_progress(
        &self,
        employee_id: &EmployeeId,
        task_id: &TaskId,
    ) -> Result<Option<OnboardingProgress>, RepositoryError>;
    async fn save_progress(&self, progress: OnboardingProgress) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait BalanceRepository: Send + Sync {
    async fn find(
        &self,
        employee_id: &EmployeeId,
        year: i32,
    ) -> Result<Option<VacationBalance>, RepositoryError>;
    async fn save(&self, balance: VacationBalance) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn list_for_employee(
        &self,
        employee_id: &EmployeeId,
        only_unread: bool,
    ) -> Result<Vec<Notification>, RepositoryError>;
    async fn save(&self, notification: Notification) -> Result<(), RepositoryError>;
    async fn mark_read(&self, id: &NotificationId) -> Result<bool, RepositoryError>;
}

pub(crate) fn parse_timestamp(
    field: &str,
    value: &str,
) -> Result<chrono::DateTime<chrono::Utc>, RepositoryError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepositoryError::Decode(format!("{field}: {e}")))
}

pub(crate) fn parse_date(
    field: &str,
    value: &str,
) -> Result<chrono::NaiveDate, RepositoryError> {
    value.parse().map_err(|e| RepositoryError::Decode(format!("{field}: {e}")))
}
