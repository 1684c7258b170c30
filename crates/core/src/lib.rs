pub mod analytics;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod report;
pub mod routes;
pub mod workflow;

pub use analytics::{
    aggregate, annotate, duration_days, AggregateReport, AggregateStats, RequestFilters, SlaRecord,
    TypeStats,
};
pub use directory::{
    plan_sync, DirectoryClient, DirectoryError, DirectoryProfile, FixtureDirectoryClient,
    HttpDirectoryClient, SyncOutcome, SyncPlan,
};
pub use domain::balance::VacationBalance;
pub use domain::employee::{Employee, EmployeeId};
pub use domain::notification::{Notification, NotificationId, NotificationKind};
pub use domain::onboarding::{OnboardingProgress, OnboardingTask, TaskId};
pub use domain::request::{
    ApprovalRequest, DateRange, RequestId, RequestStatus, RequestType, StepRecord,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use report::{
    build_rows, build_structured, render_csv, EmployeeRef, ReportError, ReportRow,
    StructuredReport, StructuredRequest,
};
pub use routes::{RequiredRole, RouteError, RouteStep, RouteTable};
pub use workflow::{ApprovalError, StepOutcome, WorkflowEngine};
