use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::request::{
    ApprovalRequest, DateRange, RequestId, RequestStatus, RequestType, StepRecord,
};
use crate::routes::{RequiredRole, RouteTable};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("actor is not eligible to act on `{request_id:?}` at step {step}")]
    NotEligible { request_id: RequestId, step: u32 },
    #[error("no approval route is configured for `{request_type:?}`")]
    NoRoute { request_type: RequestType },
    #[error("request `{request_id:?}` is in terminal state `{status:?}`")]
    InvalidState { request_id: RequestId, status: RequestStatus },
    #[error("no employee profile is linked for `{employee_id:?}`")]
    EmployeeNotFound { employee_id: EmployeeId },
    #[error("invalid date range: {end} ends before {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// Result of a successful approval action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The request moved on to the given step and stays in approval.
    Continues { step: u32 },
    /// The last configured step was closed; the request is approved.
    Completed,
}

/// The approval state machine: `draft → submitted → in_approval →
/// {approved | rejected}`, with `in_approval` looping over the configured
/// route steps. Terminal states never reopen.
///
/// The engine is pure over its inputs — `now` is always a parameter, and
/// persistence belongs to the caller — so every transition is replayable in
/// tests with pinned clocks.
#[derive(Clone, Debug)]
pub struct WorkflowEngine {
    routes: RouteTable,
}

impl WorkflowEngine {
    pub fn new(routes: RouteTable) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Create a request at step 1 of its route.
    pub fn submit(
        &self,
        employee: &Employee,
        request_type: RequestType,
        start: NaiveDate,
        end: NaiveDate,
        comment: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let date_range =
            DateRange::new(start, end).ok_or(ApprovalError::InvalidDateRange { start, end })?;

        if self.routes.step(request_type, 1).is_none() {
            return Err(ApprovalError::NoRoute { request_type });
        }

        Ok(ApprovalRequest {
            id: RequestId::generate(),
            employee_id: employee.id.clone(),
            request_type,
            date_range,
            comment: comment.into(),
            status: RequestStatus::Submitted,
            current_step: 1,
            step_started_at: Some(now),
            approved_by: None,
            approved_at: None,
            step_history: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether `actor` may act on the request's current step.
    ///
    /// False whenever the step has no configured `RouteStep`, which also
    /// covers terminal states (`current_step == 0`).
    pub fn can_act(&self, request: &ApprovalRequest, actor: &Employee) -> bool {
        let Some(step) = self.routes.step(request.request_type, request.current_step) else {
            return false;
        };

        match step.required_role {
            RequiredRole::Employee => actor.id == request.employee_id,
            RequiredRole::Manager => actor.is_manager,
            RequiredRole::Hr => actor.is_hr,
        }
    }

    /// Record `actor`'s approval of the current step and advance.
    ///
    /// Eligibility is checked before any mutation: a failed call leaves the
    /// request untouched.
    pub fn approve(
        &self,
        request: &mut ApprovalRequest,
        actor: &Employee,
        now: DateTime<Utc>,
    ) -> Result<StepOutcome, ApprovalError> {
        if request.is_terminal() {
            return Err(ApprovalError::InvalidState {
                request_id: request.id.clone(),
                status: request.status,
            });
        }
        if !self.can_act(request, actor) {
            return Err(ApprovalError::NotEligible {
                request_id: request.id.clone(),
                step: request.current_step,
            });
        }

        request.approved_by = Some(actor.id.clone());
        let outcome = self.advance(request, now);
        request.updated_at = now;
        Ok(outcome)
    }

    /// Terminal rejection. No step advancement, no history mutation;
    /// re-submission requires a new request.
    pub fn reject(
        &self,
        request: &mut ApprovalRequest,
        now: DateTime<Utc>,
    ) -> Result<(), ApprovalError> {
        if request.is_terminal() {
            return Err(ApprovalError::InvalidState {
                request_id: request.id.clone(),
                status: request.status,
            });
        }

        request.status = RequestStatus::Rejected;
        request.current_step = 0;
        request.step_started_at = None;
        request.updated_at = now;
        Ok(())
    }

    fn advance(&self, request: &mut ApprovalRequest, now: DateTime<Utc>) -> StepOutcome {
        if request.current_step > 0 {
            let started_at = request.step_started_at.take().unwrap_or(now);
            request.step_history.push(StepRecord {
                step: request.current_step,
                started_at,
                ended_at: now,
                approved_by: request.approved_by.clone(),
            });
        }

        let next_step = request.current_step + 1;
        if self.routes.step(request.request_type, next_step).is_some() {
            request.current_step = next_step;
            request.step_started_at = Some(now);
            request.status = RequestStatus::InApproval;
            StepOutcome::Continues { step: next_step }
        } else {
            request.status = RequestStatus::Approved;
            request.current_step = 0;
            request.step_started_at = None;
            request.approved_at = Some(now);
            StepOutcome::Completed
        }
    }
}
