use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::employee::EmployeeId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(format!("REQ-{}", Uuid::new_v4().simple()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Vacation,
    BusinessTrip,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vacation => "vacation",
            Self::BusinessTrip => "business_trip",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "vacation" => Some(Self::Vacation),
            "business_trip" => Some(Self::BusinessTrip),
            _ => None,
        }
    }

    /// Human-readable label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Vacation => "Vacation",
            Self::BusinessTrip => "Business trip",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    Submitted,
    InApproval,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::InApproval => "in_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "in_approval" => Some(Self::InApproval),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// Inclusive calendar range of the absence itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    /// Calendar days covered, both endpoints included.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// One closed approval step. Appended when the step is advanced past,
/// never rewritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub approved_by: Option<EmployeeId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: RequestId,
    pub employee_id: EmployeeId,
    pub request_type: RequestType,
    pub date_range: DateRange,
    pub comment: String,
    pub status: RequestStatus,
    /// Active route step; 0 in terminal states.
    pub current_step: u32,
    pub step_started_at: Option<DateTime<Utc>>,
    pub approved_by: Option<EmployeeId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub step_history: Vec<StepRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `status == approved` must coincide with `current_step == 0` and a
    /// recorded approval timestamp.
    pub fn invariants_hold(&self) -> bool {
        let approved_shape = self.current_step == 0 && self.approved_at.is_some();
        if (self.status == RequestStatus::Approved) != approved_shape {
            return false;
        }
        if self.is_terminal() {
            self.current_step == 0 && self.step_started_at.is_none()
        } else {
            self.current_step > 0 && self.step_started_at.is_some()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{DateRange, RequestStatus, RequestType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn date_range_counts_both_endpoints() {
        let range = DateRange::new(date(2026, 7, 1), date(2026, 7, 14)).expect("valid range");
        assert_eq!(range.duration_days(), 14);

        let single = DateRange::new(date(2026, 7, 1), date(2026, 7, 1)).expect("single day");
        assert_eq!(single.duration_days(), 1);
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        assert!(DateRange::new(date(2026, 7, 14), date(2026, 7, 1)).is_none());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            RequestStatus::Draft,
            RequestStatus::Submitted,
            RequestStatus::InApproval,
            RequestStatus::Approved,
            RequestStatus::Rejected,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("cancelled"), None);
    }

    #[test]
    fn only_approved_and_rejected_are_terminal() {
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(!RequestStatus::Submitted.is_terminal());
        assert!(!RequestStatus::InApproval.is_terminal());
        assert!(!RequestStatus::Draft.is_terminal());
    }

    #[test]
    fn request_type_labels_are_stable() {
        assert_eq!(RequestType::Vacation.label(), "Vacation");
        assert_eq!(RequestType::BusinessTrip.label(), "Business trip");
        assert_eq!(RequestType::parse("business_trip"), Some(RequestType::BusinessTrip));
    }
}
