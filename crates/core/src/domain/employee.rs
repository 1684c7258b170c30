use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

impl EmployeeId {
    pub fn generate() -> Self {
        Self(format!("EMP-{}", Uuid::new_v4().simple()))
    }
}

/// Employee record mirrored from the external HR directory.
///
/// `is_manager` and `is_hr` are explicit capability flags set by directory
/// sync; the free-text `position` is display-only and never consulted for
/// role checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub directory_id: i64,
    pub name: String,
    pub email: String,
    pub position: String,
    pub hire_date: Option<NaiveDate>,
    pub is_manager: bool,
    pub is_hr: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
