use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::employee::{Employee, EmployeeId};

/// Profile row as delivered by the external HR platform.
///
/// Role capabilities arrive as explicit flags maintained in the directory;
/// job titles are carried for display only and are never parsed for role
/// decisions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryProfile {
    pub directory_id: i64,
    pub name: String,
    pub email: String,
    pub position: String,
    pub hire_date: Option<NaiveDate>,
    pub is_manager: bool,
    pub is_hr: bool,
    pub active: bool,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory transport failure: {0}")]
    Transport(String),
    #[error("directory payload could not be decoded: {0}")]
    InvalidPayload(String),
}

/// Source of directory profiles. Implementations are selected once at
/// process start from configuration — fixture-backed for development and
/// tests, HTTP-backed for a live platform.
#[async_trait::async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn fetch_profiles(&self) -> Result<Vec<DirectoryProfile>, DirectoryError>;
}

/// Deterministic development directory; no external portal required.
#[derive(Clone, Debug)]
pub struct FixtureDirectoryClient {
    profiles: Vec<DirectoryProfile>,
}

impl FixtureDirectoryClient {
    pub fn with_profiles(profiles: Vec<DirectoryProfile>) -> Self {
        Self { profiles }
    }
}

impl Default for FixtureDirectoryClient {
    fn default() -> Self {
        let hire = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);
        Self::with_profiles(vec![
            DirectoryProfile {
                directory_id: 1,
                name: "Ivan Petrov".to_string(),
                email: "ivan.petrov@example.com".to_string(),
                position: "Team Lead".to_string(),
                hire_date: hire(2021, 3, 15),
                is_manager: true,
                is_hr: false,
                active: true,
            },
            DirectoryProfile {
                directory_id: 2,
                name: "Maria Sidorova".to_string(),
                email: "maria.sidorova@example.com".to_string(),
                position: "HR Manager".to_string(),
                hire_date: hire(2020, 7, 22),
                is_manager: false,
                is_hr: true,
                active: true,
            },
            DirectoryProfile {
                directory_id: 3,
                name: "Alexey Ivanov".to_string(),
                email: "alexey.ivanov@example.com".to_string(),
                position: "Junior Developer".to_string(),
                hire_date: hire(2026, 2, 1),
                is_manager: false,
                is_hr: false,
                active: true,
            },
            DirectoryProfile {
                directory_id: 4,
                name: "Elena Kozlova".to_string(),
                email: "elena.kozlova@example.com".to_string(),
                position: "QA Engineer".to_string(),
                hire_date: hire(2026, 2, 15),
                is_manager: false,
                is_hr: false,
                active: true,
            },
            DirectoryProfile {
                directory_id: 5,
                name: "Dmitry Sokolov".to_string(),
                email: "dmitry.sokolov@example.com".to_string(),
                position: "Frontend Developer".to_string(),
                hire_date: hire(2026, 1, 10),
                is_manager: false,
                is_hr: false,
                active: true,
            },
        ])
    }
}

#[async_trait::async_trait]
impl DirectoryClient for FixtureDirectoryClient {
    async fn fetch_profiles(&self) -> Result<Vec<DirectoryProfile>, DirectoryError> {
        Ok(self.profiles.clone())
    }
}

/// Live directory client. The platform exposes a webhook-style REST
/// endpoint; the token is part of the URL path and must never be logged.
pub struct HttpDirectoryClient {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl HttpDirectoryClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string().into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/user.get", self.base_url, self.token.expose_secret())
    }
}

#[derive(Debug, Deserialize)]
struct UserListPayload {
    #[serde(default)]
    result: Vec<UserPayload>,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: i64,
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    position: String,
    #[serde(default)]
    hire_date: Option<NaiveDate>,
    #[serde(default)]
    is_manager: bool,
    #[serde(default)]
    is_hr: bool,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

impl From<UserPayload> for DirectoryProfile {
    fn from(user: UserPayload) -> Self {
        Self {
            directory_id: user.id,
            name: user.name,
            email: user.email,
            position: user.position,
            hire_date: user.hire_date,
            is_manager: user.is_manager,
            is_hr: user.is_hr,
            active: user.active,
        }
    }
}

#[async_trait::async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn fetch_profiles(&self) -> Result<Vec<DirectoryProfile>, DirectoryError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|error| DirectoryError::Transport(error.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|error| DirectoryError::Transport(error.to_string()))?;

        let payload: UserListPayload = response
            .json()
            .await
            .map_err(|error| DirectoryError::InvalidPayload(error.to_string()))?;

        Ok(payload.result.into_iter().map(DirectoryProfile::from).collect())
    }
}

/// Concrete changes a sync run will persist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub create: Vec<Employee>,
    pub update: Vec<Employee>,
    pub deactivate: Vec<Employee>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub created: usize,
    pub updated: usize,
    pub deactivated: usize,
}

impl SyncPlan {
    pub fn outcome(&self) -> SyncOutcome {
        SyncOutcome {
            created: self.create.len(),
            updated: self.update.len(),
            deactivated: self.deactivate.len(),
        }
    }
}

/// Diff the current employee table against a directory feed.
///
/// Matching is by `directory_id`. Inactive feed profiles are skipped;
/// employees absent from the feed are deactivated, never deleted.
pub fn plan_sync(
    existing: &[Employee],
    profiles: &[DirectoryProfile],
    now: DateTime<Utc>,
) -> SyncPlan {
    let by_directory_id: HashMap<i64, &Employee> =
        existing.iter().map(|employee| (employee.directory_id, employee)).collect();

    let mut plan = SyncPlan::default();
    let mut seen: HashSet<i64> = HashSet::new();

    for profile in profiles.iter().filter(|profile| profile.active) {
        seen.insert(profile.directory_id);
        match by_directory_id.get(&profile.directory_id) {
            Some(current) => {
                let mut updated = (*current).clone();
                updated.name = profile.name.clone();
                updated.email = profile.email.clone();
                updated.position = profile.position.clone();
                updated.hire_date = profile.hire_date;
                updated.is_manager = profile.is_manager;
                updated.is_hr = profile.is_hr;
                updated.active = true;
                if updated != **current {
                    updated.updated_at = now;
                    plan.update.push(updated);
                }
            }
            None => {
                plan.create.push(Employee {
                    id: EmployeeId::generate(),
                    directory_id: profile.directory_id,
                    name: profile.name.clone(),
                    email: profile.email.clone(),
                    position: profile.position.clone(),
                    hire_date: profile.hire_date,
                    is_manager: profile.is_manager,
                    is_hr: profile.is_hr,
                    active: true,
                    created_at: now,
                    updated_at: now,
                });
            }
        }
    }

    for employee in existing {
        if employee.active && !seen.contains(&employee.directory_id) {
            let mut deactivated = employee.clone();
            deactivated.active = false;
            deactivated.updated_at = now;
            plan.deactivate.push(deactivated);
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{plan_sync, DirectoryProfile, FixtureDirectoryClient};
    use crate::domain::employee::{Employee, EmployeeId};

    fn profile(directory_id: i64, name: &str) -> DirectoryProfile {
        DirectoryProfile {
            directory_id,
            name: name.to_string(),
            email: format!("{directory_id}@example.com"),
            position: "Engineer".to_string(),
            hire_date: None,
            is_manager: false,
            is_hr: false,
            active: true,
        }
    }

    fn synced_employee(directory_id: i64, name: &str) -> Employee {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().expect("instant");
        Employee {
            id: EmployeeId(format!("EMP-{directory_id}")),
            directory_id,
            name: name.to_string(),
            email: format!("{directory_id}@example.com"),
            position: "Engineer".to_string(),
            hire_date: None,
            is_manager: false,
            is_hr: false,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn sync_creates_updates_and_deactivates() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).single().expect("instant");
        let existing = vec![synced_employee(1, "Ivan Petrov"), synced_employee(2, "Old Name")];

        let mut promoted = profile(2, "Maria Sidorova");
        promoted.is_hr = true;
        let profiles = vec![profile(1, "Ivan Petrov"), promoted, profile(3, "New Hire")];

        let plan = plan_sync(&existing, &profiles, now);
        let outcome = plan.outcome();

        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.deactivated, 0);
        assert_eq!(plan.create[0].directory_id, 3);
        assert_eq!(plan.update[0].name, "Maria Sidorova");
        assert!(plan.update[0].is_hr);
    }

    #[test]
    fn employees_missing_from_the_feed_are_deactivated() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).single().expect("instant");
        let existing = vec![synced_employee(1, "Ivan Petrov"), synced_employee(9, "Gone")];
        let profiles = vec![profile(1, "Ivan Petrov")];

        let plan = plan_sync(&existing, &profiles, now);
        assert_eq!(plan.outcome().deactivated, 1);
        assert_eq!(plan.deactivate[0].directory_id, 9);
        assert!(!plan.deactivate[0].active);
    }

    #[test]
    fn inactive_feed_profiles_are_skipped() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).single().expect("instant");
        let mut inactive = profile(7, "Not Here Yet");
        inactive.active = false;

        let plan = plan_sync(&[], &[inactive], now);
        assert_eq!(plan.outcome(), super::SyncOutcome::default());
    }

    #[test]
    fn fixture_directory_is_deterministic() {
        let first = FixtureDirectoryClient::default();
        let second = FixtureDirectoryClient::default();
        assert_eq!(first.profiles, second.profiles);
        assert_eq!(first.profiles.len(), 5);
        // Capabilities come from explicit flags, not from title text.
        assert!(first.profiles.iter().any(|p| p.is_manager));
        assert!(first.profiles.iter().any(|p| p.is_hr));
    }
}
