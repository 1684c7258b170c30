use chrono::{DateTime, Utc};
use thiserror::Error;

use talenthub_core::directory::{plan_sync, DirectoryClient, DirectoryError, SyncOutcome};

use crate::repositories::{EmployeeRepository, RepositoryError, SqlEmployeeRepository};
use crate::DbPool;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Pull the directory feed and persist the resulting diff.
pub async fn run_sync(
    pool: &DbPool,
    client: &dyn DirectoryClient,
    now: DateTime<Utc>,
) -> Result<SyncOutcome, SyncError> {
    let profiles = client.fetch_profiles().await?;

    let repo = SqlEmployeeRepository::new(pool.clone());
    let existing = repo.list(false).await?;
    let plan = plan_sync(&existing, &profiles, now);
    let outcome = plan.outcome();

    for employee in plan.create.into_iter().chain(plan.update).chain(plan.deactivate) {
        repo.save(employee).await?;
    }

    Ok(outcome)
}
