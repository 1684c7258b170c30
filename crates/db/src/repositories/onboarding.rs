use sqlx::Row;

use talenthub_core::domain::employee::EmployeeId;
use talenthub_core::domain::onboarding::{OnboardingProgress, OnboardingTask, TaskId};

use super::{parse_timestamp, OnboardingRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOnboardingRepository {
    pool: DbPool,
}

impl SqlOnboardingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<OnboardingTask, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String =
        row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let position: i64 =
        row.try_get("position").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(OnboardingTask {
        id: TaskId(id),
        title,
        description,
        position: u32::try_from(position)
            .map_err(|_| RepositoryError::Decode(format!("position: {position}")))?,
    })
}

fn row_to_progress(row: &sqlx::sqlite::SqliteRow) -> Result<OnboardingProgress, RepositoryError> {
    let employee_id: String =
        row.try_get("employee_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let task_id: String =
        row.try_get("task_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let completed: bool =
        row.try_get("completed").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let completed_at_str: Option<String> =
        row.try_get("completed_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(OnboardingProgress {
        employee_id: EmployeeId(employee_id),
        task_id: TaskId(task_id),
        completed,
        completed_at: completed_at_str
            .map(|value| parse_timestamp("completed_at", &value))
            .transpose()?,
    })
}

#[async_trait::async_trait]
impl OnboardingRepository for SqlOnboardingRepository {
    async fn list_tasks(&self) -> Result<Vec<OnboardingTask>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, title, description, position FROM onboarding_task ORDER BY position, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_task).collect()
    }

    async fn save_task(&self, task: OnboardingTask) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO onboarding_task (id, title, description, position)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 position = excluded.position",
        )
        .bind(&task.id.0)
        .bind(&task.title)
        .bind(&task.description)
        .bind(i64::from(task.position))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_progress_for(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Vec<OnboardingProgress>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT employee_id, task_id, completed, completed_at
             FROM onboarding_progress WHERE employee_id = ?",
        )
        .bind(&employee_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_progress).collect()
    }

    async fn find_progress(
        &self,
        employee_id: &EmployeeId,
        task_id: &TaskId,
    ) -> Result<Option<OnboardingProgress>, RepositoryError> {
        let row = sqlx::query(
            "SELECT employee_id, task_id, completed, completed_at
             FROM onboarding_progress WHERE employee_id = ? AND task_id = ?",
        )
        .bind(&employee_id.0)
        .bind(&task_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_progress(r)?)),
            None => Ok(None),
        }
    }

    async fn save_progress(&self, progress: OnboardingProgress) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO onboarding_progress (employee_id, task_id, completed, completed_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(employee_id, task_id) DO UPDATE SET
                 completed = excluded.completed,
                 completed_at = excluded.completed_at",
        )
        .bind(&progress.employee_id.0)
        .bind(&progress.task_id.0)
        .bind(progress.completed)
        .bind(progress.completed_at.map(|value| value.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
