use sqlx::Row;

use talenthub_core::domain::request::RequestType;
use talenthub_core::routes::{RequiredRole, RouteStep};

use super::{RepositoryError, RouteRepository};
use crate::DbPool;

pub struct SqlRouteRepository {
    pool: DbPool,
}

impl SqlRouteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_step(row: &sqlx::sqlite::SqliteRow) -> Result<RouteStep, RepositoryError> {
    let request_type_str: String =
        row.try_get("request_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let step_no: i64 =
        row.try_get("step_no").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let required_role_str: String =
        row.try_get("required_role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let sla_days: i64 =
        row.try_get("sla_days").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(RouteStep {
        request_type: RequestType::parse(&request_type_str).ok_or_else(|| {
            RepositoryError::Decode(format!("request_type: `{request_type_str}`"))
        })?,
        step_no: u32::try_from(step_no)
            .map_err(|_| RepositoryError::Decode(format!("step_no: {step_no}")))?,
        required_role: RequiredRole::parse(&required_role_str).ok_or_else(|| {
            RepositoryError::Decode(format!("required_role: `{required_role_str}`"))
        })?,
        sla_days: u32::try_from(sla_days)
            .map_err(|_| RepositoryError::Decode(format!("sla_days: {sla_days}")))?,
    })
}

#[async_trait::async_trait]
impl RouteRepository for SqlRouteRepository {
    async fn list_all(&self) -> Result<Vec<RouteStep>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT request_type, step_no, required_role, sla_days
             FROM route_step ORDER BY request_type, step_no",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_step).collect()
    }

    async fn save(&self, step: RouteStep) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO route_step (request_type, step_no, required_role, sla_days)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(request_type, step_no) DO UPDATE SET
                 required_role = excluded.required_role,
                 sla_days = excluded.sla_days",
        )
        .bind(step.request_type.as_str())
        .bind(i64::from(step.step_no))
        .bind(step.required_role.as_str())
        .bind(i64::from(step.sla_days))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use talenthub_core::domain::request::RequestType;
    use talenthub_core::routes::{RequiredRole, RouteStep, RouteTable};

    use super::SqlRouteRepository;
    use crate::repositories::RouteRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn saved_steps_round_trip_into_a_route_table() {
        let pool = setup().await;
        let repo = SqlRouteRepository::new(pool);

        for (step_no, role, sla) in [
            (1, RequiredRole::Employee, 1),
            (2, RequiredRole::Manager, 2),
        ] {
            repo.save(RouteStep {
                request_type: RequestType::Vacation,
                step_no,
                required_role: role,
                sla_days: sla,
            })
            .await
            .expect("save step");
        }

        let steps = repo.list_all().await.expect("list");
        let table = RouteTable::new(steps).expect("stored route should validate");
        assert_eq!(table.total_sla_days(RequestType::Vacation), 3);
        assert_eq!(
            table.step(RequestType::Vacation, 2).map(|s| s.required_role),
            Some(RequiredRole::Manager)
        );
    }

    #[tokio::test]
    async fn save_upserts_existing_steps() {
        let pool = setup().await;
        let repo = SqlRouteRepository::new(pool);

        let step = RouteStep {
            request_type: RequestType::BusinessTrip,
            step_no: 1,
            required_role: RequiredRole::Manager,
            sla_days: 2,
        };
        repo.save(step.clone()).await.expect("save");

        let mut revised = step;
        revised.sla_days = 5;
        repo.save(revised).await.expect("upsert");

        let steps = repo.list_all().await.expect("list");
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].sla_days, 5);
    }
}
