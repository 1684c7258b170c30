use sqlx::Row;

use talenthub_core::domain::balance::VacationBalance;
use talenthub_core::domain::employee::EmployeeId;

use super::{BalanceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBalanceRepository {
    pool: DbPool,
}

impl SqlBalanceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_balance(row: &sqlx::sqlite::SqliteRow) -> Result<VacationBalance, RepositoryError> {
    let employee_id: String =
        row.try_get("employee_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let year: i64 = row.try_get("year").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_days: f64 =
        row.try_get("total_days").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let used_days: f64 =
        row.try_get("used_days").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(VacationBalance {
        employee_id: EmployeeId(employee_id),
        year: i32::try_from(year)
            .map_err(|_| RepositoryError::Decode(format!("year: {year}")))?,
        total_days,
        used_days,
    })
}

#[async_trait::async_trait]
impl BalanceRepository for SqlBalanceRepository {
    async fn find(
        &self,
        employee_id: &EmployeeId,
        year: i32,
    ) -> Result<Option<VacationBalance>, RepositoryError> {
        let row = sqlx::query(
            "SELECT employee_id, year, total_days, used_days
             FROM vacation_balance WHERE employee_id = ? AND year = ?",
        )
        .bind(&employee_id.0)
        .bind(i64::from(year))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_balance(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, balance: VacationBalance) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO vacation_balance (employee_id, year, total_days, used_days)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(employee_id, year) DO UPDATE SET
                 total_days = excluded.total_days,
                 used_days = excluded.used_days",
        )
        .bind(&balance.employee_id.0)
        .bind(i64::from(balance.year))
        .bind(balance.total_days)
        .bind(balance.used_days)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use talenthub_core::domain::balance::VacationBalance;
    use talenthub_core::domain::employee::{Employee, EmployeeId};

    use super::SqlBalanceRepository;
    use crate::repositories::{BalanceRepository, EmployeeRepository, SqlEmployeeRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let now = Utc::now();
        SqlEmployeeRepository::new(pool.clone())
            .save(Employee {
                id: EmployeeId("EMP-1".to_string()),
                directory_id: 1,
                name: "Ivan Petrov".to_string(),
                email: "ivan.petrov@example.com".to_string(),
                position: "Team Lead".to_string(),
                hire_date: None,
                is_manager: true,
                is_hr: false,
                active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("seed employee");

        pool
    }

    #[tokio::test]
    async fn debit_round_trips_through_the_store() {
        let pool = setup().await;
        let repo = SqlBalanceRepository::new(pool);
        let employee_id = EmployeeId("EMP-1".to_string());

        let mut balance = VacationBalance::new(employee_id.clone(), 2026);
        repo.save(balance.clone()).await.expect("save fresh");

        balance.debit(14.0);
        repo.save(balance).await.expect("save debited");

        let found = repo.find(&employee_id, 2026).await.expect("find").expect("exists");
        assert_eq!(found.used_days, 14.0);
        assert_eq!(found.remaining_days(), 14.0);

        assert!(repo.find(&employee_id, 2027).await.expect("find").is_none());
    }
}
