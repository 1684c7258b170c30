use sqlx::Row;

use talenthub_core::domain::employee::{Employee, EmployeeId};

use super::{parse_date, parse_timestamp, EmployeeRepository, RepositoryError};
use crate::DbPool;

pub struct SqlEmployeeRepository {
    pool: DbPool,
}

impl SqlEmployeeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const EMPLOYEE_COLUMNS: &str = "id, directory_id, name, email, position, hire_date, \
                                is_manager, is_hr, active, created_at, updated_at";

fn row_to_employee(row: &sqlx::sqlite::SqliteRow) -> Result<Employee, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let directory_id: i64 =
        row.try_get("directory_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String = row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let position: String =
        row.try_get("position").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let hire_date_str: Option<String> =
        row.try_get("hire_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_manager: bool =
        row.try_get("is_manager").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_hr: bool = row.try_get("is_hr").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let active: bool =
        row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let hire_date =
        hire_date_str.map(|value| parse_date("hire_date", &value)).transpose()?;

    Ok(Employee {
        id: EmployeeId(id),
        directory_id,
        name,
        email,
        position,
        hire_date,
        is_manager,
        is_hr,
        active,
        created_at: parse_timestamp("created_at", &created_at_str)?,
        updated_at: parse_timestamp("updated_at", &updated_at_str)?,
    })
}

#[async_trait::async_trait]
impl EmployeeRepository for SqlEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {EMPLOYEE_COLUMNS} FROM employee WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_employee(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_directory_id(
        &self,
        directory_id: i64,
    ) -> Result<Option<Employee>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employee WHERE directory_id = ?"
        ))
        .bind(directory_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_employee(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, only_active: bool) -> Result<Vec<Employee>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = if only_active {
            sqlx::query(&format!(
                "SELECT {EMPLOYEE_COLUMNS} FROM employee WHERE active = 1 ORDER BY name"
            ))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!("SELECT {EMPLOYEE_COLUMNS} FROM employee ORDER BY name"))
                .fetch_all(&self.pool)
                .await?
        };

        rows.iter().map(row_to_employee).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, employee: Employee) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO employee (id, directory_id, name, email, position, hire_date,
                                   is_manager, is_hr, active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 directory_id = excluded.directory_id,
                 name = excluded.name,
                 email = excluded.email,
                 position = excluded.position,
                 hire_date = excluded.hire_date,
                 is_manager = excluded.is_manager,
                 is_hr = excluded.is_hr,
                 active = excluded.active,
                 updated_at = excluded.updated_at",
        )
        .bind(&employee.id.0)
        .bind(employee.directory_id)
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.position)
        .bind(employee.hire_date.map(|date| date.to_string()))
        .bind(employee.is_manager)
        .bind(employee.is_hr)
        .bind(employee.active)
        .bind(employee.created_at.to_rfc3339())
        .bind(employee.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use talenthub_core::domain::employee::{Employee, EmployeeId};

    use super::SqlEmployeeRepository;
    use crate::repositories::EmployeeRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_employee(id: &str, directory_id: i64) -> Employee {
        let now = Utc::now();
        Employee {
            id: EmployeeId(id.to_string()),
            directory_id,
            name: "Elena Kozlova".to_string(),
            email: "elena.kozlova@example.com".to_string(),
            position: "QA Engineer".to_string(),
            hire_date: NaiveDate::from_ymd_opt(2026, 2, 15),
            is_manager: false,
            is_hr: false,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let pool = setup().await;
        let repo = SqlEmployeeRepository::new(pool);
        let employee = sample_employee("EMP-001", 4);

        repo.save(employee.clone()).await.expect("save");

        let found = repo
            .find_by_id(&EmployeeId("EMP-001".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(found.name, "Elena Kozlova");
        assert_eq!(found.hire_date, NaiveDate::from_ymd_opt(2026, 2, 15));
        assert!(!found.is_manager);

        let by_directory =
            repo.find_by_directory_id(4).await.expect("find by directory").expect("exists");
        assert_eq!(by_directory.id, employee.id);
    }

    #[tokio::test]
    async fn save_upserts_capability_flags() {
        let pool = setup().await;
        let repo = SqlEmployeeRepository::new(pool);

        let employee = sample_employee("EMP-001", 4);
        repo.save(employee.clone()).await.expect("save");

        let mut promoted = employee;
        promoted.is_manager = true;
        promoted.updated_at = Utc::now();
        repo.save(promoted).await.expect("upsert");

        let found = repo
            .find_by_id(&EmployeeId("EMP-001".to_string()))
            .await
            .expect("find")
            .expect("exists");
        assert!(found.is_manager);
    }

    #[tokio::test]
    async fn list_filters_inactive_employees() {
        let pool = setup().await;
        let repo = SqlEmployeeRepository::new(pool);

        repo.save(sample_employee("EMP-001", 1)).await.expect("save 1");
        let mut departed = sample_employee("EMP-002", 2);
        departed.active = false;
        repo.save(departed).await.expect("save 2");

        let active = repo.list(true).await.expect("list active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id.0, "EMP-001");

        let all = repo.list(false).await.expect("list all");
        assert_eq!(all.len(), 2);
    }
}
