use std::collections::HashMap;

use sqlx::Row;

use talenthub_core::domain::employee::EmployeeId;
use talenthub_core::domain::request::{
    ApprovalRequest, DateRange, RequestId, RequestStatus, RequestType, StepRecord,
};

use super::{parse_date, parse_timestamp, RepositoryError, RequestRepository};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const REQUEST_COLUMNS: &str = "id, employee_id, request_type, start_date, end_date, comment, \
                               status, current_step, step_started_at, approved_by, approved_at, \
                               created_at, updated_at";

fn row_to_request(
    row: &sqlx::sqlite::SqliteRow,
    step_history: Vec<StepRecord>,
) -> Result<ApprovalRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let employee_id: String =
        row.try_get("employee_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_type_str: String =
        row.try_get("request_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let start_date_str: String =
        row.try_get("start_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let end_date_str: String =
        row.try_get("end_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comment: String =
        row.try_get("comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let current_step: i64 =
        row.try_get("current_step").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let step_started_at_str: Option<String> =
        row.try_get("step_started_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approved_by: Option<String> =
        row.try_get("approved_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approved_at_str: Option<String> =
        row.try_get("approved_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let request_type = RequestType::parse(&request_type_str)
        .ok_or_else(|| RepositoryError::Decode(format!("request_type: `{request_type_str}`")))?;
    let status = RequestStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("status: `{status_str}`")))?;
    let date_range = DateRange::new(
        parse_date("start_date", &start_date_str)?,
        parse_date("end_date", &end_date_str)?,
    )
    .ok_or_else(|| RepositoryError::Decode("end_date precedes start_date".to_string()))?;
    let current_step = u32::try_from(current_step)
        .map_err(|_| RepositoryError::Decode(format!("current_step: {current_step}")))?;

    Ok(ApprovalRequest {
        id: RequestId(id),
        employee_id: EmployeeId(employee_id),
        request_type,
        date_range,
        comment,
        status,
        current_step,
        step_started_at: step_started_at_str
            .map(|value| parse_timestamp("step_started_at", &value))
            .transpose()?,
        approved_by: approved_by.map(EmployeeId),
        approved_at: approved_at_str
            .map(|value| parse_timestamp("approved_at", &value))
            .transpose()?,
        step_history,
        created_at: parse_timestamp("created_at", &created_at_str)?,
        updated_at: parse_timestamp("updated_at", &updated_at_str)?,
    })
}

fn row_to_step_record(row: &sqlx::sqlite::SqliteRow) -> Result<StepRecord, RepositoryError> {
    let step_no: i64 =
        row.try_get("step_no").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let started_at_str: String =
        row.try_get("started_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let ended_at_str: String =
        row.try_get("ended_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approved_by: Option<String> =
        row.try_get("approved_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(StepRecord {
        step: u32::try_from(step_no)
            .map_err(|_| RepositoryError::Decode(format!("step_no: {step_no}")))?,
        started_at: parse_timestamp("started_at", &started_at_str)?,
        ended_at: parse_timestamp("ended_at", &ended_at_str)?,
        approved_by: approved_by.map(EmployeeId),
    })
}

impl SqlRequestRepository {
    async fn load_history(&self, request_id: &str) -> Result<Vec<StepRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT step_no, started_at, ended_at, approved_by
             FROM approval_step_history WHERE request_id = ? ORDER BY step_no",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_step_record).collect()
    }

    async fn load_requests(
        &self,
        rows: Vec<sqlx::sqlite::SqliteRow>,
    ) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        let history_rows = sqlx::query(
            "SELECT request_id, step_no, started_at, ended_at, approved_by
             FROM approval_step_history ORDER BY request_id, step_no",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut history: HashMap<String, Vec<StepRecord>> = HashMap::new();
        for row in &history_rows {
            let request_id: String =
                row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            history.entry(request_id).or_default().push(row_to_step_record(row)?);
        }

        rows.iter()
            .map(|row| {
                let id: String =
                    row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                row_to_request(row, history.remove(&id).unwrap_or_default())
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM approval_request WHERE id = ?"))
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => {
                let history = self.load_history(&id.0).await?;
                Ok(Some(row_to_request(r, history)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM approval_request ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        self.load_requests(rows).await
    }

    async fn list_for_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM approval_request
             WHERE employee_id = ? ORDER BY created_at DESC"
        ))
        .bind(&employee_id.0)
        .fetch_all(&self.pool)
        .await?;

        self.load_requests(rows).await
    }

    async fn insert(&self, request: ApprovalRequest) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO approval_request (id, employee_id, request_type, start_date, end_date,
                                           comment, status, current_step, step_started_at,
                                           approved_by, approved_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.employee_id.0)
        .bind(request.request_type.as_str())
        .bind(request.date_range.start.to_string())
        .bind(request.date_range.end.to_string())
        .bind(&request.comment)
        .bind(request.status.as_str())
        .bind(i64::from(request.current_step))
        .bind(request.step_started_at.map(|value| value.to_rfc3339()))
        .bind(request.approved_by.as_ref().map(|id| id.0.clone()))
        .bind(request.approved_at.map(|value| value.to_rfc3339()))
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for record in &request.step_history {
            sqlx::query(
                "INSERT OR IGNORE INTO approval_step_history
                     (request_id, step_no, started_at, ended_at, approved_by)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&request.id.0)
            .bind(i64::from(record.step))
            .bind(record.started_at.to_rfc3339())
            .bind(record.ended_at.to_rfc3339())
            .bind(record.approved_by.as_ref().map(|id| id.0.clone()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_transition(
        &self,
        request: &ApprovalRequest,
        expected_step: u32,
        expected_status: RequestStatus,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE approval_request
             SET status = ?, current_step = ?, step_started_at = ?,
                 approved_by = ?, approved_at = ?, updated_at = ?
             WHERE id = ? AND current_step = ? AND status = ?",
        )
        .bind(request.status.as_str())
        .bind(i64::from(request.current_step))
        .bind(request.step_started_at.map(|value| value.to_rfc3339()))
        .bind(request.approved_by.as_ref().map(|id| id.0.clone()))
        .bind(request.approved_at.map(|value| value.to_rfc3339()))
        .bind(request.updated_at.to_rfc3339())
        .bind(&request.id.0)
        .bind(i64::from(expected_step))
        .bind(expected_status.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        // History is append-only; existing rows are left untouched.
        for record in &request.step_history {
            sqlx::query(
                "INSERT OR IGNORE INTO approval_step_history
                     (request_id, step_no, started_at, ended_at, approved_by)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&request.id.0)
            .bind(i64::from(record.step))
            .bind(record.started_at.to_rfc3339())
            .bind(record.ended_at.to_rfc3339())
            .bind(record.approved_by.as_ref().map(|id| id.0.clone()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use talenthub_core::domain::employee::{Employee, EmployeeId};
    use talenthub_core::domain::request::{RequestStatus, RequestType};
    use talenthub_core::routes::{RequiredRole, RouteStep, RouteTable};
    use talenthub_core::workflow::{StepOutcome, WorkflowEngine};

    use super::SqlRequestRepository;
    use crate::repositories::{EmployeeRepository, RequestRepository, SqlEmployeeRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, hour, 0, 0).single().expect("valid instant")
    }

    fn employee(id: &str, directory_id: i64, is_manager: bool) -> Employee {
        Employee {
            id: EmployeeId(id.to_string()),
            directory_id,
            name: id.to_string(),
            email: format!("{id}@example.com"),
            position: "Engineer".to_string(),
            hire_date: None,
            is_manager,
            is_hr: false,
            active: true,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    fn engine() -> WorkflowEngine {
        let routes = RouteTable::new(vec![
            RouteStep {
                request_type: RequestType::Vacation,
                step_no: 1,
                required_role: RequiredRole::Employee,
                sla_days: 1,
            },
            RouteStep {
                request_type: RequestType::Vacation,
                step_no: 2,
                required_role: RequiredRole::Manager,
                sla_days: 2,
            },
        ])
        .expect("valid route");
        WorkflowEngine::new(routes)
    }

    async fn seed_employees(pool: &sqlx::SqlitePool) -> (Employee, Employee) {
        let repo = SqlEmployeeRepository::new(pool.clone());
        let requester = employee("EMP-e", 1, false);
        let manager = employee("EMP-m", 2, true);
        repo.save(requester.clone()).await.expect("save requester");
        repo.save(manager.clone()).await.expect("save manager");
        (requester, manager)
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let pool = setup().await;
        let (requester, _) = seed_employees(&pool).await;
        let repo = SqlRequestRepository::new(pool);

        let request = engine()
            .submit(
                &requester,
                RequestType::Vacation,
                NaiveDate::from_ymd_opt(2026, 7, 1).expect("date"),
                NaiveDate::from_ymd_opt(2026, 7, 14).expect("date"),
                "summer",
                at(9),
            )
            .expect("submit");

        repo.insert(request.clone()).await.expect("insert");

        let found = repo.find_by_id(&request.id).await.expect("find").expect("exists");
        assert_eq!(found, request);
    }

    #[tokio::test]
    async fn transition_persists_history_and_state() {
        let pool = setup().await;
        let (requester, manager) = seed_employees(&pool).await;
        let repo = SqlRequestRepository::new(pool);
        let engine = engine();

        let mut request = engine
            .submit(
                &requester,
                RequestType::Vacation,
                NaiveDate::from_ymd_opt(2026, 7, 1).expect("date"),
                NaiveDate::from_ymd_opt(2026, 7, 2).expect("date"),
                "",
                at(9),
            )
            .expect("submit");
        repo.insert(request.clone()).await.expect("insert");

        let (prior_step, prior_status) = (request.current_step, request.status);
        let outcome = engine.approve(&mut request, &requester, at(10)).expect("step 1");
        assert_eq!(outcome, StepOutcome::Continues { step: 2 });
        assert!(repo
            .update_transition(&request, prior_step, prior_status)
            .await
            .expect("guarded update"));

        let (prior_step, prior_status) = (request.current_step, request.status);
        let outcome = engine.approve(&mut request, &manager, at(11)).expect("step 2");
        assert_eq!(outcome, StepOutcome::Completed);
        assert!(repo
            .update_transition(&request, prior_step, prior_status)
            .await
            .expect("guarded update"));

        let reloaded = repo.find_by_id(&request.id).await.expect("find").expect("exists");
        assert_eq!(reloaded.status, RequestStatus::Approved);
        assert_eq!(reloaded.current_step, 0);
        assert_eq!(reloaded.approved_at, Some(at(11)));
        assert_eq!(reloaded.step_history.len(), 2);
        assert_eq!(reloaded, request);
    }

    #[tokio::test]
    async fn stale_transition_is_refused_without_writes() {
        let pool = setup().await;
        let (requester, _) = seed_employees(&pool).await;
        let repo = SqlRequestRepository::new(pool);
        let engine = engine();

        let mut request = engine
            .submit(
                &requester,
                RequestType::Vacation,
                NaiveDate::from_ymd_opt(2026, 7, 1).expect("date"),
                NaiveDate::from_ymd_opt(2026, 7, 2).expect("date"),
                "",
                at(9),
            )
            .expect("submit");
        repo.insert(request.clone()).await.expect("insert");
        let stored = request.clone();

        engine.approve(&mut request, &requester, at(10)).expect("step 1");

        // A writer that computed its transition from step 2 while the stored
        // row is still at step 1 must lose.
        let accepted = repo
            .update_transition(&request, request.current_step, request.status)
            .await
            .expect("guarded update");
        assert!(!accepted);

        let reloaded = repo.find_by_id(&request.id).await.expect("find").expect("exists");
        assert_eq!(reloaded, stored);
        assert!(reloaded.step_history.is_empty());
    }

    #[tokio::test]
    async fn list_for_employee_scopes_results() {
        let pool = setup().await;
        let (requester, manager) = seed_employees(&pool).await;
        let repo = SqlRequestRepository::new(pool);
        let engine = engine();

        for (owner, day) in [(&requester, 1), (&requester, 10), (&manager, 20)] {
            let request = engine
                .submit(
                    owner,
                    RequestType::Vacation,
                    NaiveDate::from_ymd_opt(2026, 8, day).expect("date"),
                    NaiveDate::from_ymd_opt(2026, 8, day + 1).expect("date"),
                    "",
                    at(day),
                )
                .expect("submit");
            repo.insert(request).await.expect("insert");
        }

        let mine = repo.list_for_employee(&requester.id).await.expect("list");
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|request| request.employee_id == requester.id));

        let all = repo.list().await.expect("list all");
        assert_eq!(all.len(), 3);
    }
}
