use sqlx::Row;

use talenthub_core::domain::employee::EmployeeId;
use talenthub_core::domain::notification::{Notification, NotificationId, NotificationKind};

use super::{parse_timestamp, NotificationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlNotificationRepository {
    pool: DbPool,
}

impl SqlNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_notification(row: &sqlx::sqlite::SqliteRow) -> Result<Notification, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let employee_id: String =
        row.try_get("employee_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String =
        row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let message: String =
        row.try_get("message").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let kind_str: String =
        row.try_get("kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_read: bool =
        row.try_get("is_read").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let link: Option<String> =
        row.try_get("link").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Notification {
        id: NotificationId(id),
        employee_id: EmployeeId(employee_id),
        title,
        message,
        kind: NotificationKind::parse(&kind_str)
            .ok_or_else(|| RepositoryError::Decode(format!("kind: `{kind_str}`")))?,
        read: is_read,
        link,
        created_at: parse_timestamp("created_at", &created_at_str)?,
    })
}

#[async_trait::async_trait]
impl NotificationRepository for SqlNotificationRepository {
    async fn list_for_employee(
        &self,
        employee_id: &EmployeeId,
        only_unread: bool,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = if only_unread {
            sqlx::query(
                "SELECT id, employee_id, title, message, kind, is_read, link, created_at
                 FROM notification
                 WHERE employee_id = ? AND is_read = 0
                 ORDER BY created_at DESC",
            )
            .bind(&employee_id.0)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, employee_id, title, message, kind, is_read, link, created_at
                 FROM notification
                 WHERE employee_id = ?
                 ORDER BY created_at DESC",
            )
            .bind(&employee_id.0)
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter().map(row_to_notification).collect()
    }

    async fn save(&self, notification: Notification) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO notification (id, employee_id, title, message, kind, is_read, link,
                                       created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET is_read = excluded.is_read",
        )
        .bind(&notification.id.0)
        .bind(&notification.employee_id.0)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(notification.read)
        .bind(&notification.link)
        .bind(notification.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<bool, RepositoryError> {
        let updated = sqlx::query("UPDATE notification SET is_read = 1 WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(updated.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use talenthub_core::domain::employee::{Employee, EmployeeId};
    use talenthub_core::domain::notification::{Notification, NotificationKind};

    use super::SqlNotificationRepository;
    use crate::repositories::{EmployeeRepository, NotificationRepository, SqlEmployeeRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let now = Utc::now();
        SqlEmployeeRepository::new(pool.clone())
            .save(Employee {
                id: EmployeeId("EMP-1".to_string()),
                directory_id: 1,
                name: "Maria Sidorova".to_string(),
                email: "maria.sidorova@example.com".to_string(),
                position: "HR Manager".to_string(),
                hire_date: None,
                is_manager: false,
                is_hr: true,
                active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("seed employee");

        pool
    }

    #[tokio::test]
    async fn unread_filter_and_mark_read() {
        let pool = setup().await;
        let repo = SqlNotificationRepository::new(pool);
        let employee_id = EmployeeId("EMP-1".to_string());

        let first = Notification::new(
            employee_id.clone(),
            "Request approved",
            "Your vacation request was approved.",
            NotificationKind::Success,
            Some("/requests/REQ-1".to_string()),
            Utc::now(),
        );
        let second = Notification::new(
            employee_id.clone(),
            "Approval pending",
            "A request is waiting for your review.",
            NotificationKind::Info,
            None,
            Utc::now(),
        );
        repo.save(first.clone()).await.expect("save first");
        repo.save(second).await.expect("save second");

        let unread = repo.list_for_employee(&employee_id, true).await.expect("list unread");
        assert_eq!(unread.len(), 2);

        assert!(repo.mark_read(&first.id).await.expect("mark read"));

        let unread = repo.list_for_employee(&employee_id, true).await.expect("list unread");
        assert_eq!(unread.len(), 1);

        let all = repo.list_for_employee(&employee_id, false).await.expect("list all");
        assert_eq!(all.len(), 2);
    }
}
