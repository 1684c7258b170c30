use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

/// Checklist template item shared by every onboarding employee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingTask {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    /// Ordering key within the checklist.
    pub position: u32,
}

/// One employee's state against one checklist item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingProgress {
    pub employee_id: EmployeeId,
    pub task_id: TaskId,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl OnboardingProgress {
    pub fn open(employee_id: EmployeeId, task_id: TaskId) -> Self {
        Self { employee_id, task_id, completed: false, completed_at: None }
    }

    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.completed = completed;
        self.completed_at = completed.then_some(now);
    }
}

/// Whole-checklist completion percentage; 0 when no tasks are configured.
pub fn progress_percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed * 100) / total) as u32
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{progress_percent, OnboardingProgress, TaskId};
    use crate::domain::employee::EmployeeId;

    #[test]
    fn percent_guards_empty_checklist() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(0, 4), 0);
        assert_eq!(progress_percent(1, 4), 25);
        assert_eq!(progress_percent(4, 4), 100);
    }

    #[test]
    fn uncompleting_clears_the_timestamp() {
        let mut progress = OnboardingProgress::open(
            EmployeeId("EMP-1".to_string()),
            TaskId("TASK-1".to_string()),
        );

        progress.set_completed(true, Utc::now());
        assert!(progress.completed_at.is_some());

        progress.set_completed(false, Utc::now());
        assert!(!progress.completed);
        assert!(progress.completed_at.is_none());
    }
}
