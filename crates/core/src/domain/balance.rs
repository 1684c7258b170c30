use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;

pub const DEFAULT_ANNUAL_ALLOWANCE: f64 = 28.0;

/// Per-year vacation allowance. Debited when a vacation request reaches
/// terminal approval; business trips never touch it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VacationBalance {
    pub employee_id: EmployeeId,
    pub year: i32,
    pub total_days: f64,
    pub used_days: f64,
}

impl VacationBalance {
    pub fn new(employee_id: EmployeeId, year: i32) -> Self {
        Self { employee_id, year, total_days: DEFAULT_ANNUAL_ALLOWANCE, used_days: 0.0 }
    }

    pub fn remaining_days(&self) -> f64 {
        self.total_days - self.used_days
    }

    pub fn debit(&mut self, days: f64) {
        self.used_days += days;
    }
}

#[cfg(test)]
mod tests {
    use super::VacationBalance;
    use crate::domain::employee::EmployeeId;

    #[test]
    fn debit_reduces_remaining_days() {
        let mut balance = VacationBalance::new(EmployeeId("EMP-1".to_string()), 2026);
        assert_eq!(balance.remaining_days(), 28.0);

        balance.debit(14.0);
        assert_eq!(balance.used_days, 14.0);
        assert_eq!(balance.remaining_days(), 14.0);
    }
}
