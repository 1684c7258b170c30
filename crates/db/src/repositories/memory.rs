use std::collections::HashMap;

use tokio::sync::RwLock;

use talenthub_core::domain::employee::{Employee, EmployeeId};
use talenthub_core::domain::request::{ApprovalRequest, RequestId, RequestStatus};
use talenthub_core::routes::RouteStep;

use super::{
    EmployeeRepository, RepositoryError, RequestRepository, RouteRepository,
};

#[derive(Default)]
pub struct InMemoryEmployeeRepository {
    employees: RwLock<HashMap<String, Employee>>,
}

#[async_trait::async_trait]
impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        Ok(employees.get(&id.0).cloned())
    }

    async fn find_by_directory_id(
        &self,
        directory_id: i64,
    ) -> Result<Option<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        Ok(employees.values().find(|employee| employee.directory_id == directory_id).cloned())
    }

    async fn list(&self, only_active: bool) -> Result<Vec<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        let mut listed: Vec<Employee> = employees
            .values()
            .filter(|employee| !only_active || employee.active)
            .cloned()
            .collect();
        listed.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(listed)
    }

    async fn save(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut employees = self.employees.write().await;
        employees.insert(employee.id.0.clone(), employee);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<String, ApprovalRequest>>,
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut listed: Vec<ApprovalRequest> = requests.values().cloned().collect();
        listed.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(listed)
    }

    async fn list_for_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|request| &request.employee_id == employee_id)
            .collect())
    }

    async fn insert(&self, request: ApprovalRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn update_transition(
        &self,
        request: &ApprovalRequest,
        expected_step: u32,
        expected_status: RequestStatus,
    ) -> Result<bool, RepositoryError> {
        let mut requests = self.requests.write().await;
        match requests.get(&request.id.0) {
            Some(stored)
                if stored.current_step == expected_step && stored.status == expected_status =>
            {
                requests.insert(request.id.0.clone(), request.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryRouteRepository {
    steps: RwLock<Vec<RouteStep>>,
}

#[async_trait::async_trait]
impl RouteRepository for InMemoryRouteRepository {
    async fn list_all(&self) -> Result<Vec<RouteStep>, RepositoryError> {
        let steps = self.steps.read().await;
        Ok(steps.clone())
    }

    async fn save(&self, step: RouteStep) -> Result<(), RepositoryError> {
        let mut steps = self.steps.write().await;
        steps.retain(|existing| {
            !(existing.request_type == step.request_type && existing.step_no == step.step_no)
        });
        steps.push(step);
        Ok(())
    }
}
