use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::{annotate, RequestFilters};
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::request::ApprovalRequest;
use crate::routes::RouteTable;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("csv rendering failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv output was not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// One report line: an approved request joined with its employee and SLA
/// annotation. Both export forms are rendered from the same rows, so the
/// duration/SLA/overdue values they report are identical by construction.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRow {
    pub request_id: String,
    pub type_label: &'static str,
    pub employee_id: String,
    pub employee_name: String,
    pub employee_position: String,
    pub created_at: DateTime<Utc>,
    pub approved_at: DateTime<Utc>,
    pub duration_days: f64,
    pub sla_days: u32,
    pub overdue: bool,
}

/// Join filtered approved requests with employees and SLA annotations.
///
/// Requests without a terminal approval timestamp are excluded — duration
/// is undefined without one — as are requests whose employee is missing
/// from the lookup.
pub fn build_rows(
    requests: &[ApprovalRequest],
    employees: &HashMap<EmployeeId, Employee>,
    routes: &RouteTable,
    filters: &RequestFilters,
) -> Vec<ReportRow> {
    let mut rows = Vec::new();
    for request in requests {
        if !filters.matches(request) {
            continue;
        }
        let Some(record) = annotate(request, routes) else {
            continue;
        };
        let Some(approved_at) = request.approved_at else {
            continue;
        };
        let Some(employee) = employees.get(&request.employee_id) else {
            continue;
        };
        rows.push(ReportRow {
            request_id: request.id.0.clone(),
            type_label: request.request_type.label(),
            employee_id: employee.id.0.clone(),
            employee_name: employee.name.clone(),
            employee_position: employee.position.clone(),
            created_at: request.created_at,
            approved_at,
            duration_days: record.duration_days,
            sla_days: record.sla_days,
            overdue: record.overdue,
        });
    }
    rows
}

pub fn render_csv(rows: &[ReportRow]) -> Result<String, ReportError> {
    let mut buffer = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        writer.write_record([
            "id",
            "type",
            "employee",
            "created_at",
            "approved_at",
            "duration_days",
            "sla_days",
            "overdue",
        ])?;
        for row in rows {
            writer.write_record([
                row.request_id.clone(),
                row.type_label.to_string(),
                row.employee_name.clone(),
                row.created_at.to_rfc3339(),
                row.approved_at.to_rfc3339(),
                format!("{:.2}", round2(row.duration_days)),
                row.sla_days.to_string(),
                if row.overdue { "yes" } else { "no" }.to_string(),
            ])?;
        }
        writer.flush()?;
    }
    Ok(String::from_utf8(buffer)?)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRef {
    pub id: String,
    pub name: String,
    pub position: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructuredRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub type_label: String,
    pub employee: EmployeeRef,
    pub created_at: DateTime<Utc>,
    pub approved_at: DateTime<Utc>,
    pub duration_days: f64,
    pub sla_days: u32,
    pub overdue: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructuredReport {
    pub generated_at: DateTime<Utc>,
    pub filters: RequestFilters,
    pub total: usize,
    pub requests: Vec<StructuredRequest>,
}

pub fn build_structured(
    rows: &[ReportRow],
    filters: &RequestFilters,
    generated_at: DateTime<Utc>,
) -> StructuredReport {
    let requests: Vec<StructuredRequest> = rows
        .iter()
        .map(|row| StructuredRequest {
            id: row.request_id.clone(),
            type_label: row.type_label.to_string(),
            employee: EmployeeRef {
                id: row.employee_id.clone(),
                name: row.employee_name.clone(),
                position: row.employee_position.clone(),
            },
            created_at: row.created_at,
            approved_at: row.approved_at,
            duration_days: round2(row.duration_days),
            sla_days: row.sla_days,
            overdue: row.overdue,
        })
        .collect();

    StructuredReport { generated_at, filters: filters.clone(), total: requests.len(), requests }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
