use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::request::{ApprovalRequest, RequestStatus, RequestType};
use crate::routes::RouteTable;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Wall-clock approval latency in fractional days. Defined only for
/// requests that reached terminal approval.
pub fn duration_days(request: &ApprovalRequest) -> Option<f64> {
    let approved_at = request.approved_at?;
    let elapsed = approved_at - request.created_at;
    Some(elapsed.num_seconds() as f64 / SECONDS_PER_DAY)
}

/// SLA annotation for a single approved request.
///
/// `sla_days` spans the entire configured route for the request's type,
/// independent of which steps were actually visited.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlaRecord {
    pub duration_days: f64,
    pub sla_days: u32,
    pub overdue: bool,
}

pub fn annotate(request: &ApprovalRequest, routes: &RouteTable) -> Option<SlaRecord> {
    if request.status != RequestStatus::Approved {
        return None;
    }
    let duration = duration_days(request)?;
    let sla_days = routes.total_sla_days(request.request_type);
    Some(SlaRecord { duration_days: duration, sla_days, overdue: duration > f64::from(sla_days) })
}

/// Filters applied before aggregation. All criteria compose with AND;
/// the date bounds are inclusive and match on the `created_at` calendar day.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilters {
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub request_type: Option<RequestType>,
    pub status: Option<RequestStatus>,
}

impl RequestFilters {
    pub fn matches(&self, request: &ApprovalRequest) -> bool {
        let created_on = request.created_at.date_naive();
        if let Some(from) = self.created_from {
            if created_on < from {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if created_on > to {
                return false;
            }
        }
        if let Some(request_type) = self.request_type {
            if request.request_type != request_type {
                return false;
            }
        }
        if let Some(status) = self.status {
            if request.status != status {
                return false;
            }
        }
        true
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub count: usize,
    pub avg_duration: f64,
    pub median_duration: f64,
    pub on_time_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeStats {
    pub request_type: RequestType,
    pub stats: AggregateStats,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub overall: AggregateStats,
    /// Per-type breakdown, present only for types with at least one
    /// qualifying request.
    pub by_type: Vec<TypeStats>,
}

/// Aggregate timing metrics over the filtered approved requests.
///
/// Only requests in `approved` status with a recorded `approved_at`
/// qualify; everything mid-workflow or rejected is excluded regardless of
/// the caller's filters.
pub fn aggregate(
    requests: &[ApprovalRequest],
    routes: &RouteTable,
    filters: &RequestFilters,
) -> AggregateReport {
    let mut qualifying: Vec<(RequestType, SlaRecord)> = Vec::new();
    for request in requests {
        if !filters.matches(request) {
            continue;
        }
        if let Some(record) = annotate(request, routes) {
            qualifying.push((request.request_type, record));
        }
    }

    let overall = stats_over(qualifying.iter().map(|(_, record)| *record));

    let mut by_type = Vec::new();
    for request_type in [RequestType::Vacation, RequestType::BusinessTrip] {
        let records: Vec<SlaRecord> = qualifying
            .iter()
            .filter(|(ty, _)| *ty == request_type)
            .map(|(_, record)| *record)
            .collect();
        if !records.is_empty() {
            by_type.push(TypeStats { request_type, stats: stats_over(records.into_iter()) });
        }
    }

    AggregateReport { overall, by_type }
}

fn stats_over(records: impl Iterator<Item = SlaRecord>) -> AggregateStats {
    let records: Vec<SlaRecord> = records.collect();
    let count = records.len();
    if count == 0 {
        return AggregateStats::default();
    }

    let mut durations: Vec<f64> = records.iter().map(|record| record.duration_days).collect();
    durations.sort_by(|left, right| left.total_cmp(right));

    let avg_duration = durations.iter().sum::<f64>() / count as f64;
    // Upper median: the element at index n/2, kept bit-for-bit compatible
    // with the reports this replaces.
    let median_duration = durations[count / 2];
    let on_time = records.iter().filter(|record| !record.overdue).count();
    let on_time_percent = 100.0 * on_time as f64 / count as f64;

    AggregateStats { count, avg_duration, median_duration, on_time_percent }
}
