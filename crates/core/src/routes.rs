use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::request::RequestType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredRole {
    Employee,
    Manager,
    Hr,
}

impl RequiredRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Manager => "manager",
            Self::Hr => "hr",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "employee" => Some(Self::Employee),
            "manager" => Some(Self::Manager),
            "hr" => Some(Self::Hr),
            _ => None,
        }
    }
}

/// One configured approval step, keyed by `(request_type, step_no)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    pub request_type: RequestType,
    pub step_no: u32,
    pub required_role: RequiredRole,
    pub sla_days: u32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route step numbers must start at 1, got {found} for `{request_type:?}`")]
    MissingFirstStep { request_type: RequestType, found: u32 },
    #[error("duplicate route step {step_no} for `{request_type:?}`")]
    DuplicateStep { request_type: RequestType, step_no: u32 },
    #[error("route for `{request_type:?}` jumps from step {previous} to {found}; steps must be dense")]
    GappedRoute { request_type: RequestType, previous: u32, found: u32 },
    #[error("route step {step_no} for `{request_type:?}` has a zero-day SLA")]
    ZeroSla { request_type: RequestType, step_no: u32 },
}

/// Immutable, validated route configuration.
///
/// Validation rejects gapped step sequences outright: a gap would make the
/// engine terminate the route early, which is a configuration mistake rather
/// than a skip feature. Engines built on this table only ever see dense
/// `1..=N` sequences.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteTable {
    steps: BTreeMap<RequestType, Vec<RouteStep>>,
}

impl RouteTable {
    pub fn new(mut steps: Vec<RouteStep>) -> Result<Self, RouteError> {
        steps.sort_by_key(|step| (step.request_type, step.step_no));

        let mut by_type: BTreeMap<RequestType, Vec<RouteStep>> = BTreeMap::new();
        for step in steps {
            by_type.entry(step.request_type).or_default().push(step);
        }

        for (request_type, route) in &by_type {
            let mut previous: Option<u32> = None;
            for step in route {
                if step.sla_days == 0 {
                    return Err(RouteError::ZeroSla {
                        request_type: *request_type,
                        step_no: step.step_no,
                    });
                }
                match previous {
                    None if step.step_no != 1 => {
                        return Err(RouteError::MissingFirstStep {
                            request_type: *request_type,
                            found: step.step_no,
                        });
                    }
                    Some(prev) if step.step_no == prev => {
                        return Err(RouteError::DuplicateStep {
                            request_type: *request_type,
                            step_no: step.step_no,
                        });
                    }
                    Some(prev) if step.step_no != prev + 1 => {
                        return Err(RouteError::GappedRoute {
                            request_type: *request_type,
                            previous: prev,
                            found: step.step_no,
                        });
                    }
                    _ => {}
                }
                previous = Some(step.step_no);
            }
        }

        Ok(Self { steps: by_type })
    }

    pub fn step(&self, request_type: RequestType, step_no: u32) -> Option<&RouteStep> {
        self.steps
            .get(&request_type)?
            .iter()
            .find(|step| step.step_no == step_no)
    }

    pub fn steps_for(&self, request_type: RequestType) -> &[RouteStep] {
        self.steps.get(&request_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_route(&self, request_type: RequestType) -> bool {
        !self.steps_for(request_type).is_empty()
    }

    /// Sum of the allotted days across the whole configured route,
    /// independent of which steps a request actually visited.
    pub fn total_sla_days(&self, request_type: RequestType) -> u32 {
        self.steps_for(request_type).iter().map(|step| step.sla_days).sum()
    }
}
