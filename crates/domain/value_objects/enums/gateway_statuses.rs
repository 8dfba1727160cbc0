use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Gateway-agnostic view of an order's state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStatus {
    Success,
    Failure,
    Pending,
}

// Every vocabulary the gateway has used across API versions, status codes and
// status names alike. Keys are compared upper-cased.
const STATUS_VOCABULARY: &[(&str, GatewayStatus)] = &[
    ("CP", GatewayStatus::Success),
    ("Y", GatewayStatus::Success),
    ("00", GatewayStatus::Success),
    ("PAID", GatewayStatus::Success),
    ("COMPLETED", GatewayStatus::Success),
    ("SUCCESS", GatewayStatus::Success),
    ("N", GatewayStatus::Failure),
    ("FL", GatewayStatus::Failure),
    ("CL", GatewayStatus::Failure),
    ("FAIL", GatewayStatus::Failure),
    ("FAILED", GatewayStatus::Failure),
    ("CANCELLED", GatewayStatus::Failure),
    ("EXPIRED", GatewayStatus::Failure),
    ("PE", GatewayStatus::Pending),
    ("TC", GatewayStatus::Pending),
    ("PENDING", GatewayStatus::Pending),
    ("WAITING", GatewayStatus::Pending),
];

impl GatewayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayStatus::Success => "success",
            GatewayStatus::Failure => "fail",
            GatewayStatus::Pending => "pending",
        }
    }

    /// Looks a single raw code or name up in the vocabulary table.
    pub fn from_vendor(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_uppercase();
        STATUS_VOCABULARY
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, status)| *status)
    }

    /// Combines the code and name a gateway reports. One success match is
    /// enough; otherwise any recognised failure wins; anything else is pending.
    pub fn resolve(status_code: Option<&str>, status_name: Option<&str>) -> Self {
        let statuses: Vec<GatewayStatus> = [status_code, status_name]
            .into_iter()
            .flatten()
            .filter_map(GatewayStatus::from_vendor)
            .collect();

        if statuses.contains(&GatewayStatus::Success) {
            GatewayStatus::Success
        } else if statuses.contains(&GatewayStatus::Failure) {
            GatewayStatus::Failure
        } else {
            GatewayStatus::Pending
        }
    }
}

impl Display for GatewayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
