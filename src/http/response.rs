//! Health response rendering.
//!
//! # Body
//! ```text
//! 200 {"status":"OK","errors":[]}
//! 500 {"status":"ERROR","errors":["unsuccessful healthcheck for db: ..."]}
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::health::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Ok,
    Error,
}

/// JSON body of `GET /healthcheck`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub errors: Vec<String>,
}

impl HealthReport {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let status = if snapshot.is_empty() {
            OverallStatus::Ok
        } else {
            OverallStatus::Error
        };
        Self {
            status,
            errors: snapshot.messages(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.status {
            OverallStatus::Ok => StatusCode::OK,
            OverallStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HealthReport {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ProbeError;
    use std::collections::BTreeMap;

    #[test]
    fn test_empty_snapshot_is_ok() {
        let report = HealthReport::from_snapshot(&Snapshot::default());
        assert_eq!(report.status_code(), StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"status": "OK", "errors": []})
        );
    }

    #[test]
    fn test_failures_are_listed() {
        let mut failures = BTreeMap::new();
        failures.insert("redis".to_string(), ProbeError::failed("timeout"));
        failures.insert("mongo".to_string(), ProbeError::failed("auth failed"));

        let report = HealthReport::from_snapshot(&Snapshot::new(failures));
        assert_eq!(report.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "status": "ERROR",
                "errors": [
                    "unsuccessful healthcheck for mongo: auth failed",
                    "unsuccessful healthcheck for redis: timeout",
                ]
            })
        );
    }
}
