//! Health check handlers

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: CheckResult,
    pub event_subscriptions: usize,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: rkive_common::VERSION,
    })
}

/// Readiness probe; 503 while the database is unreachable
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let start = std::time::Instant::now();

    let database = match state.db.ping().await {
        Ok(()) => CheckResult {
            status: "up",
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => CheckResult {
            status: "down",
            latency_ms: None,
            error: Some(e.to_string()),
        },
    };

    let ready = database.status == "up";
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if ready { "ready" } else { "not_ready" },
            checks: HealthChecks {
                database,
                event_subscriptions: state.events.live_subscriptions(),
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body.status, "healthy");
    }

    #[tokio::test]
    async fn test_ready_when_database_answers() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }]);

        let (status, Json(body)) = ready(State(state_with(db))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.checks.database.status, "up");
    }

    #[tokio::test]
    async fn test_not_ready_when_database_fails() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_errors([DbErr::Custom("connection refused".to_string())]);

        let (status, Json(body)) = ready(State(state_with(db))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "not_ready");
        assert!(body.checks.database.error.is_some());
    }
}
