//! Readiness: the default bucket must answer a listing in time.

use std::time::Duration;

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use tokio::time::timeout;

use super::data_source::StateDataSource;

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct Readiness {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[tracing::instrument(skip_all)]
pub async fn handler(source: StateDataSource) -> Response {
    let outcome = match timeout(CHECK_TIMEOUT, source.is_ready()).await {
        Ok(checked) => checked.map_err(|e| e.to_string()),
        Err(_) => Err(format!(
            "store check timed out after {}s",
            CHECK_TIMEOUT.as_secs()
        )),
    };

    match outcome {
        Ok(()) => {
            let ready = Readiness {
                status: "ok",
                message: None,
            };
            (StatusCode::OK, Json(ready)).into_response()
        }
        Err(message) => {
            tracing::warn!("not ready: {}", message);
            let not_ready = Readiness {
                status: "failure",
                message: Some(message),
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(not_ready)).into_response()
        }
    }
}
