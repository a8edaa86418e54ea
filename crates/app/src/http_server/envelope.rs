//! The JSON envelope every API response is wrapped in.
//!
//! Success: `{"msg": "OK", "data": ...}`. Failure: `{"msg": "<reason>"}`.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};

pub const OK_MSG: &str = "OK";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope<T> {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            msg: OK_MSG.to_string(),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            data: None,
        }
    }
}

/// 200 with `data` wrapped in the success envelope.
pub fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(Envelope::ok(data))).into_response()
}

/// `status` with a data-less envelope carrying `msg`.
pub fn failure(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(Envelope::message(msg))).into_response()
}
