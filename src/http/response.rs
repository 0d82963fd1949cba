//! Response mapping.
//!
//! Successful round trips return the peer's reply object as JSON. Failures
//! map to gateway-class status codes:
//!
//! | error             | status |
//! |-------------------|--------|
//! | `NoPeerAvailable` | 503    |
//! | `Abandoned`       | 503    |
//! | `SendFailure`     | 502    |
//! | `Timeout`         | 504    |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::bridge::{BridgeError, ReplyEnvelope};

impl BridgeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::NoPeerAvailable | BridgeError::Abandoned => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::SendFailure { .. } => StatusCode::BAD_GATEWAY,
            BridgeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// `200 OK` with the reply object as `application/json`.
pub fn reply_response(reply: ReplyEnvelope) -> Response {
    Json(reply.into_body()).into_response()
}
