use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub success: bool,
    pub message: String,
    pub code: Option<String>,
}

fn error_body(status: StatusCode, msg: &str) -> (StatusCode, Json<JsonResponse>) {
    (
        status,
        Json(JsonResponse {
            status: "error".to_string(),
            success: false,
            message: msg.to_string(),
            code: None,
        }),
    )
}

impl JsonResponse {
    /// Provider acknowledgement. Gateways only look at the status code; the body is `{"ok": true}`.
    pub fn ack() -> impl IntoResponse {
        (StatusCode::OK, Json(json!({ "ok": true })))
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(JsonResponse {
                status: "success".to_string(),
                success: true,
                message: msg.to_string(),
                code: None,
            }),
        )
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        error_body(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        error_body(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> impl IntoResponse {
        error_body(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn too_many_requests(msg: &str) -> impl IntoResponse {
        error_body(StatusCode::TOO_MANY_REQUESTS, msg)
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        error_body(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn service_unavailable(msg: &str) -> impl IntoResponse {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(JsonResponse {
                status: "error".to_string(),
                success: false,
                message: msg.to_string(),
                code: Some("not_configured".to_string()),
            }),
        )
    }
}
