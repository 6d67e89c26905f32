use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use crate::account::ports::AccountServicePort;
use crate::inbound::http::router::AppState;

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<ApiSuccess<()>, ApiError> {
    // A missing email behaves like an unknown one.
    let email = body.email.unwrap_or_default();

    state
        .account_service
        .forgot_password(&email)
        .await
        .map_err(|e| state.errors.normalize(e))?;

    Ok(ApiSuccess::with_message(
        StatusCode::OK,
        "Email sent successfully".to_string(),
    ))
}

/// HTTP request body for requesting a password reset (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForgotPasswordRequest {
    email: Option<String>,
}
