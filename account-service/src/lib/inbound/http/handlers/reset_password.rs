use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSession;
use crate::account::errors::ValidationError;
use crate::account::models::ResetPasswordCommand;
use crate::account::ports::AccountServicePort;
use crate::inbound::http::router::AppState;

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<ApiSession, ApiError> {
    let command = body
        .try_into_command()
        .map_err(|e| state.errors.normalize(e.into()))?;

    let session = state
        .account_service
        .reset_password(&token, command)
        .await
        .map_err(|e| state.errors.normalize(e))?;

    Ok(ApiSession::new(
        StatusCode::OK,
        state.cookies.session_cookie(&session.token),
        &session,
    ))
}

/// HTTP request body for redeeming a reset token (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResetPasswordRequest {
    password: Option<String>,
    #[serde(rename = "passwordConfirm")]
    password_confirm: Option<String>,
}

impl ResetPasswordRequest {
    fn try_into_command(self) -> Result<ResetPasswordCommand, ValidationError> {
        ResetPasswordCommand::parse(self.password, self.password_confirm)
    }
}
