use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSession;
use crate::account::errors::ValidationError;
use crate::account::models::ChangePasswordCommand;
use crate::account::ports::AccountServicePort;
use crate::inbound::http::middleware::CurrentPrincipal;
use crate::inbound::http::router::AppState;

pub async fn update_password(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Json(body): Json<UpdatePasswordRequest>,
) -> Result<ApiSession, ApiError> {
    let command = body
        .try_into_command()
        .map_err(|e| state.errors.normalize(e.into()))?;

    let session = state
        .account_service
        .change_password(&principal.id, command)
        .await
        .map_err(|e| state.errors.normalize(e))?;

    Ok(ApiSession::new(
        StatusCode::OK,
        state.cookies.session_cookie(&session.token),
        &session,
    ))
}

/// HTTP request body for changing the password (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdatePasswordRequest {
    #[serde(rename = "oldPassword")]
    old_password: Option<String>,
    #[serde(rename = "newPassword")]
    new_password: Option<String>,
    #[serde(rename = "passwordConfirm")]
    password_confirm: Option<String>,
}

impl UpdatePasswordRequest {
    fn try_into_command(self) -> Result<ChangePasswordCommand, ValidationError> {
        ChangePasswordCommand::parse(
            self.old_password,
            self.new_password,
            self.password_confirm,
        )
    }
}
