use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSession;
use crate::account::errors::ValidationError;
use crate::account::models::SignupCommand;
use crate::account::ports::AccountServicePort;
use crate::inbound::http::router::AppState;

pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<ApiSession, ApiError> {
    let command = body
        .try_into_command()
        .map_err(|e| state.errors.normalize(e.into()))?;

    let session = state
        .account_service
        .signup(command)
        .await
        .map_err(|e| state.errors.normalize(e))?;

    Ok(ApiSession::new(
        StatusCode::CREATED,
        state.cookies.session_cookie(&session.token),
        &session,
    ))
}

/// HTTP request body for account signup (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignupRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    #[serde(rename = "passwordConfirm")]
    password_confirm: Option<String>,
    role: Option<String>,
}

impl SignupRequest {
    fn try_into_command(self) -> Result<SignupCommand, ValidationError> {
        SignupCommand::parse(
            self.name,
            self.email,
            self.password,
            self.password_confirm,
            self.role,
        )
    }
}
