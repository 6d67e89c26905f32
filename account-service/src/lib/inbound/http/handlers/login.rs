use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSession;
use crate::account::errors::AccountError;
use crate::account::models::LoginCommand;
use crate::account::ports::AccountServicePort;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiSession, ApiError> {
    let command = body
        .try_into_command()
        .map_err(|e| state.errors.normalize(e))?;

    let session = state
        .account_service
        .login(command)
        .await
        .map_err(|e| state.errors.normalize(e))?;

    Ok(ApiSession::new(
        StatusCode::OK,
        state.cookies.session_cookie(&session.token),
        &session,
    ))
}

/// HTTP request body for login (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

impl LoginRequest {
    fn try_into_command(self) -> Result<LoginCommand, AccountError> {
        let email = self.email.filter(|e| !e.trim().is_empty());
        let password = self.password.filter(|p| !p.is_empty());

        match (email, password) {
            (Some(email), Some(password)) => Ok(LoginCommand::new(email, password)),
            _ => Err(AccountError::MissingCredentials),
        }
    }
}
