use axum::extract::State;
use axum::http::StatusCode;

use super::ApiError;
use crate::account::ports::AccountServicePort;
use crate::inbound::http::router::AppState;

pub async fn purge_principals(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state
        .account_service
        .purge_principals()
        .await
        .map_err(|e| state.errors.normalize(e))?;

    Ok(StatusCode::NO_CONTENT)
}
