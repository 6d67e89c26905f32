use axum::http::StatusCode;
use axum::Extension;

use super::AccountData;
use super::ApiSuccess;
use crate::inbound::http::middleware::CurrentPrincipal;

pub async fn me(
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
) -> ApiSuccess<AccountData> {
    ApiSuccess::new(StatusCode::OK, AccountData::from(&principal))
}
