use auth::TokenError;
use axum::http::header;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::account::errors::AccountError;
use crate::account::errors::StoreError;
use crate::account::models::Principal;
use crate::account::models::Role;
use crate::account::models::Session;
use crate::config::Environment;

pub mod forgot_password;
pub mod login;
pub mod me;
pub mod purge_principals;
pub mod reset_password;
pub mod signup;
pub mod update_password;

const STATUS_SUCCESS: &str = "success";
const STATUS_FAIL: &str = "fail";
const STATUS_ERROR: &str = "error";

const GENERIC_SERVER_ERROR: &str = "Something went wrong";

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(data)))
    }

    pub fn with_message(status: StatusCode, message: String) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new_message(message)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// Successful response that also establishes the session cookie.
#[derive(Debug, Clone)]
pub struct ApiSession(StatusCode, String, Json<ApiResponseBody<AccountData>>);

impl ApiSession {
    pub fn new(status: StatusCode, cookie: String, session: &Session) -> Self {
        let body = ApiResponseBody::new_session(
            session.token.clone(),
            AccountData::from(&session.principal),
        );
        ApiSession(status, cookie, Json(body))
    }
}

impl IntoResponse for ApiSession {
    fn into_response(self) -> Response {
        let ApiSession(status, cookie, body) = self;
        let mut response = (status, body).into_response();
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        response
    }
}

/// Response envelope: `status` is always present, the other fields only
/// when the endpoint produces them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: STATUS_SUCCESS,
            token: None,
            data: Some(data),
            message: None,
        }
    }

    pub fn new_message(message: String) -> Self {
        Self {
            status: STATUS_SUCCESS,
            token: None,
            data: None,
            message: Some(message),
        }
    }

    pub fn new_session(token: String, data: T) -> Self {
        Self {
            status: STATUS_SUCCESS,
            token: Some(token),
            data: Some(data),
            message: None,
        }
    }
}

/// Data payload of auth responses, matching the `data.user` shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountData {
    pub user: PrincipalData,
}

impl From<&Principal> for AccountData {
    fn from(principal: &Principal) -> Self {
        Self {
            user: PrincipalData::from(principal),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalData {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&Principal> for PrincipalData {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.to_string(),
            name: principal.name.clone(),
            email: principal.email.as_str().to_string(),
            role: principal.role,
            created_at: principal.created_at,
        }
    }
}

/// Wire-level error: status code plus the message the caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status_code: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.status_code.is_client_error() {
            STATUS_FAIL
        } else {
            STATUS_ERROR
        };

        let body = ApiErrorBody {
            status,
            message: self.message,
            detail: self.detail,
        };

        (self.status_code, Json(body)).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ApiErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// Maps the closed domain error set onto the wire contract.
///
/// One exhaustive match decides status code and client message; error
/// strings are never inspected. Development mode returns the underlying
/// message plus a debug rendering instead of the normalized message.
#[derive(Debug, Clone)]
pub struct ErrorNormalizer {
    mode: Environment,
}

impl ErrorNormalizer {
    pub fn new(mode: Environment) -> Self {
        Self { mode }
    }

    pub fn normalize(&self, err: AccountError) -> ApiError {
        let (status_code, message) = Self::classify(&err);

        if status_code.is_server_error() {
            tracing::error!(error = ?err, "Request failed");
        }

        match self.mode {
            Environment::Development => ApiError {
                status_code,
                message: err.to_string(),
                detail: Some(format!("{:?}", err)),
            },
            Environment::Production => ApiError {
                status_code,
                message,
                detail: None,
            },
        }
    }

    /// The single mapping from domain failures to HTTP outcomes.
    fn classify(err: &AccountError) -> (StatusCode, String) {
        match err {
            AccountError::MissingCredentials
            | AccountError::Validation(_)
            | AccountError::ResetTokenInvalid => (StatusCode::BAD_REQUEST, err.to_string()),

            AccountError::Store(StoreError::Duplicate { .. })
            | AccountError::Store(StoreError::Malformed { .. }) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }

            AccountError::InvalidCredentials
            | AccountError::NotLoggedIn
            | AccountError::PrincipalGone
            | AccountError::StalePassword
            | AccountError::WrongCurrentPassword => (StatusCode::UNAUTHORIZED, err.to_string()),

            AccountError::Token(TokenError::Expired) => (
                StatusCode::UNAUTHORIZED,
                "Login session expired. Please login again".to_string(),
            ),
            AccountError::Token(TokenError::Invalid(_)) => (
                StatusCode::UNAUTHORIZED,
                "Invalid Token. Please login again".to_string(),
            ),
            AccountError::Token(TokenError::Encoding(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERIC_SERVER_ERROR.to_string(),
            ),

            AccountError::Forbidden => (StatusCode::FORBIDDEN, err.to_string()),

            AccountError::UnknownEmail | AccountError::RouteNotFound(_) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }

            // Mail failures are operational: the caller is told what
            // happened even in production.
            AccountError::Mail(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),

            AccountError::Hash(_) | AccountError::Store(StoreError::Database(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERIC_SERVER_ERROR.to_string(),
            ),
        }
    }
}
