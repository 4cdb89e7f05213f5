use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::adapter::AdapterError;
use crate::service::cipher::CipherError;

#[derive(Debug)]
pub enum BaseError {
    ParamInvalid(Option<String>),
    NotFound(Option<String>),
    DatabaseFatal(Option<String>),
    DatabaseDup(Option<String>),
    Conflict(Option<String>),
    AdapterFailure(Option<String>),
    CipherFailure(Option<String>),
    ImportEmpty(Option<String>),
}

impl BaseError {
    fn code(&self) -> i32 {
        match self {
            BaseError::ParamInvalid(_) => 1001,
            BaseError::NotFound(_) => 1002,
            BaseError::DatabaseFatal(_) => 1100,
            BaseError::DatabaseDup(_) => 1101,
            BaseError::Conflict(_) => 1102,
            BaseError::AdapterFailure(_) => 1201,
            BaseError::CipherFailure(_) => 1202,
            BaseError::ImportEmpty(_) => 1203,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            BaseError::ParamInvalid(_) => StatusCode::BAD_REQUEST,
            BaseError::NotFound(_) => StatusCode::NOT_FOUND,
            BaseError::DatabaseFatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BaseError::DatabaseDup(_) => StatusCode::BAD_REQUEST,
            BaseError::Conflict(_) => StatusCode::CONFLICT,
            BaseError::AdapterFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BaseError::CipherFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BaseError::ImportEmpty(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        let (detail, fallback) = match self {
            BaseError::ParamInvalid(msg) => (msg, "invalid parameter"),
            BaseError::NotFound(msg) => (msg, "not found"),
            BaseError::DatabaseFatal(msg) => (msg, "database error"),
            BaseError::DatabaseDup(msg) => (msg, "duplicate record"),
            BaseError::Conflict(msg) => (msg, "conflict"),
            BaseError::AdapterFailure(msg) => (msg, "adapter failure"),
            BaseError::CipherFailure(msg) => (msg, "cipher failure"),
            BaseError::ImportEmpty(msg) => (msg, "nothing to import"),
        };
        detail.clone().unwrap_or_else(|| fallback.to_string())
    }
}

impl std::fmt::Display for BaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl IntoResponse for BaseError {
    fn into_response(self) -> Response {
        let body = json!({
            "code": self.code(),
            "msg": self.message(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<diesel::result::Error> for BaseError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => BaseError::NotFound(None),
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => BaseError::DatabaseDup(Some(info.message().to_string())),
            err => BaseError::DatabaseFatal(Some(err.to_string())),
        }
    }
}

impl From<CipherError> for BaseError {
    fn from(err: CipherError) -> Self {
        BaseError::CipherFailure(Some(err.to_string()))
    }
}

impl From<AdapterError> for BaseError {
    fn from(err: AdapterError) -> Self {
        BaseError::AdapterFailure(Some(err.to_string()))
    }
}
