//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `ApiError`: Error half of every handler result
//! - `error_codes`: Standard error code constants

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::LedgerError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

// ============================================================================
// Handler Result
// ============================================================================

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// 200 with data
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 with data
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn missing_auth(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error_codes::MISSING_AUTH, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED, msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }

    /// Map a ledger error onto status, code and message.
    ///
    /// Storage failures keep their detail in the log and only reach the
    /// client when `expose_internal` is set.
    pub fn from_ledger(err: &LedgerError, expose_internal: bool) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let msg = match err {
            LedgerError::StorageFailure(_) if !expose_internal => {
                "Internal storage error".to_string()
            }
            other => other.to_string(),
        };
        Self::new(status, error_codes::for_ledger(err), msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse::<()>::error(self.code, self.msg)),
        )
            .into_response()
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    use crate::error::LedgerError;

    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;
    pub const INVALID_AMOUNT: i32 = 1003;
    pub const INVALID_CURRENCY: i32 = 1004;
    pub const CURRENCY_MISMATCH: i32 = 1005;
    pub const INVALID_TRANSFER_TYPE: i32 = 1006;
    pub const INVALID_SCOPES_FOR_TYPE: i32 = 1007;
    pub const MISSING_REQUIRED_FIELD: i32 = 1008;
    pub const SAME_ENTITY_NOT_ALLOWED: i32 = 1009;
    pub const ALREADY_PROCESSED: i32 = 1010;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const INSUFFICIENT_PERMISSIONS: i32 = 2003;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4004;

    // Server errors (5xxx)
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const STORAGE_FAILURE: i32 = 5002;

    pub fn for_ledger(err: &LedgerError) -> i32 {
        match err {
            LedgerError::InvalidAmount(_) => INVALID_AMOUNT,
            LedgerError::InvalidCurrency(_) => INVALID_CURRENCY,
            LedgerError::InvalidTransferType(_) => INVALID_TRANSFER_TYPE,
            LedgerError::CurrencyMismatch { .. } => CURRENCY_MISMATCH,
            LedgerError::InsufficientBalance { .. } => INSUFFICIENT_BALANCE,
            LedgerError::InvalidScopesForType { .. } => INVALID_SCOPES_FOR_TYPE,
            LedgerError::MissingRequiredField(_) => MISSING_REQUIRED_FIELD,
            LedgerError::SameEntityNotAllowed(_) => SAME_ENTITY_NOT_ALLOWED,
            LedgerError::InvalidQuery(_) => INVALID_PARAMETER,
            LedgerError::InsufficientPermissions(_) => INSUFFICIENT_PERMISSIONS,
            LedgerError::NotFound(_) => NOT_FOUND,
            LedgerError::AlreadyProcessed { .. } => ALREADY_PROCESSED,
            LedgerError::StorageFailure(_) => STORAGE_FAILURE,
        }
    }
}
