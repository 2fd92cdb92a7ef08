//! Transfer handlers

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use tracing::{debug, error};

use super::super::auth::Caller;
use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, TransferCreatedData, TransferData, created, ok};
use crate::core_types::CompanyId;
use crate::error::LedgerError;
use crate::transfer::{Initiator, TransferId, TransferQuery, TransferRequest};

/// Log at a level matching the failure, then map it for the client
fn ledger_error(state: &AppState, err: LedgerError) -> ApiError {
    if err.is_client_error() {
        debug!(code = err.code(), "Request rejected: {}", err);
    } else {
        error!(code = err.code(), "Ledger operation failed: {}", err);
    }
    ApiError::from_ledger(&err, state.expose_internal_errors)
}

fn parse_transfer_id(raw: &str) -> Result<TransferId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid transfer ID format"))
}

/// Create a transfer on behalf of `company_id`
///
/// POST /api/v1/companies/{company_id}/transfers
#[utoipa::path(
    post,
    path = "/api/v1/companies/{company_id}/transfers",
    params(
        ("company_id" = i64, Path, description = "Initiating company")
    ),
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Transfer completed or held for approval", body = TransferCreatedData),
        (status = 400, description = "Validation failed or insufficient balance"),
        (status = 401, description = "Authentication failed"),
        (status = 403, description = "Missing capability"),
        (status = 404, description = "Company or account not found")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transfer"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(company_id): Path<CompanyId>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<TransferCreatedData> {
    let initiator = Initiator::new(caller.user_id, company_id);
    let outcome = state
        .service
        .create_transfer(initiator, req)
        .await
        .map_err(|e| ledger_error(&state, e))?;
    created(outcome.into())
}

/// Transfer history of one company, newest first
///
/// GET /api/v1/companies/{company_id}/transfers
#[utoipa::path(
    get,
    path = "/api/v1/companies/{company_id}/transfers",
    params(
        ("company_id" = i64, Path, description = "Company whose history to list"),
        TransferQuery
    ),
    responses(
        (status = 200, description = "Transfers", body = Vec<TransferData>),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Authentication failed"),
        (status = 403, description = "Missing capability")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transfer"
)]
pub async fn list_transfers(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(company_id): Path<CompanyId>,
    Query(query): Query<TransferQuery>,
) -> ApiResult<Vec<TransferData>> {
    let transfers = state
        .service
        .list_transfers(caller.user_id, company_id, &query)
        .await
        .map_err(|e| ledger_error(&state, e))?;
    ok(transfers.into_iter().map(TransferData::from).collect())
}

/// GET /api/v1/transfers/{transfer_id}
#[utoipa::path(
    get,
    path = "/api/v1/transfers/{transfer_id}",
    params(
        ("transfer_id" = String, Path, description = "Transfer ID (ULID format)")
    ),
    responses(
        (status = 200, description = "Transfer", body = TransferData),
        (status = 400, description = "Invalid transfer ID format"),
        (status = 403, description = "Caller is not a party and cannot view either company"),
        (status = 404, description = "Transfer not found")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transfer"
)]
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(transfer_id): Path<String>,
) -> ApiResult<TransferData> {
    let transfer_id = parse_transfer_id(&transfer_id)?;
    let transfer = state
        .service
        .get_transfer(caller.user_id, &transfer_id)
        .await
        .map_err(|e| ledger_error(&state, e))?;
    ok(transfer.into())
}

/// POST /api/v1/transfers/{transfer_id}/approve
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{transfer_id}/approve",
    params(
        ("transfer_id" = String, Path, description = "Pending transfer ID")
    ),
    responses(
        (status = 200, description = "Transfer completed", body = TransferData),
        (status = 400, description = "Transfer already processed"),
        (status = 403, description = "Caller cannot approve for the receiving company"),
        (status = 404, description = "Transfer not found")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transfer"
)]
pub async fn approve_transfer(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(transfer_id): Path<String>,
) -> ApiResult<TransferData> {
    let transfer_id = parse_transfer_id(&transfer_id)?;
    let transfer = state
        .service
        .approve_transfer(caller.user_id, &transfer_id)
        .await
        .map_err(|e| ledger_error(&state, e))?;
    ok(transfer.into())
}

/// POST /api/v1/transfers/{transfer_id}/reject
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{transfer_id}/reject",
    params(
        ("transfer_id" = String, Path, description = "Pending transfer ID")
    ),
    responses(
        (status = 200, description = "Transfer rejected, sender refunded", body = TransferData),
        (status = 400, description = "Transfer already processed"),
        (status = 403, description = "Caller cannot reject for the receiving company"),
        (status = 404, description = "Transfer not found")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transfer"
)]
pub async fn reject_transfer(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(transfer_id): Path<String>,
) -> ApiResult<TransferData> {
    let transfer_id = parse_transfer_id(&transfer_id)?;
    let transfer = state
        .service
        .reject_transfer(caller.user_id, &transfer_id)
        .await
        .map_err(|e| ledger_error(&state, e))?;
    ok(transfer.into())
}
