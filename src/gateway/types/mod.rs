//! Gateway types module
//!
//! ## Submodules
//! - [`response`]: Response wrapper, `ApiError` and error codes
//! - [`transfer`]: Transfer DTOs

pub mod response;
pub mod transfer;

pub use response::{ApiError, ApiResponse, ApiResult, created, error_codes, ok};
pub use transfer::{TransferCreatedData, TransferData};
