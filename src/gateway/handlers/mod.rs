//! HTTP handlers
//!
//! - [`health`]: Liveness / database ping
//! - [`transfer`]: Create, list, read, approve and reject transfers

pub mod health;
pub mod transfer;

pub use health::{HealthResponse, health_check};
pub use transfer::{
    approve_transfer, create_transfer, get_transfer, list_transfers, reject_transfer,
};

