use std::sync::Arc;

use super::auth::JwtAuth;
use crate::ledger::PgLedgerStore;
use crate::permission::PermissionGate;
use crate::transfer::TransferService;

pub type LedgerService = TransferService<PgLedgerStore, dyn PermissionGate>;

/// Gateway shared state
pub struct AppState {
    pub service: LedgerService,
    pub auth: JwtAuth,
    /// Pass storage error detail through to clients (development only)
    pub expose_internal_errors: bool,
}

impl AppState {
    pub fn new(store: PgLedgerStore, gate: Arc<dyn PermissionGate>, jwt_secret: &str) -> Self {
        Self {
            service: TransferService::new(Arc::new(store), gate),
            auth: JwtAuth::new(jwt_secret),
            expose_internal_errors: false,
        }
    }

    pub fn with_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }
}
