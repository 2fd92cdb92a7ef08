//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{TransferCreatedData, TransferData};
use crate::transfer::TransferRequest;

/// Bearer JWT security scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("JWT")
                .description(Some("HS256 token whose `sub` is the user id"))
                .build();
            components.add_security_scheme("bearer_jwt", SecurityScheme::Http(scheme));
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tenant Ledger API",
        version = "1.0.0",
        description = "Multi-tenant balance ledger: transfers between companies, user accounts and external parties.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::transfer::create_transfer,
        crate::gateway::handlers::transfer::list_transfers,
        crate::gateway::handlers::transfer::get_transfer,
        crate::gateway::handlers::transfer::approve_transfer,
        crate::gateway::handlers::transfer::reject_transfer,
    ),
    components(
        schemas(
            HealthResponse,
            TransferRequest,
            TransferCreatedData,
            TransferData,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Transfer", description = "Ledger transfers and approvals (auth required)"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;
