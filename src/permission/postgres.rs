//! Grants stored in `company_permissions` / `super_admins`

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{CapabilitySet, PermissionGate};
use crate::core_types::{CompanyId, UserId};
use crate::error::LedgerError;

#[derive(Clone)]
pub struct PgPermissionGate {
    pool: PgPool,
}

impl PgPermissionGate {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace the stored grant for (user, company)
    pub async fn set_capabilities(
        &self,
        user_id: UserId,
        company_id: CompanyId,
        set: CapabilitySet,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO company_permissions (user_id, company_id, permissions)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, company_id) DO UPDATE SET permissions = EXCLUDED.permissions
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(set.bits())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PermissionGate for PgPermissionGate {
    async fn capabilities(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<CapabilitySet, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(
                    (SELECT permissions FROM company_permissions
                     WHERE user_id = $1 AND company_id = $2),
                    0
                ) AS permissions,
                EXISTS (SELECT 1 FROM super_admins WHERE user_id = $1) AS super_admin
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;

        let set = CapabilitySet::from_bits(row.try_get("permissions")?);
        if row.try_get::<bool, _>("super_admin")? {
            Ok(set.with_super_admin())
        } else {
            Ok(set)
        }
    }
}
