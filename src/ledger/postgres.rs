//! PostgreSQL ledger store
//!
//! Row locks (`SELECT ... FOR UPDATE`) plus compare-and-apply debits
//! (`UPDATE ... WHERE balance >= amount`) keep balances non-negative under
//! concurrent writers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::models::{Account, Company, DebitOutcome, LedgerKey, LedgerSnapshot};
use super::store::{LedgerStore, LedgerTx, Resolution};
use super::validation::{CurrencyCode, balance_limit_exceeded};
use crate::core_types::{CompanyId, UserId};
use crate::error::LedgerError;
use crate::transfer::{Transfer, TransferId, TransferQuery, TransferStatus};

const TRANSFER_COLUMNS: &str = r#"
    transfer_id, cid, user_id, company_id, to_user_id, to_user_company_id,
    from_scope, to_scope, amount, currency, transfer_type, status,
    from_external_name, to_external_name, description,
    sender_final_balance, receiver_final_balance,
    initiated_by, processed_by, processed_at, files, created_at
"#;

/// Per-table statements; key columns bind after the amount
struct LedgerSql {
    lock: &'static str,
    credit: &'static str,
    debit: &'static str,
    balance: &'static str,
}

const COMPANY_SQL: LedgerSql = LedgerSql {
    lock: "SELECT currency, balance, auto_approve_incoming FROM companies WHERE id = $1 FOR UPDATE",
    credit: "UPDATE companies SET balance = balance + $1 WHERE id = $2 RETURNING balance",
    debit: "UPDATE companies SET balance = balance - $1 WHERE id = $2 AND balance >= $1 RETURNING balance",
    balance: "SELECT balance FROM companies WHERE id = $1",
};

const ACCOUNT_SQL: LedgerSql = LedgerSql {
    lock: r#"
        SELECT a.currency, a.balance, c.auto_approve_incoming
        FROM user_accounts a
        JOIN companies c ON c.id = a.company_id
        WHERE a.user_id = $1 AND a.company_id = $2
        FOR UPDATE OF a
    "#,
    credit: r#"
        UPDATE user_accounts SET balance = balance + $1
        WHERE user_id = $2 AND company_id = $3
        RETURNING balance
    "#,
    debit: r#"
        UPDATE user_accounts SET balance = balance - $1
        WHERE user_id = $2 AND company_id = $3 AND balance >= $1
        RETURNING balance
    "#,
    balance: "SELECT balance FROM user_accounts WHERE user_id = $1 AND company_id = $2",
};

fn sql_for(key: LedgerKey) -> &'static LedgerSql {
    match key {
        LedgerKey::Company(_) => &COMPANY_SQL,
        LedgerKey::Account { .. } => &ACCOUNT_SQL,
    }
}

fn bind_key(
    query: Query<'static, Postgres, PgArguments>,
    key: LedgerKey,
) -> Query<'static, Postgres, PgArguments> {
    match key {
        LedgerKey::Company(id) => query.bind(id),
        LedgerKey::Account {
            company_id,
            user_id,
        } => query.bind(user_id).bind(company_id),
    }
}

fn corrupt(column: &str, value: &str) -> LedgerError {
    LedgerError::StorageFailure(format!("invalid {} in database: '{}'", column, value))
}

/// SQLSTATE 22003: the credited balance no longer fits `NUMERIC(20, 2)`
fn credit_error(err: sqlx::Error, amount: Decimal) -> LedgerError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("22003") => {
            balance_limit_exceeded(amount)
        }
        _ => err.into(),
    }
}

fn currency_column(row: &PgRow, column: &str) -> Result<CurrencyCode, LedgerError> {
    let raw: String = row.try_get(column)?;
    CurrencyCode::parse(&raw).map_err(|_| corrupt(column, &raw))
}

fn row_to_company(row: &PgRow) -> Result<Company, LedgerError> {
    Ok(Company {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        currency: currency_column(row, "currency")?,
        balance: row.try_get("balance")?,
        owner_id: row.try_get("owner_id")?,
        auto_approve_incoming: row.try_get("auto_approve_incoming")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_account(row: &PgRow) -> Result<Account, LedgerError> {
    Ok(Account {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        company_id: row.try_get("company_id")?,
        currency: currency_column(row, "currency")?,
        balance: row.try_get("balance")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_transfer(row: &PgRow) -> Result<Transfer, LedgerError> {
    let id_str: String = row.try_get("transfer_id")?;
    let id: TransferId = id_str.parse().map_err(|_| corrupt("transfer_id", &id_str))?;

    let from_scope: String = row.try_get("from_scope")?;
    let to_scope: String = row.try_get("to_scope")?;
    let transfer_type: String = row.try_get("transfer_type")?;
    let status: String = row.try_get("status")?;

    Ok(Transfer {
        id,
        cid: row.try_get("cid")?,
        user_id: row.try_get("user_id")?,
        company_id: row.try_get("company_id")?,
        to_user_id: row.try_get("to_user_id")?,
        to_user_company_id: row.try_get("to_user_company_id")?,
        from_scope: from_scope
            .parse()
            .map_err(|_| corrupt("from_scope", &from_scope))?,
        to_scope: to_scope.parse().map_err(|_| corrupt("to_scope", &to_scope))?,
        amount: row.try_get("amount")?,
        currency: currency_column(row, "currency")?,
        transfer_type: transfer_type
            .parse()
            .map_err(|_| corrupt("transfer_type", &transfer_type))?,
        status: TransferStatus::from_db(&status).ok_or_else(|| corrupt("status", &status))?,
        from_external_name: row.try_get("from_external_name")?,
        to_external_name: row.try_get("to_external_name")?,
        description: row.try_get("description")?,
        sender_final_balance: row.try_get("sender_final_balance")?,
        receiver_final_balance: row.try_get("receiver_final_balance")?,
        initiated_by: row.try_get("initiated_by")?,
        processed_by: row.try_get("processed_by")?,
        processed_at: row.try_get("processed_at")?,
        created_at: row.try_get("created_at")?,
        files: row.try_get("files")?,
    })
}

/// Ledger store over a shared connection pool
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<Self::Tx, LedgerError> {
        Ok(PgLedgerTx {
            tx: self.pool.begin().await?,
        })
    }

    async fn get_company(&self, id: CompanyId) -> Result<Option<Company>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, currency, balance, owner_id, auto_approve_incoming, created_at
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_company).transpose()
    }

    async fn get_account(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<Option<Account>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, company_id, currency, balance, created_at
            FROM user_accounts
            WHERE user_id = $1 AND company_id = $2
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn get_transfer(&self, id: &TransferId) -> Result<Option<Transfer>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM transfers WHERE transfer_id = $1",
            TRANSFER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_transfer).transpose()
    }

    async fn find_transfer_by_cid(
        &self,
        company_id: CompanyId,
        cid: &str,
    ) -> Result<Option<Transfer>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM transfers WHERE company_id = $1 AND cid = $2",
            TRANSFER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(company_id)
            .bind(cid)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_transfer).transpose()
    }

    async fn list_transfers(
        &self,
        company_id: CompanyId,
        query: &TransferQuery,
    ) -> Result<Vec<Transfer>, LedgerError> {
        let status = query.status_filter()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM transfers
            WHERE (company_id = $1 OR to_user_company_id = $1)
              AND ($2::VARCHAR IS NULL OR status = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR created_at < $3)
            ORDER BY created_at DESC, transfer_id DESC
            LIMIT $4
            "#,
            TRANSFER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(company_id)
            .bind(status.map(|s| s.as_str()))
            .bind(query.before)
            .bind(query.effective_limit() as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_transfer).collect()
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One database transaction
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_ledger(&mut self, key: LedgerKey) -> Result<Option<LedgerSnapshot>, LedgerError> {
        let row = bind_key(sqlx::query(sql_for(key).lock), key)
            .fetch_optional(&mut *self.tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(LedgerSnapshot {
            key,
            currency: currency_column(&row, "currency")?,
            balance: row.try_get("balance")?,
            auto_approve_incoming: row.try_get("auto_approve_incoming")?,
        }))
    }

    async fn credit(
        &mut self,
        key: LedgerKey,
        amount: Decimal,
    ) -> Result<Option<Decimal>, LedgerError> {
        let row = bind_key(sqlx::query(sql_for(key).credit).bind(amount), key)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| credit_error(e, amount))?;

        row.map(|r| r.try_get("balance"))
            .transpose()
            .map_err(LedgerError::from)
    }

    async fn debit(&mut self, key: LedgerKey, amount: Decimal) -> Result<DebitOutcome, LedgerError> {
        let sql = sql_for(key);
        let applied = bind_key(sqlx::query(sql.debit).bind(amount), key)
            .fetch_optional(&mut *self.tx)
            .await?;
        if let Some(row) = applied {
            return Ok(DebitOutcome::Applied(row.try_get("balance")?));
        }

        // Distinguish a short balance from a missing row
        let current = bind_key(sqlx::query(sql.balance), key)
            .fetch_optional(&mut *self.tx)
            .await?;
        match current {
            Some(row) => Ok(DebitOutcome::Insufficient(row.try_get("balance")?)),
            None => Ok(DebitOutcome::Missing),
        }
    }

    async fn open_account(
        &mut self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<Option<Account>, LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO user_accounts (user_id, company_id, currency, balance)
            SELECT $1, id, currency, 0 FROM companies WHERE id = $2
            ON CONFLICT (user_id, company_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .execute(&mut *self.tx)
        .await?;

        let row = sqlx::query(
            r#"
            SELECT id, user_id, company_id, currency, balance, created_at
            FROM user_accounts
            WHERE user_id = $1 AND company_id = $2
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn insert_transfer(&mut self, t: &Transfer) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO transfers
                (transfer_id, cid, user_id, company_id, to_user_id, to_user_company_id,
                 from_scope, to_scope, amount, currency, transfer_type, status,
                 from_external_name, to_external_name, description,
                 sender_final_balance, receiver_final_balance,
                 initiated_by, processed_by, processed_at, files, created_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                 $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(t.id.to_string())
        .bind(&t.cid)
        .bind(t.user_id)
        .bind(t.company_id)
        .bind(t.to_user_id)
        .bind(t.to_user_company_id)
        .bind(t.from_scope.as_str())
        .bind(t.to_scope.as_str())
        .bind(t.amount)
        .bind(t.currency.as_str())
        .bind(t.transfer_type.as_str())
        .bind(t.status.as_str())
        .bind(&t.from_external_name)
        .bind(&t.to_external_name)
        .bind(&t.description)
        .bind(t.sender_final_balance)
        .bind(t.receiver_final_balance)
        .bind(t.initiated_by)
        .bind(t.processed_by)
        .bind(t.processed_at)
        .bind(&t.files)
        .bind(t.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn lock_transfer(&mut self, id: &TransferId) -> Result<Option<Transfer>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM transfers WHERE transfer_id = $1 FOR UPDATE",
            TRANSFER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_transfer).transpose()
    }

    async fn resolve_transfer(
        &mut self,
        id: &TransferId,
        resolution: &Resolution,
    ) -> Result<bool, LedgerError> {
        let processed_at: DateTime<Utc> = resolution.processed_at;
        let result = sqlx::query(
            r#"
            UPDATE transfers
            SET status = $1, processed_by = $2, processed_at = $3, receiver_final_balance = $4
            WHERE transfer_id = $5 AND status = $6
            "#,
        )
        .bind(resolution.status.as_str())
        .bind(resolution.processed_by)
        .bind(processed_at)
        .bind(resolution.receiver_final_balance)
        .bind(id.to_string())
        .bind(TransferStatus::Pending.as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self) -> Result<(), LedgerError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
