//! Transfer DTOs
//!
//! Amounts and balances leave the gateway as strings so clients never see
//! binary floating point.

use serde::Serialize;
use utoipa::ToSchema;

use crate::transfer::{Transfer, TransferOutcome};

/// Result of `POST /companies/{company_id}/transfers`
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferCreatedData {
    pub success: bool,
    #[schema(example = "01JAB6Q3F0Z8M1VQ9W4T2R7K5N")]
    pub transfer_id: String,
    #[schema(example = "completed")]
    pub status: String,
    #[schema(example = "Transfer completed")]
    pub message: String,
}

impl From<TransferOutcome> for TransferCreatedData {
    fn from(outcome: TransferOutcome) -> Self {
        Self {
            success: outcome.success,
            transfer_id: outcome.transfer_id.to_string(),
            status: outcome.status.to_string(),
            message: outcome.message,
        }
    }
}

/// Full transfer record
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferData {
    pub transfer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[schema(example = "company_to_user_same")]
    pub transfer_type: String,
    pub status: String,
    pub from_scope: String,
    pub to_scope: String,
    pub user_id: Option<i64>,
    pub company_id: i64,
    pub to_user_id: Option<i64>,
    pub to_user_company_id: Option<i64>,
    #[schema(example = "200.00")]
    pub amount: String,
    #[schema(example = "EUR")]
    pub currency: String,
    pub from_external_name: Option<String>,
    pub to_external_name: Option<String>,
    pub description: Option<String>,
    pub sender_final_balance: Option<String>,
    pub receiver_final_balance: Option<String>,
    pub initiated_by: i64,
    pub processed_by: Option<i64>,
    /// Milliseconds since epoch
    pub processed_at: Option<i64>,
    pub created_at: i64,
    pub files: Vec<String>,
}

impl From<Transfer> for TransferData {
    fn from(t: Transfer) -> Self {
        Self {
            transfer_id: t.id.to_string(),
            cid: t.cid,
            transfer_type: t.transfer_type.to_string(),
            status: t.status.to_string(),
            from_scope: t.from_scope.to_string(),
            to_scope: t.to_scope.to_string(),
            user_id: t.user_id,
            company_id: t.company_id,
            to_user_id: t.to_user_id,
            to_user_company_id: t.to_user_company_id,
            amount: t.amount.to_string(),
            currency: t.currency.to_string(),
            from_external_name: t.from_external_name,
            to_external_name: t.to_external_name,
            description: t.description,
            sender_final_balance: t.sender_final_balance.map(|b| b.to_string()),
            receiver_final_balance: t.receiver_final_balance.map(|b| b.to_string()),
            initiated_by: t.initiated_by,
            processed_by: t.processed_by,
            processed_at: t.processed_at.map(|at| at.timestamp_millis()),
            created_at: t.created_at.timestamp_millis(),
            files: t.files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{TransferId, TransferStatus};

    #[test]
    fn test_created_data_is_camel_case() {
        let data = TransferCreatedData::from(TransferOutcome {
            success: true,
            transfer_id: TransferId::new(),
            status: TransferStatus::Pending,
            message: "held".into(),
        });
        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("transferId").is_some());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["success"], true);
    }
}
