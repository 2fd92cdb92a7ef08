//! Transfer Status Definitions
//!
//! Status strings match the `transfers.status` column.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Transfer lifecycle status
///
/// ```text
/// PENDING ──approve──▶ COMPLETED
///    │
///    └─────reject────▶ REJECT
/// ```
///
/// Terminal states: COMPLETED, REJECT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    /// Sender debited, receiver not yet credited; awaiting counter-party action
    Pending,

    /// Terminal: both ledger effects applied
    Completed,

    /// Terminal: sender refunded
    Rejected,
}

impl TransferStatus {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Rejected)
    }

    /// Only `pending` can move, and only to a terminal state
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        matches!(
            (self, next),
            (TransferStatus::Pending, TransferStatus::Completed)
                | (TransferStatus::Pending, TransferStatus::Rejected)
        )
    }

    /// Column value
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
            TransferStatus::Rejected => "reject",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransferStatus::Pending),
            "completed" => Some(TransferStatus::Completed),
            "reject" => Some(TransferStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransferStatus::from_db(s).ok_or_else(|| format!("Invalid transfer status: {}", s))
    }
}

impl Serialize for TransferStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
