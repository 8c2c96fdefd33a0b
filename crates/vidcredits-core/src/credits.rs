//! Ledger entries.
//!
//! Every change to a user's balance is recorded as a [`CreditTransaction`].
//! Entries are immutable once written; the log is append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TransactionId, UserId, VideoJobId};

/// A single credit movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// What kind of movement this is.
    pub kind: TransactionKind,

    /// Signed amount. Usage is negative, everything else positive.
    pub amount: i64,

    /// Balance after this entry was applied.
    pub balance_after: i64,

    /// Human-readable description.
    pub description: String,

    /// Payment provider reference (checkout session id) for purchases.
    pub external_ref: Option<String>,

    /// The video job this entry debits or refunds, if any.
    pub video_job_id: Option<VideoJobId>,

    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    fn new(
        user_id: UserId,
        kind: TransactionKind,
        amount: i64,
        balance_after: i64,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            kind,
            amount,
            balance_after,
            description,
            external_ref: None,
            video_job_id: None,
            created_at: Utc::now(),
        }
    }

    /// Create a credit-positive entry of the given kind.
    ///
    /// The caller is responsible for rejecting [`TransactionKind::Usage`] and
    /// non-positive amounts before building the entry.
    #[must_use]
    pub fn credit(
        user_id: UserId,
        kind: TransactionKind,
        amount: i64,
        balance_after: i64,
        description: String,
    ) -> Self {
        Self::new(user_id, kind, amount, balance_after, description)
    }

    /// Create a usage entry. The stored amount is always negative.
    #[must_use]
    pub fn usage(user_id: UserId, amount: i64, balance_after: i64, description: String) -> Self {
        Self::new(
            user_id,
            TransactionKind::Usage,
            -amount.abs(),
            balance_after,
            description,
        )
    }

    /// Attach the payment provider reference.
    #[must_use]
    pub fn with_external_ref(mut self, external_ref: Option<String>) -> Self {
        self.external_ref = external_ref;
        self
    }

    /// Attach the video job this entry belongs to.
    #[must_use]
    pub fn with_video_job(mut self, job_id: VideoJobId) -> Self {
        self.video_job_id = Some(job_id);
        self
    }
}

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Promotional credits (welcome bonus).
    Bonus,

    /// Credits bought through the payment provider.
    Purchase,

    /// Credits spent on a video generation.
    Usage,

    /// Credits returned after a failed generation.
    Refund,
}

impl TransactionKind {
    /// Whether this kind adds credits.
    #[must_use]
    pub const fn is_credit(self) -> bool {
        matches!(self, Self::Bonus | Self::Purchase | Self::Refund)
    }

    /// Whether this kind removes credits.
    #[must_use]
    pub const fn is_debit(self) -> bool {
        matches!(self, Self::Usage)
    }

    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bonus => "bonus",
            Self::Purchase => "purchase",
            Self::Usage => "usage",
            Self::Refund => "refund",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_amount_is_negative() {
        let tx = CreditTransaction::usage(UserId::generate(), 2, 3, "Video generation".into());
        assert_eq!(tx.amount, -2);
        assert_eq!(tx.kind, TransactionKind::Usage);
        assert_eq!(tx.balance_after, 3);
    }

    #[test]
    fn purchase_carries_external_ref() {
        let tx = CreditTransaction::credit(
            UserId::generate(),
            TransactionKind::Purchase,
            50,
            55,
            "Credit purchase - pro package".into(),
        )
        .with_external_ref(Some("cs_test_1".into()));
        assert_eq!(tx.amount, 50);
        assert_eq!(tx.external_ref.as_deref(), Some("cs_test_1"));
    }

    #[test]
    fn kind_direction() {
        assert!(TransactionKind::Bonus.is_credit());
        assert!(TransactionKind::Purchase.is_credit());
        assert!(TransactionKind::Refund.is_credit());
        assert!(!TransactionKind::Usage.is_credit());
        assert!(TransactionKind::Usage.is_debit());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionKind::Refund).unwrap();
        assert_eq!(json, "\"refund\"");
        assert_eq!(TransactionKind::Refund.to_string(), "refund");
    }
}
