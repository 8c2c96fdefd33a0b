//! Error types for vidcredits storage.

use vidcredits_core::{CreditTransaction, LedgerError, VideoStatus};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Ledger operation against a user that does not exist.
    #[error("unknown user: {user_id}")]
    UnknownUser {
        /// The missing user ID.
        user_id: String,
    },

    /// Email already registered.
    #[error("email already registered: {email}")]
    DuplicateEmail {
        /// The normalized email.
        email: String,
    },

    /// Amount is non-positive or the kind does not match the operation.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Balance does not cover the debit.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Amount requested.
        required: i64,
    },

    /// A transaction with this external reference already exists.
    #[error("external reference already recorded: {external_ref}")]
    DuplicateExternalRef {
        /// The reference (checkout session id).
        external_ref: String,
        /// The transaction that already carries it.
        existing: Box<CreditTransaction>,
    },

    /// The job is not in a state that allows the transition.
    #[error("video job {job_id} is already {status}")]
    InvalidJobTransition {
        /// The job.
        job_id: String,
        /// Its current status.
        status: VideoStatus,
    },
}

impl StoreError {
    /// Map ledger-level store errors onto the domain taxonomy.
    ///
    /// Returns `None` for infrastructure failures that have no domain meaning.
    #[must_use]
    pub fn as_ledger_error(&self) -> Option<LedgerError> {
        match self {
            Self::UnknownUser { user_id } => Some(LedgerError::UnknownUser {
                user_id: user_id.clone(),
            }),
            Self::DuplicateEmail { email } => Some(LedgerError::DuplicateEmail {
                email: email.clone(),
            }),
            Self::InvalidAmount(msg) => Some(LedgerError::InvalidAmount(msg.clone())),
            Self::InsufficientCredits { balance, required } => {
                Some(LedgerError::InsufficientCredits {
                    balance: *balance,
                    required: *required,
                })
            }
            _ => None,
        }
    }
}
