//! Error types for vidcredits.

use crate::ids::IdError;

/// Result type for ledger-level operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Domain errors raised by the ledger and its flows.
///
/// None of these are fatal; every variant describes a single rejected request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The user does not exist.
    #[error("unknown user: {user_id}")]
    UnknownUser {
        /// The user ID that was not found.
        user_id: String,
    },

    /// The email is already registered.
    #[error("email already registered: {email}")]
    DuplicateEmail {
        /// The normalized email.
        email: String,
    },

    /// A credit or debit amount was zero, negative, or of the wrong kind.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The balance does not cover the requested debit.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Amount that was requested.
        required: i64,
    },

    /// The purchase request does not match a catalog package.
    #[error("invalid package: {0}")]
    InvalidPackage(String),

    /// The payment provider has not marked the session as paid.
    #[error("payment not completed for session {session_id} (status: {status})")]
    PaymentNotCompleted {
        /// The checkout session reference.
        session_id: String,
        /// The provider's payment status.
        status: String,
    },

    /// The generation provider failed or timed out.
    #[error("generation provider error: {0}")]
    GenerationProviderError(String),

    /// The generation provider answered without a usable video URL.
    #[error("generation result invalid: {0}")]
    GenerationResultInvalid(String),

    /// The prompt is empty or too long.
    #[error("invalid prompt: {0}")]
    InvalidPrompt(String),

    /// The requested duration has no credit cost tier.
    #[error("unknown duration tier: {0} seconds")]
    UnknownDurationTier(u32),

    /// Registration input failed validation.
    #[error("invalid registration: {0}")]
    InvalidRegistration(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl LedgerError {
    /// Whether the credits debited for a generation request were returned
    /// before this error was reported.
    #[must_use]
    pub const fn credits_refunded(&self) -> bool {
        matches!(
            self,
            Self::GenerationProviderError(_) | Self::GenerationResultInvalid(_)
        )
    }
}
