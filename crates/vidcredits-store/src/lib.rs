//! Ledger storage for vidcredits.
//!
//! This crate persists users, the append-only credit ledger, and video jobs
//! behind the [`Store`] trait. Two backends are provided:
//!
//! - [`MemoryStore`]: process-local, used for tests and development.
//! - `RocksStore` (feature `rocksdb-backend`, on by default): durable storage
//!   using column families and atomic write batches.
//!
//! # Consistency
//!
//! Every mutating call applies the balance change and appends its ledger entry
//! in a single atomic write, so readers never see one without the other.
//! Mutations on the same user are serialized. Both backends build their writes
//! with the functions in [`ledger`], so they enforce identical rules.
//!
//! # Example
//!
//! ```
//! use vidcredits_core::{TransactionKind, User};
//! use vidcredits_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let (user, _bonus) = store
//!     .open_account(&User::new("ada@example.com", "Ada", "hash".into()))
//!     .unwrap();
//! assert_eq!(user.balance, 5);
//!
//! store.debit(&user.id, 2, "Video generation").unwrap();
//! assert_eq!(store.balance_of(&user.id).unwrap(), 3);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ledger;
pub mod memory;

#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
mod locks;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use vidcredits_core::{
    CreditTransaction, TransactionKind, User, UserId, VideoJob, VideoJobId,
    WELCOME_BONUS_CREDITS, WELCOME_BONUS_DESCRIPTION,
};

/// The storage trait defining all ledger operations.
pub trait Store: Send + Sync {
    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateEmail` if the email is taken.
    fn insert_user(&self, user: &User) -> Result<()>;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    /// Get a user by normalized email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Add credits and append the entry atomically.
    ///
    /// When `external_ref` is set it must not already be recorded on any
    /// transaction.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` if `amount <= 0` or `kind` is a debit kind.
    /// - `StoreError::UnknownUser` if the user does not exist.
    /// - `StoreError::DuplicateExternalRef` if the reference was already credited.
    fn credit(
        &self,
        user_id: &UserId,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        external_ref: Option<&str>,
    ) -> Result<CreditTransaction>;

    /// Remove credits with a `usage` entry, atomically. No partial debits.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` if `amount <= 0`.
    /// - `StoreError::UnknownUser` if the user does not exist.
    /// - `StoreError::InsufficientCredits` if the balance is below `amount`.
    fn debit(&self, user_id: &UserId, amount: i64, description: &str)
        -> Result<CreditTransaction>;

    /// Current balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownUser` if the user does not exist.
    fn balance_of(&self, user_id: &UserId) -> Result<i64>;

    /// Ledger entries for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownUser` if the user does not exist.
    fn history_of(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>>;

    /// Look up the transaction carrying a payment reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_transaction_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<CreditTransaction>>;

    // =========================================================================
    // Video jobs
    // =========================================================================

    /// Debit the job's cost and insert it as `generating`, atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::UnknownUser` if the owner does not exist.
    /// - `StoreError::InsufficientCredits` if the balance is below the cost;
    ///   no job is stored in that case.
    fn reserve_video_job(&self, job: &VideoJob) -> Result<CreditTransaction>;

    /// Mark a `generating` job as completed. The debit stands.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the job does not exist.
    /// - `StoreError::InvalidJobTransition` if it already resolved.
    fn complete_video_job(
        &self,
        job_id: &VideoJobId,
        url: &str,
        duration_seconds: u32,
    ) -> Result<VideoJob>;

    /// Mark a `generating` job as failed and refund it, atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the job does not exist.
    /// - `StoreError::InvalidJobTransition` if it already resolved.
    fn fail_video_job(
        &self,
        job_id: &VideoJobId,
        reason: &str,
    ) -> Result<(VideoJob, CreditTransaction)>;

    /// Get a job by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_video_job(&self, job_id: &VideoJobId) -> Result<Option<VideoJob>>;

    /// Jobs for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownUser` if the user does not exist.
    fn videos_of(&self, user_id: &UserId, limit: usize, offset: usize) -> Result<Vec<VideoJob>>;

    /// All jobs still awaiting an outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn generating_video_jobs(&self) -> Result<Vec<VideoJob>>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Register a user and grant the welcome bonus.
    ///
    /// The user is inserted with a zero balance and the bonus is then credited
    /// through the ledger, so the bonus is the account's first entry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateEmail` if the email is taken.
    fn open_account(&self, user: &User) -> Result<(User, CreditTransaction)> {
        self.insert_user(user)?;
        let bonus = self.credit(
            &user.id,
            WELCOME_BONUS_CREDITS,
            TransactionKind::Bonus,
            WELCOME_BONUS_DESCRIPTION,
            None,
        )?;
        let user = self.get_user(&user.id)?.ok_or_else(|| StoreError::UnknownUser {
            user_id: user.id.to_string(),
        })?;

        tracing::info!(
            user_id = %user.id,
            bonus = %bonus.amount,
            "Account opened with welcome bonus"
        );

        Ok((user, bonus))
    }
}
