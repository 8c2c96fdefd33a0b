//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// User records, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Index: normalized email to `user_id`.
    pub const USERS_BY_EMAIL: &str = "users_by_email";

    /// Credit transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by user, keyed by `user_id || transaction_id`.
    /// Value is empty (index only).
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// Uniqueness index: payment reference to `transaction_id`.
    pub const PAYMENT_REFS: &str = "payment_refs";

    /// Video jobs, keyed by `job_id`.
    pub const VIDEO_JOBS: &str = "video_jobs";

    /// Index: jobs by user, keyed by `user_id || created_at_nanos || job_id`.
    /// Value is empty (index only).
    pub const VIDEO_JOBS_BY_USER: &str = "video_jobs_by_user";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::USERS_BY_EMAIL,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::PAYMENT_REFS,
        cf::VIDEO_JOBS,
        cf::VIDEO_JOBS_BY_USER,
    ]
}
