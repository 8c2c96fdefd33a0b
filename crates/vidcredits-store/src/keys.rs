//! Key encoding utilities for `RocksDB`.
//!
//! Index keys start with the 16-byte user ID so a prefix scan yields one
//! user's entries in key order.

use chrono::{DateTime, Utc};
use vidcredits_core::{TransactionId, UserId, VideoJobId};

const ID_LEN: usize = 16;
const TIMESTAMP_LEN: usize = 8;

/// Create a user key from a user ID.
#[must_use]
pub fn user_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create an email index key from a normalized email.
#[must_use]
pub fn email_key(email: &str) -> Vec<u8> {
    email.as_bytes().to_vec()
}

/// Create a transaction key from a transaction ID.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a user-transaction index key.
///
/// Format: `user_id (16 bytes) || transaction_id (16 bytes)`
///
/// ULIDs are time-ordered, so a user's transactions sort by creation time.
#[must_use]
pub fn user_transaction_key(user_id: &UserId, transaction_id: &TransactionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN * 2);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Create a prefix for iterating one user's index entries.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the transaction ID from a user-transaction index key.
#[must_use]
pub fn transaction_id_from_user_key(key: &[u8]) -> Option<TransactionId> {
    let bytes: [u8; ID_LEN] = key.get(ID_LEN..ID_LEN * 2)?.try_into().ok()?;
    Some(TransactionId::from_bytes(bytes))
}

/// Create a payment reference key.
#[must_use]
pub fn payment_ref_key(external_ref: &str) -> Vec<u8> {
    external_ref.as_bytes().to_vec()
}

/// Create a video job key from a job ID.
#[must_use]
pub fn video_job_key(job_id: &VideoJobId) -> Vec<u8> {
    job_id.as_bytes().to_vec()
}

/// Create a user-job index key.
///
/// Format: `user_id (16 bytes) || created_at nanos (8 bytes BE) || job_id (16 bytes)`
///
/// Job IDs are random UUIDs, so the timestamp carries the ordering; nanosecond
/// resolution keeps jobs created within one millisecond in creation order.
#[must_use]
pub fn user_video_job_key(
    user_id: &UserId,
    created_at: DateTime<Utc>,
    job_id: &VideoJobId,
) -> Vec<u8> {
    let nanos = created_at
        .timestamp_nanos_opt()
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or_default();
    let mut key = Vec::with_capacity(ID_LEN * 2 + TIMESTAMP_LEN);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&nanos.to_be_bytes());
    key.extend_from_slice(job_id.as_bytes());
    key
}

/// Extract the job ID from a user-job index key.
#[must_use]
pub fn video_job_id_from_user_key(key: &[u8]) -> Option<VideoJobId> {
    let start = ID_LEN + TIMESTAMP_LEN;
    let bytes: [u8; ID_LEN] = key.get(start..start + ID_LEN)?.try_into().ok()?;
    Some(VideoJobId::from_bytes(bytes))
}
