//! Pure ledger planning shared by every backend.
//!
//! Each function takes the current record, validates the requested change, and
//! mutates a working copy while building the matching ledger entry. Backends
//! persist the returned pair in one atomic write, or nothing on error.

use chrono::Utc;

use vidcredits_core::{CreditTransaction, TransactionKind, User, VideoJob, VideoStatus};

use crate::error::{Result, StoreError};

/// Reject amounts and kinds that cannot be credited.
///
/// # Errors
///
/// Returns `StoreError::InvalidAmount` for non-positive amounts or a debit kind.
pub fn validate_credit(amount: i64, kind: TransactionKind) -> Result<()> {
    if !kind.is_credit() {
        return Err(StoreError::InvalidAmount(format!(
            "{kind} entries cannot be credited"
        )));
    }
    if amount <= 0 {
        return Err(StoreError::InvalidAmount(format!(
            "credit amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

/// Reject non-positive debit amounts.
///
/// # Errors
///
/// Returns `StoreError::InvalidAmount` when `amount <= 0`.
pub fn validate_debit(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(StoreError::InvalidAmount(format!(
            "debit amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

/// Apply a credit to `user` and build its ledger entry.
///
/// # Errors
///
/// Returns `StoreError::InvalidAmount` for invalid input or balance overflow.
pub fn apply_credit(
    user: &mut User,
    amount: i64,
    kind: TransactionKind,
    description: &str,
    external_ref: Option<&str>,
) -> Result<CreditTransaction> {
    validate_credit(amount, kind)?;
    let balance = user
        .balance
        .checked_add(amount)
        .ok_or_else(|| StoreError::InvalidAmount("balance overflow".into()))?;

    user.balance = balance;
    user.updated_at = Utc::now();

    Ok(
        CreditTransaction::credit(user.id, kind, amount, balance, description.to_string())
            .with_external_ref(external_ref.map(String::from)),
    )
}

/// Apply a usage debit to `user` and build its ledger entry.
///
/// # Errors
///
/// - `StoreError::InvalidAmount` when `amount <= 0`.
/// - `StoreError::InsufficientCredits` when the balance is below `amount`.
pub fn apply_debit(user: &mut User, amount: i64, description: &str) -> Result<CreditTransaction> {
    validate_debit(amount)?;
    if !user.has_sufficient_credits(amount) {
        return Err(StoreError::InsufficientCredits {
            balance: user.balance,
            required: amount,
        });
    }

    user.balance -= amount;
    user.updated_at = Utc::now();

    Ok(CreditTransaction::usage(
        user.id,
        amount,
        user.balance,
        description.to_string(),
    ))
}

/// Reserve the credits for a new `generating` job.
///
/// # Errors
///
/// Same as [`apply_debit`], plus `StoreError::InvalidJobTransition` if the
/// job is not freshly `generating`.
pub fn reserve_job(user: &mut User, job: &VideoJob) -> Result<CreditTransaction> {
    ensure_generating(job)?;
    Ok(apply_debit(user, job.credits_used, &job.usage_description())?.with_video_job(job.id))
}

/// Move a job to `completed`.
///
/// # Errors
///
/// Returns `StoreError::InvalidJobTransition` unless the job is `generating`.
pub fn complete_job(job: &mut VideoJob, url: &str, duration_seconds: u32) -> Result<()> {
    ensure_generating(job)?;
    job.status = VideoStatus::Completed;
    job.result_url = Some(url.to_string());
    job.duration_seconds = duration_seconds;
    job.updated_at = Utc::now();
    Ok(())
}

/// Move a job to `failed` and refund its reserved credits to `user`.
///
/// # Errors
///
/// Returns `StoreError::InvalidJobTransition` unless the job is `generating`.
pub fn fail_job(user: &mut User, job: &mut VideoJob, reason: &str) -> Result<CreditTransaction> {
    ensure_generating(job)?;
    let refund = apply_credit(
        user,
        job.credits_used,
        TransactionKind::Refund,
        &job.refund_description(),
        None,
    )?
    .with_video_job(job.id);

    job.status = VideoStatus::Failed;
    job.failure_reason = Some(reason.to_string());
    job.updated_at = Utc::now();
    Ok(refund)
}

fn ensure_generating(job: &VideoJob) -> Result<()> {
    if job.status == VideoStatus::Generating {
        Ok(())
    } else {
        Err(StoreError::InvalidJobTransition {
            job_id: job.id.to_string(),
            status: job.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidcredits_core::{PricingConfig, VideoRequest};

    fn user_with(balance: i64) -> User {
        let mut user = User::new("l@ledger.io", "Ledger", "hash".into());
        user.balance = balance;
        user
    }

    fn job_for(user: &User, seconds: u32) -> VideoJob {
        let req = VideoRequest::parse("a red kite", seconds, &PricingConfig::default()).unwrap();
        VideoJob::generating(user.id, &req)
    }

    #[test]
    fn credit_rejects_usage_kind_and_non_positive() {
        let mut user = user_with(0);
        assert!(matches!(
            apply_credit(&mut user, 5, TransactionKind::Usage, "x", None),
            Err(StoreError::InvalidAmount(_))
        ));
        assert!(matches!(
            apply_credit(&mut user, 0, TransactionKind::Bonus, "x", None),
            Err(StoreError::InvalidAmount(_))
        ));
        assert_eq!(user.balance, 0);
    }

    #[test]
    fn debit_leaves_user_untouched_when_short() {
        let mut user = user_with(1);
        let err = apply_debit(&mut user, 2, "video").unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientCredits {
                balance: 1,
                required: 2
            }
        ));
        assert_eq!(user.balance, 1);
    }

    #[test]
    fn debit_records_negative_amount() {
        let mut user = user_with(5);
        let tx = apply_debit(&mut user, 2, "video").unwrap();
        assert_eq!(tx.amount, -2);
        assert_eq!(tx.balance_after, 3);
        assert_eq!(user.balance, 3);
    }

    #[test]
    fn failing_a_job_refunds_exactly_what_was_reserved() {
        let mut user = user_with(5);
        let mut job = job_for(&user, 60);
        let usage = reserve_job(&mut user, &job).unwrap();
        assert_eq!(usage.video_job_id, Some(job.id));
        assert_eq!(user.balance, 3);

        let refund = fail_job(&mut user, &mut job, "provider down").unwrap();
        assert_eq!(refund.kind, TransactionKind::Refund);
        assert_eq!(refund.amount, 2);
        assert_eq!(user.balance, 5);
        assert_eq!(job.status, VideoStatus::Failed);
        assert_eq!(job.failure_reason.as_deref(), Some("provider down"));
    }

    #[test]
    fn terminal_jobs_cannot_transition_again() {
        let mut user = user_with(5);
        let mut job = job_for(&user, 30);
        complete_job(&mut job, "https://x.io/v.mp4", 30).unwrap();

        assert!(matches!(
            fail_job(&mut user, &mut job, "late failure"),
            Err(StoreError::InvalidJobTransition { .. })
        ));
        assert!(matches!(
            complete_job(&mut job, "https://x.io/w.mp4", 30),
            Err(StoreError::InvalidJobTransition { .. })
        ));
        assert_eq!(user.balance, 5);
    }
}
