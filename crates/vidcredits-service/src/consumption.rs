//! Credit-consuming video generation.
//!
//! A request reserves its cost and creates a `generating` job in one store
//! call, then hands the provider call and its reconciliation to a spawned
//! task. The handler awaits that task, but dropping the request does not
//! cancel it, so every reserved job reaches `completed` or `failed`.

use std::sync::Arc;

use vidcredits_core::{GenerationOutcome, UserId, VideoJob, VideoJobId, VideoRequest};
use vidcredits_store::{Store, StoreError};

use crate::error::ApiError;
use crate::state::AppState;

/// Failure reason recorded on jobs orphaned by a restart.
pub const ORPHANED_JOB_REASON: &str = "generation interrupted by service restart";

/// Run one generation request end to end.
///
/// Returns the completed job, or the generation error after the refund has
/// been written.
pub async fn generate_video(
    state: &AppState,
    user_id: UserId,
    prompt: &str,
    duration_seconds: u32,
) -> Result<VideoJob, ApiError> {
    let request = VideoRequest::parse(prompt, duration_seconds, &state.config.pricing)?;

    let generator = state
        .generator
        .clone()
        .ok_or_else(|| ApiError::ExternalService("Video generation not configured".into()))?;

    let job = VideoJob::generating(user_id, &request);
    let usage = state.store.reserve_video_job(&job)?;

    tracing::info!(
        user_id = %user_id,
        job_id = %job.id,
        cost = %job.credits_used,
        balance = %usage.balance_after,
        "Credits reserved for video generation"
    );

    let store = Arc::clone(&state.store);
    let job_id = job.id;
    let task = tokio::spawn(async move {
        let outcome = generator
            .generate(&request.prompt, request.duration_seconds)
            .await;
        reconcile(store.as_ref(), &job_id, outcome)
    });

    task.await.map_err(|e| {
        tracing::error!(job_id = %job_id, error = %e, "Generation task aborted");
        ApiError::Internal(format!("generation task for {job_id} aborted"))
    })?
}

/// Apply a provider outcome to a reserved job.
///
/// A ready outcome completes the job and keeps the debit; anything else fails
/// the job and refunds it.
pub fn reconcile(
    store: &dyn Store,
    job_id: &VideoJobId,
    outcome: GenerationOutcome,
) -> Result<VideoJob, ApiError> {
    match outcome.into_result() {
        Ok((url, duration_seconds)) => {
            let job = store.complete_video_job(job_id, &url, duration_seconds)?;
            tracing::info!(job_id = %job_id, url = %url, "Video generation completed");
            Ok(job)
        }
        Err(err) => {
            let (job, refund) = store.fail_video_job(job_id, &err.to_string())?;
            tracing::warn!(
                job_id = %job_id,
                user_id = %job.user_id,
                refunded = %refund.amount,
                error = %err,
                "Video generation failed, credits refunded"
            );
            Err(err.into())
        }
    }
}

/// Fail and refund every job left `generating` by a previous process.
///
/// Returns the number of jobs recovered.
///
/// # Errors
///
/// Returns an error if the jobs cannot be listed.
pub fn recover_orphaned_jobs(store: &dyn Store) -> Result<usize, StoreError> {
    let mut recovered = 0;
    for job in store.generating_video_jobs()? {
        match store.fail_video_job(&job.id, ORPHANED_JOB_REASON) {
            Ok((_, refund)) => {
                recovered += 1;
                tracing::warn!(
                    job_id = %job.id,
                    user_id = %job.user_id,
                    refunded = %refund.amount,
                    "Recovered orphaned video job"
                );
            }
            Err(StoreError::InvalidJobTransition { .. }) => {}
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to recover video job");
            }
        }
    }
    Ok(recovered)
}
