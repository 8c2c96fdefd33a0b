//! Video generation and job handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vidcredits_core::{VideoJob, VideoJobId};

use crate::auth::AuthUser;
use crate::consumption::generate_video;
use crate::error::ApiError;
use crate::handlers::credits::PageQuery;
use crate::state::AppState;

/// Generate request.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Text prompt.
    #[serde(default)]
    pub prompt: String,
    /// Video length (30, 60 or 120 seconds).
    #[serde(default = "default_duration", alias = "duration")]
    pub duration_seconds: u32,
}

fn default_duration() -> u32 {
    30
}

/// Job response.
#[derive(Debug, Serialize)]
pub struct VideoResponse {
    /// Job ID.
    pub id: String,
    /// Prompt as submitted.
    pub prompt: String,
    /// `generating`, `completed` or `failed`.
    pub status: String,
    /// Credits charged.
    pub credits_used: i64,
    /// Video URL once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Video length in seconds.
    pub duration_seconds: u32,
    /// Failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl From<&VideoJob> for VideoResponse {
    fn from(job: &VideoJob) -> Self {
        Self {
            id: job.id.to_string(),
            prompt: job.prompt.clone(),
            status: job.status.to_string(),
            credits_used: job.credits_used,
            video_url: job.result_url.clone(),
            duration_seconds: job.duration_seconds,
            failure_reason: job.failure_reason.clone(),
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
        }
    }
}

/// Generate response.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// The completed job.
    pub video: VideoResponse,
    /// Balance after the charge.
    pub remaining_credits: i64,
}

/// Generate a video, charging its duration tier.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let job = generate_video(&state, auth.user_id, &body.prompt, body.duration_seconds).await?;
    let remaining_credits = state.store.balance_of(&auth.user_id)?;

    Ok(Json(GenerateResponse {
        video: VideoResponse::from(&job),
        remaining_credits,
    }))
}

/// List videos response.
#[derive(Debug, Serialize)]
pub struct ListVideosResponse {
    /// Jobs (newest first).
    pub videos: Vec<VideoResponse>,
    /// Whether there are more jobs.
    pub has_more: bool,
}

/// List the caller's video jobs.
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListVideosResponse>, ApiError> {
    let limit = query.limit();
    let jobs = state
        .store
        .videos_of(&auth.user_id, limit + 1, query.offset)?;

    let has_more = jobs.len() > limit;
    let videos = jobs.iter().take(limit).map(VideoResponse::from).collect();

    Ok(Json(ListVideosResponse { videos, has_more }))
}

/// Get one of the caller's video jobs.
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<VideoResponse>, ApiError> {
    let not_found = || ApiError::NotFound(format!("Video {id} not found"));

    let job_id: VideoJobId = id.parse().map_err(|_| not_found())?;
    let job = state
        .store
        .get_video_job(&job_id)?
        .filter(|job| job.user_id == auth.user_id)
        .ok_or_else(not_found)?;

    Ok(Json(VideoResponse::from(&job)))
}
