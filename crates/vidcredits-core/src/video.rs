//! Video generation jobs.
//!
//! A job is created in [`VideoStatus::Generating`] together with the usage
//! entry that pays for it, and resolves exactly once to
//! [`VideoStatus::Completed`] or [`VideoStatus::Failed`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::pricing::PricingConfig;
use crate::{UserId, VideoJobId};

/// Longest accepted prompt, in characters.
pub const MAX_PROMPT_CHARS: usize = 2000;

/// Characters of the prompt quoted in ledger descriptions.
const PROMPT_PREVIEW_CHARS: usize = 50;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Credits are reserved and the provider call is outstanding.
    Generating,
    /// The provider returned a usable video.
    Completed,
    /// The provider failed; the reserved credits were refunded.
    Failed,
}

impl VideoStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A video generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoJob {
    /// Job identifier.
    pub id: VideoJobId,
    /// Owning user.
    pub user_id: UserId,
    /// Prompt as submitted (trimmed).
    pub prompt: String,
    /// Current state.
    pub status: VideoStatus,
    /// Credits debited for this job.
    pub credits_used: i64,
    /// Result URL once completed.
    pub result_url: Option<String>,
    /// Requested, then delivered, length in seconds.
    pub duration_seconds: u32,
    /// Provider error detail when failed.
    pub failure_reason: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last transition time.
    pub updated_at: DateTime<Utc>,
}

impl VideoJob {
    /// Create a job in the `generating` state.
    #[must_use]
    pub fn generating(user_id: UserId, request: &VideoRequest) -> Self {
        let now = Utc::now();
        Self {
            id: VideoJobId::generate(),
            user_id,
            prompt: request.prompt.clone(),
            status: VideoStatus::Generating,
            credits_used: request.cost,
            result_url: None,
            duration_seconds: request.duration_seconds,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Ledger description for the reservation debit.
    #[must_use]
    pub fn usage_description(&self) -> String {
        format!("Video generation: {}", prompt_preview(&self.prompt))
    }

    /// Ledger description for a refund after a provider failure.
    #[must_use]
    pub fn refund_description(&self) -> String {
        format!("Refund for failed generation: {}", prompt_preview(&self.prompt))
    }
}

/// A validated generation request with its server-side cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    /// Trimmed prompt.
    pub prompt: String,
    /// Requested length.
    pub duration_seconds: u32,
    /// Credits this request costs.
    pub cost: i64,
}

impl VideoRequest {
    /// Validate the prompt and price the duration.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidPrompt`] for an empty or oversized prompt.
    /// - [`LedgerError::UnknownDurationTier`] when no tier matches.
    pub fn parse(prompt: &str, duration_seconds: u32, pricing: &PricingConfig) -> Result<Self> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(LedgerError::InvalidPrompt("prompt is required".into()));
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(LedgerError::InvalidPrompt(format!(
                "prompt exceeds {MAX_PROMPT_CHARS} characters"
            )));
        }
        let cost = pricing
            .cost_for_duration(duration_seconds)
            .ok_or(LedgerError::UnknownDurationTier(duration_seconds))?;

        Ok(Self {
            prompt: prompt.to_string(),
            duration_seconds,
            cost,
        })
    }
}

fn prompt_preview(prompt: &str) -> String {
    if prompt.chars().count() <= PROMPT_PREVIEW_CHARS {
        prompt.to_string()
    } else {
        let head: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}
