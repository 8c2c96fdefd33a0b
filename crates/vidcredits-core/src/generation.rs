//! Outcome of a call to the video generation provider.
//!
//! The provider speaks a chat-completions dialect and embeds the video URL
//! somewhere in free text. Everything the consumption flow needs to decide
//! between "keep the debit" and "refund" is captured by [`GenerationOutcome`].

use crate::error::LedgerError;

/// File extensions treated as a direct video link.
const VIDEO_EXTENSIONS: [&str; 3] = [".mp4", ".mov", ".avi"];

/// Characters that terminate a URL inside free text.
const URL_TERMINATORS: [char; 12] = ['<', '>', '"', '{', '}', '|', '\\', '^', '`', '[', ']', '\''];

/// Result of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The provider returned a usable video.
    Ready {
        /// Video URL.
        url: String,
        /// Video length in seconds.
        duration_seconds: u32,
    },

    /// The provider answered successfully but without a usable URL.
    Malformed(String),

    /// The provider failed, timed out, or was unreachable.
    ProviderError(String),
}

impl GenerationOutcome {
    /// Classify the text content of a successful provider response.
    #[must_use]
    pub fn from_content(content: Option<&str>, duration_seconds: u32) -> Self {
        let Some(content) = content else {
            return Self::Malformed("response contained no message content".into());
        };
        match extract_video_url(content) {
            Some(url) => Self::Ready {
                url,
                duration_seconds,
            },
            None => Self::Malformed("no video URL received from generation service".into()),
        }
    }

    /// Convert a failed outcome into the error reported to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::GenerationResultInvalid`] for `Malformed` and
    /// [`LedgerError::GenerationProviderError`] for `ProviderError`.
    pub fn into_result(self) -> Result<(String, u32), LedgerError> {
        match self {
            Self::Ready {
                url,
                duration_seconds,
            } => Ok((url, duration_seconds)),
            Self::Malformed(detail) => Err(LedgerError::GenerationResultInvalid(detail)),
            Self::ProviderError(detail) => Err(LedgerError::GenerationProviderError(detail)),
        }
    }
}

/// Pull a video URL out of free-form provider text.
///
/// Links ending in a known video extension win; otherwise the first
/// `http(s)://` link with a host is used.
#[must_use]
pub fn extract_video_url(content: &str) -> Option<String> {
    let candidates: Vec<&str> = content
        .split(|c: char| c.is_whitespace() || URL_TERMINATORS.contains(&c))
        .filter_map(url_candidate)
        .collect();

    candidates
        .iter()
        .find(|url| has_video_extension(url))
        .or_else(|| candidates.first())
        .map(|url| (*url).to_string())
}

fn url_candidate(token: &str) -> Option<&str> {
    let start = token.find("https://").or_else(|| token.find("http://"))?;
    let url = token[start..].trim_end_matches(['.', ',', ';', ':', ')', '(', '!', '?']);
    let rest = url.split_once("://").map(|(_, rest)| rest)?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    (!host.is_empty()).then_some(url)
}

fn has_video_extension(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
