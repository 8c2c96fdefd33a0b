//! Client for the video generation provider.
//!
//! The provider exposes an OpenAI-compatible `chat/completions` endpoint and
//! answers with free text that should contain a video URL.

pub mod client;
pub mod types;

pub use client::{GenerationClient, GenerationError};
