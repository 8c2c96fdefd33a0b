//! Core types and utilities for vidcredits.
//!
//! This crate provides the domain types shared by the store and the service:
//!
//! - **Identifiers**: `UserId`, `VideoJobId`, `TransactionId`
//! - **Accounts**: `User`, `Registration`
//! - **Ledger**: `CreditTransaction`, `TransactionKind`
//! - **Video jobs**: `VideoJob`, `VideoStatus`, `VideoRequest`
//! - **Pricing**: `PricingConfig`, `CreditPackage`, `DurationTier`
//! - **Generation**: `GenerationOutcome`
//!
//! # Credits
//!
//! Credits are whole units stored as `i64`. A 30 second video costs 1 credit,
//! 60 seconds 2 and 120 seconds 4. New accounts start with a 5 credit bonus.
//! For every user the sum of ledger amounts equals the balance, and the
//! balance is never negative.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod credits;
pub mod error;
pub mod generation;
pub mod ids;
pub mod pricing;
pub mod video;

pub use account::{
    normalize_email, Registration, User, MIN_NAME_LEN, MIN_PASSWORD_LEN,
    WELCOME_BONUS_CREDITS, WELCOME_BONUS_DESCRIPTION,
};
pub use credits::{CreditTransaction, TransactionKind};
pub use error::{LedgerError, Result};
pub use generation::{extract_video_url, GenerationOutcome};
pub use ids::{IdError, TransactionId, UserId, VideoJobId};
pub use pricing::{usd_to_cents, CreditPackage, DurationTier, PricingConfig};
pub use video::{VideoJob, VideoRequest, VideoStatus, MAX_PROMPT_CHARS};
