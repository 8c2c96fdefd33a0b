//! Credit balance, transaction and catalog handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vidcredits_core::{CreditPackage, CreditTransaction, DurationTier};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Largest page a client may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Maximum number of items to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl PageQuery {
    /// Requested page size, clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Current credit balance.
    pub balance: i64,
}

/// Get current credit balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.store.balance_of(&auth.user_id)?;
    Ok(Json(BalanceResponse { balance }))
}

/// Transaction response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// `bonus`, `purchase`, `usage` or `refund`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Signed amount (negative for usage).
    pub amount: i64,
    /// Balance after this transaction.
    pub balance_after: i64,
    /// Description.
    pub description: String,
    /// Checkout session for purchases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    /// Video job for usage and refunds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_job_id: Option<String>,
    /// Timestamp.
    pub created_at: String,
}

impl From<&CreditTransaction> for TransactionResponse {
    fn from(tx: &CreditTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            kind: tx.kind.to_string(),
            amount: tx.amount,
            balance_after: tx.balance_after,
            description: tx.description.clone(),
            external_ref: tx.external_ref.clone(),
            video_job_id: tx.video_job_id.map(|id| id.to_string()),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    // Fetch one more than requested to determine has_more
    let limit = query.limit();
    let transactions = state
        .store
        .history_of(&auth.user_id, limit + 1, query.offset)?;

    let has_more = transactions.len() > limit;
    let transactions: Vec<_> = transactions
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}

/// Catalog entry with display prices.
#[derive(Debug, Serialize)]
pub struct PackageResponse {
    /// Package id used in checkout requests.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Credits granted.
    pub credits: i64,
    /// Price in USD.
    pub price: f64,
    /// Pre-discount price in USD.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    /// Marketing copy.
    pub description: String,
    /// Highlighted in the storefront.
    pub popular: bool,
}

#[allow(clippy::cast_precision_loss)]
fn cents_to_usd(cents: i64) -> f64 {
    cents as f64 / 100.0
}

impl From<&CreditPackage> for PackageResponse {
    fn from(package: &CreditPackage) -> Self {
        Self {
            id: package.id.clone(),
            name: package.name.clone(),
            credits: package.credits,
            price: cents_to_usd(package.price_cents),
            original_price: package.original_price_cents.map(cents_to_usd),
            description: package.description.clone(),
            popular: package.popular,
        }
    }
}

/// Catalog response.
#[derive(Debug, Serialize)]
pub struct PackagesResponse {
    /// Packages for sale.
    pub packages: Vec<PackageResponse>,
    /// Generation cost per video length.
    pub duration_tiers: Vec<DurationTier>,
}

/// List the credit packages and generation costs.
pub async fn list_packages(State(state): State<Arc<AppState>>) -> Json<PackagesResponse> {
    let pricing = &state.config.pricing;
    Json(PackagesResponse {
        packages: pricing.packages.iter().map(PackageResponse::from).collect(),
        duration_tiers: pricing.duration_tiers.clone(),
    })
}
