//! In-memory storage implementation.
//!
//! All state lives behind one `RwLock`, so every mutation is trivially atomic
//! with respect to readers and other writers.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use vidcredits_core::{
    normalize_email, CreditTransaction, TransactionKind, User, UserId, VideoJob, VideoJobId,
    VideoStatus,
};

use crate::error::{Result, StoreError};
use crate::{ledger, Store};

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    emails: HashMap<String, UserId>,
    /// Per-user ledger in append order.
    transactions: HashMap<UserId, Vec<CreditTransaction>>,
    external_refs: HashMap<String, CreditTransaction>,
    videos: HashMap<VideoJobId, VideoJob>,
    /// Per-user job IDs in creation order.
    videos_by_user: HashMap<UserId, Vec<VideoJobId>>,
}

impl Inner {
    fn user(&self, user_id: &UserId) -> Result<&User> {
        self.users.get(user_id).ok_or_else(|| unknown_user(user_id))
    }

    fn append(&mut self, user: User, tx: CreditTransaction) {
        if let Some(external_ref) = &tx.external_ref {
            self.external_refs.insert(external_ref.clone(), tx.clone());
        }
        self.transactions.entry(user.id).or_default().push(tx);
        self.users.insert(user.id, user);
    }

    fn job(&self, job_id: &VideoJobId) -> Result<&VideoJob> {
        self.videos.get(job_id).ok_or_else(|| StoreError::NotFound {
            entity: "video job",
            id: job_id.to_string(),
        })
    }
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Database(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Database(format!("lock poisoned: {e}")))
    }
}

fn unknown_user(user_id: &UserId) -> StoreError {
    StoreError::UnknownUser {
        user_id: user_id.to_string(),
    }
}

fn page<T>(items: impl DoubleEndedIterator<Item = T>, limit: usize, offset: usize) -> Vec<T> {
    items.rev().skip(offset).take(limit).collect()
}

impl Store for MemoryStore {
    fn insert_user(&self, user: &User) -> Result<()> {
        let mut inner = self.write()?;
        let email = normalize_email(&user.email);
        if inner.emails.contains_key(&email) {
            return Err(StoreError::DuplicateEmail { email });
        }
        inner.emails.insert(email, user.id);
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        Ok(self.read()?.users.get(user_id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.read()?;
        Ok(inner
            .emails
            .get(&normalize_email(email))
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    fn credit(
        &self,
        user_id: &UserId,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        external_ref: Option<&str>,
    ) -> Result<CreditTransaction> {
        ledger::validate_credit(amount, kind)?;
        let mut inner = self.write()?;

        if let Some(external_ref) = external_ref {
            if let Some(existing) = inner.external_refs.get(external_ref) {
                return Err(StoreError::DuplicateExternalRef {
                    external_ref: external_ref.to_string(),
                    existing: Box::new(existing.clone()),
                });
            }
        }

        let mut user = inner.user(user_id)?.clone();
        let tx = ledger::apply_credit(&mut user, amount, kind, description, external_ref)?;
        inner.append(user, tx.clone());
        Ok(tx)
    }

    fn debit(&self, user_id: &UserId, amount: i64, description: &str) -> Result<CreditTransaction> {
        ledger::validate_debit(amount)?;
        let mut inner = self.write()?;

        let mut user = inner.user(user_id)?.clone();
        let tx = ledger::apply_debit(&mut user, amount, description)?;
        inner.append(user, tx.clone());
        Ok(tx)
    }

    fn balance_of(&self, user_id: &UserId) -> Result<i64> {
        Ok(self.read()?.user(user_id)?.balance)
    }

    fn history_of(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let inner = self.read()?;
        inner.user(user_id)?;
        Ok(inner
            .transactions
            .get(user_id)
            .map(|txs| page(txs.iter().cloned(), limit, offset))
            .unwrap_or_default())
    }

    fn find_transaction_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<CreditTransaction>> {
        Ok(self.read()?.external_refs.get(external_ref).cloned())
    }

    fn reserve_video_job(&self, job: &VideoJob) -> Result<CreditTransaction> {
        let mut inner = self.write()?;

        let mut user = inner.user(&job.user_id)?.clone();
        let tx = ledger::reserve_job(&mut user, job)?;
        inner.append(user, tx.clone());
        inner.videos.insert(job.id, job.clone());
        inner.videos_by_user.entry(job.user_id).or_default().push(job.id);
        Ok(tx)
    }

    fn complete_video_job(
        &self,
        job_id: &VideoJobId,
        url: &str,
        duration_seconds: u32,
    ) -> Result<VideoJob> {
        let mut inner = self.write()?;

        let mut job = inner.job(job_id)?.clone();
        ledger::complete_job(&mut job, url, duration_seconds)?;
        inner.videos.insert(job.id, job.clone());
        Ok(job)
    }

    fn fail_video_job(
        &self,
        job_id: &VideoJobId,
        reason: &str,
    ) -> Result<(VideoJob, CreditTransaction)> {
        let mut inner = self.write()?;

        let mut job = inner.job(job_id)?.clone();
        let mut user = inner.user(&job.user_id)?.clone();
        let refund = ledger::fail_job(&mut user, &mut job, reason)?;
        inner.append(user, refund.clone());
        inner.videos.insert(job.id, job.clone());
        Ok((job, refund))
    }

    fn get_video_job(&self, job_id: &VideoJobId) -> Result<Option<VideoJob>> {
        Ok(self.read()?.videos.get(job_id).cloned())
    }

    fn videos_of(&self, user_id: &UserId, limit: usize, offset: usize) -> Result<Vec<VideoJob>> {
        let inner = self.read()?;
        inner.user(user_id)?;
        let Some(ids) = inner.videos_by_user.get(user_id) else {
            return Ok(Vec::new());
        };
        Ok(page(
            ids.iter().filter_map(|id| inner.videos.get(id)).cloned(),
            limit,
            offset,
        ))
    }

    fn generating_video_jobs(&self) -> Result<Vec<VideoJob>> {
        let mut jobs: Vec<VideoJob> = self
            .read()?
            .videos
            .values()
            .filter(|job| job.status == VideoStatus::Generating)
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }
}
