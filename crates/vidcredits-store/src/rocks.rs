//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Each mutation reads the current records under its user's stripe lock and
//! commits every affected key in one `WriteBatch`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use vidcredits_core::{
    normalize_email, CreditTransaction, TransactionId, TransactionKind, User, UserId, VideoJob,
    VideoJobId, VideoStatus,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::ledger;
use crate::locks::{self, UserLocks};
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    user_locks: UserLocks,
    /// Serializes email uniqueness checks.
    registration: Mutex<()>,
    /// Serializes payment reference uniqueness checks. Taken before a user lock.
    payments: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            user_locks: UserLocks::new(),
            registration: Mutex::new(()),
            payments: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn require_user(&self, user_id: &UserId) -> Result<User> {
        self.get_user(user_id)?.ok_or_else(|| StoreError::UnknownUser {
            user_id: user_id.to_string(),
        })
    }

    fn require_job(&self, job_id: &VideoJobId) -> Result<VideoJob> {
        self.get_video_job(job_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "video job",
            id: job_id.to_string(),
        })
    }

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<CreditTransaction>> {
        self.get(cf::TRANSACTIONS, &keys::transaction_key(transaction_id))
    }

    /// Collect one user's index keys, newest first.
    fn user_index_keys(&self, cf_name: &str, user_id: &UserId) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        let prefix = keys::user_prefix(user_id);

        let mut all_keys = Vec::new();
        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }

        all_keys.reverse();
        Ok(all_keys)
    }

    /// Stage the user record and a new ledger entry into `batch`.
    fn stage_entry(&self, batch: &mut WriteBatch, user: &User, tx: &CreditTransaction) -> Result<()> {
        let cf_users = self.cf(cf::USERS)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_tx_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;

        batch.put_cf(&cf_users, keys::user_key(&user.id), Self::serialize(user)?);
        batch.put_cf(&cf_tx, keys::transaction_key(&tx.id), Self::serialize(tx)?);
        batch.put_cf(
            &cf_tx_by_user,
            keys::user_transaction_key(&user.id, &tx.id),
            [],
        );

        if let Some(external_ref) = &tx.external_ref {
            let cf_refs = self.cf(cf::PAYMENT_REFS)?;
            batch.put_cf(&cf_refs, keys::payment_ref_key(external_ref), tx.id.to_bytes());
        }
        Ok(())
    }

    fn stage_job(&self, batch: &mut WriteBatch, job: &VideoJob) -> Result<()> {
        let cf_jobs = self.cf(cf::VIDEO_JOBS)?;
        batch.put_cf(&cf_jobs, keys::video_job_key(&job.id), Self::serialize(job)?);
        Ok(())
    }

    fn credit_locked(
        &self,
        user_id: &UserId,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        external_ref: Option<&str>,
    ) -> Result<CreditTransaction> {
        let _guard = self.user_locks.lock(user_id)?;

        let mut user = self.require_user(user_id)?;
        let tx = ledger::apply_credit(&mut user, amount, kind, description, external_ref)?;

        let mut batch = WriteBatch::default();
        self.stage_entry(&mut batch, &user, &tx)?;
        self.write(batch)?;
        Ok(tx)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Users
    // =========================================================================

    fn insert_user(&self, user: &User) -> Result<()> {
        let _guard = locks::lock(&self.registration)?;

        let email = normalize_email(&user.email);
        let cf_email = self.cf(cf::USERS_BY_EMAIL)?;
        let taken = self
            .db
            .get_cf(&cf_email, keys::email_key(&email))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if taken {
            return Err(StoreError::DuplicateEmail { email });
        }

        let cf_users = self.cf(cf::USERS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_users, keys::user_key(&user.id), Self::serialize(user)?);
        batch.put_cf(&cf_email, keys::email_key(&email), user.id.as_bytes());
        self.write(batch)
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        self.get(cf::USERS, &keys::user_key(user_id))
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let cf_email = self.cf(cf::USERS_BY_EMAIL)?;
        let Some(raw) = self
            .db
            .get_cf(&cf_email, keys::email_key(&normalize_email(email)))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let bytes: [u8; 16] = raw
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Serialization("malformed email index entry".into()))?;
        self.get_user(&UserId::from_bytes(bytes))
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    fn credit(
        &self,
        user_id: &UserId,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        external_ref: Option<&str>,
    ) -> Result<CreditTransaction> {
        ledger::validate_credit(amount, kind)?;

        let Some(external_ref) = external_ref else {
            return self.credit_locked(user_id, amount, kind, description, None);
        };

        let _payments = locks::lock(&self.payments)?;
        if let Some(existing) = self.find_transaction_by_external_ref(external_ref)? {
            return Err(StoreError::DuplicateExternalRef {
                external_ref: external_ref.to_string(),
                existing: Box::new(existing),
            });
        }
        self.credit_locked(user_id, amount, kind, description, Some(external_ref))
    }

    fn debit(&self, user_id: &UserId, amount: i64, description: &str) -> Result<CreditTransaction> {
        ledger::validate_debit(amount)?;
        let _guard = self.user_locks.lock(user_id)?;

        let mut user = self.require_user(user_id)?;
        let tx = ledger::apply_debit(&mut user, amount, description)?;

        let mut batch = WriteBatch::default();
        self.stage_entry(&mut batch, &user, &tx)?;
        self.write(batch)?;
        Ok(tx)
    }

    fn balance_of(&self, user_id: &UserId) -> Result<i64> {
        Ok(self.require_user(user_id)?.balance)
    }

    fn history_of(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        self.require_user(user_id)?;

        let mut transactions = Vec::new();
        for key in self
            .user_index_keys(cf::TRANSACTIONS_BY_USER, user_id)?
            .into_iter()
            .skip(offset)
            .take(limit)
        {
            let Some(tx_id) = keys::transaction_id_from_user_key(&key) else {
                continue;
            };
            if let Some(tx) = self.get_transaction(&tx_id)? {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }

    fn find_transaction_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<CreditTransaction>> {
        let cf_refs = self.cf(cf::PAYMENT_REFS)?;
        let Some(raw) = self
            .db
            .get_cf(&cf_refs, keys::payment_ref_key(external_ref))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let bytes: [u8; 16] = raw
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Serialization("malformed payment ref entry".into()))?;
        self.get_transaction(&TransactionId::from_bytes(bytes))
    }

    // =========================================================================
    // Video jobs
    // =========================================================================

    fn reserve_video_job(&self, job: &VideoJob) -> Result<CreditTransaction> {
        let _guard = self.user_locks.lock(&job.user_id)?;

        let mut user = self.require_user(&job.user_id)?;
        let tx = ledger::reserve_job(&mut user, job)?;

        let cf_jobs_by_user = self.cf(cf::VIDEO_JOBS_BY_USER)?;
        let mut batch = WriteBatch::default();
        self.stage_entry(&mut batch, &user, &tx)?;
        self.stage_job(&mut batch, job)?;
        batch.put_cf(
            &cf_jobs_by_user,
            keys::user_video_job_key(&job.user_id, job.created_at, &job.id),
            [],
        );
        self.write(batch)?;
        Ok(tx)
    }

    fn complete_video_job(
        &self,
        job_id: &VideoJobId,
        url: &str,
        duration_seconds: u32,
    ) -> Result<VideoJob> {
        let owner = self.require_job(job_id)?.user_id;
        let _guard = self.user_locks.lock(&owner)?;

        let mut job = self.require_job(job_id)?;
        ledger::complete_job(&mut job, url, duration_seconds)?;

        let mut batch = WriteBatch::default();
        self.stage_job(&mut batch, &job)?;
        self.write(batch)?;
        Ok(job)
    }

    fn fail_video_job(
        &self,
        job_id: &VideoJobId,
        reason: &str,
    ) -> Result<(VideoJob, CreditTransaction)> {
        let owner = self.require_job(job_id)?.user_id;
        let _guard = self.user_locks.lock(&owner)?;

        let mut job = self.require_job(job_id)?;
        let mut user = self.require_user(&owner)?;
        let refund = ledger::fail_job(&mut user, &mut job, reason)?;

        let mut batch = WriteBatch::default();
        self.stage_entry(&mut batch, &user, &refund)?;
        self.stage_job(&mut batch, &job)?;
        self.write(batch)?;
        Ok((job, refund))
    }

    fn get_video_job(&self, job_id: &VideoJobId) -> Result<Option<VideoJob>> {
        self.get(cf::VIDEO_JOBS, &keys::video_job_key(job_id))
    }

    fn videos_of(&self, user_id: &UserId, limit: usize, offset: usize) -> Result<Vec<VideoJob>> {
        self.require_user(user_id)?;

        let mut jobs = Vec::new();
        for key in self
            .user_index_keys(cf::VIDEO_JOBS_BY_USER, user_id)?
            .into_iter()
            .skip(offset)
            .take(limit)
        {
            let Some(job_id) = keys::video_job_id_from_user_key(&key) else {
                continue;
            };
            if let Some(job) = self.get_video_job(&job_id)? {
                jobs.push(job);
            }
        }

        Ok(jobs)
    }

    fn generating_video_jobs(&self) -> Result<Vec<VideoJob>> {
        let cf_jobs = self.cf(cf::VIDEO_JOBS)?;

        let mut jobs = Vec::new();
        for item in self.db.iterator_cf(&cf_jobs, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let job: VideoJob = Self::deserialize(&value)?;
            if job.status == VideoStatus::Generating {
                jobs.push(job);
            }
        }

        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }
}
