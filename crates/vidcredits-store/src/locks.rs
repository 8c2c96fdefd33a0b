//! Striped per-user write locks.
//!
//! `RocksDB` has no read-modify-write primitive, so mutations of the same user
//! are serialized here before their batch is built.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

use vidcredits_core::UserId;

use crate::error::{Result, StoreError};

const STRIPES: usize = 64;

pub(crate) struct UserLocks {
    stripes: Vec<Mutex<()>>,
}

impl UserLocks {
    pub(crate) fn new() -> Self {
        Self {
            stripes: (0..STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    pub(crate) fn lock(&self, user_id: &UserId) -> Result<MutexGuard<'_, ()>> {
        let mut hasher = DefaultHasher::new();
        user_id.hash(&mut hasher);
        #[allow(clippy::cast_possible_truncation)]
        let index = hasher.finish() as usize % STRIPES;
        lock(&self.stripes[index])
    }
}

pub(crate) fn lock(mutex: &Mutex<()>) -> Result<MutexGuard<'_, ()>> {
    mutex
        .lock()
        .map_err(|e| StoreError::Database(format!("lock poisoned: {e}")))
}
