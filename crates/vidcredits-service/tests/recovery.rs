//! Startup recovery of jobs orphaned by a restart.

#![cfg(feature = "rocksdb-backend")]

use tempfile::TempDir;

use vidcredits_core::{PricingConfig, TransactionKind, User, VideoJob, VideoRequest, VideoStatus};
use vidcredits_service::consumption::ORPHANED_JOB_REASON;
use vidcredits_service::recover_orphaned_jobs;
use vidcredits_store::{RocksStore, Store};

#[test]
fn generating_jobs_are_refunded_after_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let (user, job) = {
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");
        let (user, _) = store
            .open_account(&User::new("crash@example.com", "Crash", "hash".into()))
            .unwrap();
        let request =
            VideoRequest::parse("interrupted sunset", 120, &PricingConfig::default()).unwrap();
        let job = VideoJob::generating(user.id, &request);
        store.reserve_video_job(&job).unwrap();
        assert_eq!(store.balance_of(&user.id).unwrap(), 1);
        (user, job)
    };

    let store = RocksStore::open(temp_dir.path()).expect("Failed to reopen store");
    assert_eq!(recover_orphaned_jobs(&store).unwrap(), 1);
    assert_eq!(recover_orphaned_jobs(&store).unwrap(), 0);

    let job = store.get_video_job(&job.id).unwrap().unwrap();
    assert_eq!(job.status, VideoStatus::Failed);
    assert_eq!(job.failure_reason.as_deref(), Some(ORPHANED_JOB_REASON));

    assert_eq!(store.balance_of(&user.id).unwrap(), 5);
    let history = store.history_of(&user.id, 10, 0).unwrap();
    assert_eq!(history[0].kind, TransactionKind::Refund);
    assert_eq!(history[0].amount, 4);
}
