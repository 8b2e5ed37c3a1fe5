//! Invalidation behavior: family prefix deletes, extra keys, idempotence,
//! write-through refresh, policy plans, and index/scan strategy parity.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use aangan_cache::{
    CacheKey, CacheStore, EntityKind, InvalidationCoordinator, KeyIndex, KeyPrefix, MemoryStore,
    ReadThrough, StoreError, TtlClass, WriteOp,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Snapshot {
    name: String,
}

#[derive(Debug, PartialEq)]
struct LoadFailed;

struct UnreachableStore;

#[async_trait]
impl CacheStore for UnreachableStore {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn scan_prefix(&self, _prefix: &KeyPrefix) -> Result<Vec<String>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn delete_many(&self, _keys: &[String]) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }
}

async fn seed(store: &MemoryStore, keys: &[&str]) {
    for key in keys {
        store
            .set(key, Bytes::from_static(b"{\"name\":\"stale\"}"), Duration::from_secs(600))
            .await
            .expect("seeding should succeed");
    }
}

#[tokio::test]
async fn invalidation_purges_family_and_extra_keys() {
    let store = Arc::new(MemoryStore::new());
    let cache = ReadThrough::new(store.clone());
    let coordinator = InvalidationCoordinator::new(store.clone());

    seed(
        &store,
        &["Application:7", "Application:7:pending", "MyApplication:U3"],
    )
    .await;

    coordinator
        .invalidate(
            EntityKind::Application,
            "7",
            &[CacheKey::new(EntityKind::MyApplications, "U3")],
        )
        .await;

    assert!(store.get("MyApplication:U3").await.unwrap().is_none());

    // Any read in the purged family must go back to the loader.
    let calls = Arc::new(AtomicUsize::new(0));
    cache
        .read_through(
            &CacheKey::new(EntityKind::Application, "7"),
            TtlClass::Stable.duration(),
            || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<Option<Vec<String>>, LoadFailed>(Some(vec![]))
                }
            },
        )
        .await
        .expect("reload should succeed");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn prefix_invalidation_spares_unrelated_families() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = InvalidationCoordinator::new(store.clone());

    seed(
        &store,
        &[
            "groupMessages:G1:100:T1",
            "groupMessages:G1:50:T2",
            "groupMessages:G2:100:T1",
            "groupMessages:G10:100:T1",
        ],
    )
    .await;

    coordinator
        .invalidate(EntityKind::GroupMessages, "G1", &[])
        .await;

    assert!(store.get("groupMessages:G1:100:T1").await.unwrap().is_none());
    assert!(store.get("groupMessages:G1:50:T2").await.unwrap().is_none());
    assert!(store.get("groupMessages:G2:100:T1").await.unwrap().is_some());
    // An id that string-extends the target id is a different family.
    assert!(store.get("groupMessages:G10:100:T1").await.unwrap().is_some());
}

#[tokio::test]
async fn invalidation_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = InvalidationCoordinator::new(store.clone());
    let extra = [CacheKey::new(EntityKind::Society, "S1")];

    seed(&store, &["Bills:S1:due", "Society:S1"]).await;

    coordinator.invalidate(EntityKind::Bills, "S1", &extra).await;
    coordinator.invalidate(EntityKind::Bills, "S1", &extra).await;

    assert!(store.is_empty());
}

#[tokio::test]
async fn invalidation_swallows_store_outage() {
    let coordinator = InvalidationCoordinator::new(Arc::new(UnreachableStore));

    // Must neither panic nor surface an error; staleness is TTL-bounded.
    coordinator
        .invalidate(
            EntityKind::Complaints,
            "S1",
            &[CacheKey::new(EntityKind::Society, "S1")],
        )
        .await;
}

#[tokio::test]
async fn refresh_rewrites_entry_without_loader() {
    let store = Arc::new(MemoryStore::new());
    let cache = ReadThrough::new(store.clone());
    let coordinator = InvalidationCoordinator::new(store);
    let key = CacheKey::new(EntityKind::Society, "7");
    let fresh = Snapshot {
        name: "Green Acres".to_string(),
    };

    coordinator
        .refresh(&key, &fresh, TtlClass::Stable.duration())
        .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let value = cache
        .read_through(&key, TtlClass::Stable.duration(), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<Option<Snapshot>, LoadFailed>(None)
            }
        })
        .await
        .expect("refreshed entry should hit");

    assert_eq!(value, Some(fresh));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn application_review_plan_clears_every_declared_family() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = InvalidationCoordinator::new(store.clone());

    seed(
        &store,
        &[
            "Application:S7",
            "Application:S7:approved",
            "MyApplication:U3",
            "Society:S7",
            "Bills:S7:due",
        ],
    )
    .await;

    let op = WriteOp::ApplicationReviewed {
        society_id: "S7".to_string(),
        applicant_id: "U3".to_string(),
    };
    coordinator.apply(&op.plan()).await;

    assert!(store.get("Application:S7").await.unwrap().is_none());
    assert!(store.get("Application:S7:approved").await.unwrap().is_none());
    assert!(store.get("MyApplication:U3").await.unwrap().is_none());
    assert!(store.get("Society:S7").await.unwrap().is_none());
    // Untouched by this operation.
    assert!(store.get("Bills:S7:due").await.unwrap().is_some());

    // The reviewing handler holds the fresh society and writes it through.
    let fresh = Snapshot {
        name: "Green Acres".to_string(),
    };
    for key in &op.plan().refresh {
        coordinator
            .refresh(key, &fresh, TtlClass::Stable.duration())
            .await;
    }
    assert!(store.get("Society:S7").await.unwrap().is_some());
}

#[tokio::test]
async fn notice_and_event_changes_purge_the_society_snapshot() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = InvalidationCoordinator::new(store.clone());

    seed(&store, &["Society:S1", "Notices:S1", "Notice:N1"]).await;
    coordinator
        .apply(
            &WriteOp::NoticeChanged {
                society_id: "S1".to_string(),
                notice_id: "N1".to_string(),
            }
            .plan(),
        )
        .await;
    assert!(store.get("Society:S1").await.unwrap().is_none());
    assert!(store.get("Notices:S1").await.unwrap().is_none());
    assert!(store.get("Notice:N1").await.unwrap().is_none());

    seed(&store, &["Society:S1", "AllEvents:S1", "Event:E1"]).await;
    coordinator
        .apply(
            &WriteOp::EventChanged {
                society_id: "S1".to_string(),
                event_id: "E1".to_string(),
            }
            .plan(),
        )
        .await;
    assert!(store.get("Society:S1").await.unwrap().is_none());
    assert!(store.get("AllEvents:S1").await.unwrap().is_none());
    assert!(store.get("Event:E1").await.unwrap().is_none());
}

#[tokio::test]
async fn friend_acceptance_purges_both_parties_friend_lists() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = InvalidationCoordinator::new(store.clone());

    seed(
        &store,
        &["FriendReq_To:U2", "FriendReq_From:U1", "Friends:U1", "Friends:U2"],
    )
    .await;

    coordinator
        .apply(
            &WriteOp::FriendRequestResolved {
                sender_id: "U1".to_string(),
                receiver_id: "U2".to_string(),
                accepted: true,
            }
            .plan(),
        )
        .await;

    assert!(store.is_empty());
}

#[tokio::test]
async fn key_index_strategy_matches_scan_strategy() {
    let store = Arc::new(MemoryStore::new());
    let index = Arc::new(KeyIndex::new());
    let cache = ReadThrough::new(store.clone()).with_index(index.clone());
    let coordinator = InvalidationCoordinator::new(store.clone()).with_index(index.clone());

    for (group, limit) in [("G1", 100), ("G1", 50), ("G2", 100)] {
        let key = CacheKey::new(EntityKind::GroupMessages, group).dim(limit).dim("T1");
        cache
            .read_through(&key, TtlClass::Volatile.duration(), || async {
                Ok::<Option<Vec<String>>, LoadFailed>(Some(vec!["hi".to_string()]))
            })
            .await
            .expect("population should succeed");
    }
    assert_eq!(index.key_count(), 3);

    coordinator
        .invalidate(EntityKind::GroupMessages, "G1", &[])
        .await;

    assert!(store.get("groupMessages:G1:100:T1").await.unwrap().is_none());
    assert!(store.get("groupMessages:G1:50:T1").await.unwrap().is_none());
    assert!(store.get("groupMessages:G2:100:T1").await.unwrap().is_some());
    assert_eq!(index.key_count(), 1);
}

#[tokio::test]
async fn extra_key_delete_forgets_index_entry() {
    let store = Arc::new(MemoryStore::new());
    let index = Arc::new(KeyIndex::new());
    let cache = ReadThrough::new(store.clone()).with_index(index.clone());
    let coordinator = InvalidationCoordinator::new(store.clone()).with_index(index.clone());
    let society = CacheKey::new(EntityKind::Society, "S1");

    cache
        .read_through(&society, TtlClass::Stable.duration(), || async {
            Ok::<Option<Snapshot>, LoadFailed>(Some(Snapshot {
                name: "Green Acres".to_string(),
            }))
        })
        .await
        .expect("population should succeed");
    assert_eq!(index.key_count(), 1);

    coordinator
        .invalidate(EntityKind::Bills, "S1", &[society.clone()])
        .await;

    assert!(store.get("Society:S1").await.unwrap().is_none());
    assert_eq!(index.key_count(), 0);
}
