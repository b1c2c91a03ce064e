mod support;

use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;

use cccache::application::error::AppError;
use cccache::domain::Provenance;
use support::{BackendMode, doc, harness, target};

#[tokio::test]
async fn upsert_then_read_is_served_from_cache() {
    let h = harness();
    let notes = target("notes", "abc123");

    let written = h
        .service
        .upsert(&notes, doc(json!({"text": "hello"})), None)
        .await
        .expect("upsert");
    assert_eq!(written.provenance, Provenance::BackendWrite);
    assert_eq!(
        written.cache_key.as_ref().map(|key| key.as_str()),
        Some("ccc.notes_abc123")
    );
    assert_eq!(
        h.backend.stored(&notes).await,
        Some(doc(json!({"text": "hello"})))
    );
    assert_eq!(
        h.store.peek("ccc.notes_abc123").await.as_deref(),
        Some(r#"{"text":"hello"}"#)
    );

    let reads_before = h.backend.reads.load(Ordering::SeqCst);
    let read = h.service.read(&notes).await.expect("read");
    assert_eq!(read.provenance, Provenance::Cache);
    assert_eq!(read.document, doc(json!({"text": "hello"})));
    assert_eq!(h.backend.reads.load(Ordering::SeqCst), reads_before);
}

#[tokio::test]
async fn read_after_invalidate_goes_to_backend_without_repopulating() {
    let h = harness();
    let notes = target("notes", "abc123");
    h.service
        .upsert(&notes, doc(json!({"text": "hello"})), None)
        .await
        .expect("upsert");

    let key = h.service.invalidate(&notes).await;
    assert_eq!(key.as_str(), "ccc.notes_abc123");
    assert_eq!(h.store.peek("ccc.notes_abc123").await, None);

    let read = h.service.read(&notes).await.expect("read");
    assert_eq!(read.provenance, Provenance::Backend);
    assert_eq!(read.cache_key, None);
    assert_eq!(read.document, doc(json!({"text": "hello"})));
    assert_eq!(h.store.peek("ccc.notes_abc123").await, None);

    let again = h.service.read(&notes).await.expect("second read");
    assert_eq!(again.provenance, Provenance::Backend);
    assert_eq!(h.backend.reads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalidate_is_idempotent_and_skips_the_backend() {
    let h = harness();
    let notes = target("notes", "never-cached");

    let first = h.service.invalidate(&notes).await;
    let second = h.service.invalidate(&notes).await;

    assert_eq!(first, second);
    assert_eq!(h.store.deletes.load(Ordering::SeqCst), 2);
    assert_eq!(h.backend.calls(), 0);
}

#[tokio::test]
async fn promote_copies_the_backend_version_with_requested_ttl() {
    let h = harness();
    let notes = target("notes", "abc123");
    h.backend.insert(&notes, doc(json!({"text": "v1"}))).await;

    let promoted = h
        .service
        .promote(&notes, Some(Duration::from_secs(60)))
        .await
        .expect("promote");
    assert_eq!(promoted.provenance, Provenance::Promoted);
    assert_eq!(h.store.ttls(), vec![Duration::from_secs(60)]);

    let read = h.service.read(&notes).await.expect("read");
    assert_eq!(read.provenance, Provenance::Cache);
    assert_eq!(read.document, doc(json!({"text": "v1"})));
}

#[tokio::test]
async fn default_ttl_applies_when_none_requested() {
    let h = harness();
    let notes = target("notes", "abc123");

    h.service
        .upsert(&notes, doc(json!({"n": 1})), None)
        .await
        .expect("upsert");

    assert_eq!(h.store.ttls(), vec![Duration::from_secs(3600)]);
}

#[tokio::test]
async fn cache_outage_never_fails_requests() {
    let h = harness();
    let notes = target("notes", "abc123");
    h.backend.insert(&notes, doc(json!({"text": "v1"}))).await;
    h.store.set_down(true);

    let read = h.service.read(&notes).await.expect("read despite outage");
    assert_eq!(read.provenance, Provenance::Backend);

    let written = h
        .service
        .upsert(&notes, doc(json!({"text": "v2"})), None)
        .await
        .expect("upsert despite outage");
    assert_eq!(written.provenance, Provenance::BackendWrite);
    assert_eq!(
        h.backend.stored(&notes).await,
        Some(doc(json!({"text": "v2"})))
    );

    h.service
        .promote(&notes, None)
        .await
        .expect("promote despite outage");
    h.service.invalidate(&notes).await;

    h.store.set_down(false);
    assert_eq!(h.store.peek("ccc.notes_abc123").await, None);
}

#[tokio::test]
async fn backend_outage_fails_writes_and_leaves_cache_untouched() {
    let h = harness();
    let notes = target("notes", "abc123");
    h.store.poke("ccc.notes_abc123", r#"{"text":"cached"}"#).await;
    h.backend.set_mode(BackendMode::Unreachable).await;

    let err = h
        .service
        .upsert(&notes, doc(json!({"text": "new"})), None)
        .await
        .expect_err("backend down");
    assert!(matches!(err, AppError::Unavailable(_)), "{err:?}");
    assert_eq!(h.store.sets.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.store.peek("ccc.notes_abc123").await.as_deref(),
        Some(r#"{"text":"cached"}"#)
    );

    let err = h.service.promote(&notes, None).await.expect_err("backend down");
    assert!(matches!(err, AppError::Unavailable(_)), "{err:?}");
    assert_eq!(h.store.sets.load(Ordering::SeqCst), 0);

    // A warm entry still serves reads while the backend is away.
    let read = h.service.read(&notes).await.expect("cached read");
    assert_eq!(read.provenance, Provenance::Cache);
}

#[tokio::test]
async fn backend_outage_on_cold_cache_fails_reads() {
    let h = harness();
    let notes = target("notes", "abc123");
    h.backend.set_mode(BackendMode::Unreachable).await;

    let err = h.service.read(&notes).await.expect_err("backend down");
    assert!(matches!(err, AppError::Unavailable(_)), "{err:?}");
    assert_eq!(h.store.gets.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.sets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalidate_then_read_of_missing_document_is_not_found() {
    let h = harness();
    let notes = target("notes", "missing");
    h.store.poke("ccc.notes_missing", r#"{"text":"stale"}"#).await;

    h.service.invalidate(&notes).await;
    let err = h.service.read(&notes).await.expect_err("nothing left");

    assert!(matches!(err, AppError::NotFound { .. }), "{err:?}");
    assert_eq!(h.backend.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn backend_auth_failures_are_reported_separately() {
    let h = harness();
    let notes = target("notes", "abc123");
    h.backend.set_mode(BackendMode::Forbidden).await;

    let err = h.service.read(&notes).await.expect_err("forbidden");
    assert!(matches!(err, AppError::BackendAuth(_)), "{err:?}");
}

#[tokio::test]
async fn missing_documents_are_not_found() {
    let h = harness();
    let notes = target("notes", "missing");

    let err = h.service.read(&notes).await.expect_err("missing");
    assert!(matches!(err, AppError::NotFound { .. }), "{err:?}");

    let err = h.service.promote(&notes, None).await.expect_err("missing");
    assert!(matches!(err, AppError::NotFound { .. }), "{err:?}");
    assert_eq!(h.store.sets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upsert_drops_backend_metadata_fields() {
    let h = harness();
    let notes = target("notes", "abc123");

    let written = h
        .service
        .upsert(
            &notes,
            doc(json!({"_id": "other", "_rev": "1-abc", "text": "hi"})),
            None,
        )
        .await
        .expect("upsert");

    assert_eq!(written.document, doc(json!({"text": "hi"})));
    assert_eq!(
        h.backend.stored(&notes).await,
        Some(doc(json!({"text": "hi"})))
    );
    assert_eq!(
        h.store.peek("ccc.notes_abc123").await.as_deref(),
        Some(r#"{"text":"hi"}"#)
    );
}

#[tokio::test]
async fn undecodable_cache_entry_falls_through_to_backend() {
    let h = harness();
    let notes = target("notes", "abc123");
    h.backend.insert(&notes, doc(json!({"text": "fresh"}))).await;
    h.store.poke("ccc.notes_abc123", "{not json").await;

    let read = h.service.read(&notes).await.expect("read");
    assert_eq!(read.provenance, Provenance::Backend);
    assert_eq!(read.document, doc(json!({"text": "fresh"})));
    assert_eq!(h.backend.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn distinct_collections_never_share_cache_entries() {
    let h = harness();
    let left = target("ab_cd", "x");
    let right = target("ab", "cd_x");

    h.service
        .upsert(&left, doc(json!({"side": "left"})), None)
        .await
        .expect("upsert left");
    h.service
        .upsert(&right, doc(json!({"side": "right"})), None)
        .await
        .expect("upsert right");

    let read = h.service.read(&left).await.expect("read left");
    assert_eq!(read.document, doc(json!({"side": "left"})));
}
