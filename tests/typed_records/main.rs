//! Integration tests for typed record access (`#[derive(Record)]`).


use data_service::bson::doc;
use data_service::{InMemoryCollection, Record, ServiceError, ServiceOptions};
use notes::{AuditEntry, Note, StrictCount};

#[test]
fn derive_sets_collection_names() {
    assert_eq!(Note::COLLECTION, "notes");
    assert_eq!(AuditEntry::COLLECTION, "audit_entrys");
}

#[tokio::test]
async fn typed_round_trip() {
    let notes = InMemoryCollection::new();
    let service = ServiceOptions::new()
        .collection("notes", notes.clone())
        .build()
        .unwrap();
    let records = service.records::<Note>();

    let saved = records.save(&Note::new("hello")).await.unwrap();
    let native_id = saved.native_id.unwrap();
    let independent_id = saved.id.clone().unwrap();
    assert_eq!(saved.msg, "hello");

    let by_native = records.fetch_one(native_id).await.unwrap().unwrap();
    let by_independent = records.fetch_one(&independent_id).await.unwrap().unwrap();
    assert_eq!(by_native, saved);
    assert_eq!(by_independent, saved);

    let mut edited = by_native;
    edited.msg = "hi".into();
    let resaved = records.save(&edited).await.unwrap();
    assert_eq!(resaved.native_id, Some(native_id));
    assert_eq!(notes.len().unwrap(), 1);

    let all = records.fetch_all().await.unwrap();
    assert_eq!(all, vec![resaved]);

    let matching = records.fetch(doc! { "msg": "hi" }).await.unwrap();
    assert_eq!(matching.len(), 1);

    let removed = records.remove(native_id.to_hex()).await.unwrap();
    assert_eq!(removed.deleted_count, 1);
    assert!(records.fetch_one(native_id).await.unwrap().is_none());
}

#[tokio::test]
async fn typed_save_many() {
    let service = ServiceOptions::new()
        .collection("notes", InMemoryCollection::new())
        .build()
        .unwrap();
    let records = service.records::<Note>();

    let results = records
        .save_many(&[Note::new("a"), Note::new("b")])
        .await;
    let saved: Vec<Note> = results.into_iter().map(Result::unwrap).collect();
    assert!(saved.iter().all(|note| note.native_id.is_some() && note.id.is_some()));
    assert_eq!(records.fetch_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn typed_records_use_their_own_collection() {
    let service = ServiceOptions::new()
        .default_collection(InMemoryCollection::new())
        .collection("notes", InMemoryCollection::new())
        .build()
        .unwrap();

    service.records::<Note>().save(&Note::new("typed")).await.unwrap();
    assert!(service.fetch_all().await.unwrap().is_empty());

    let err = service
        .records::<AuditEntry>()
        .save(&AuditEntry {
            action: "login".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::UnknownCollection("audit_entrys".into()));
}

#[tokio::test]
async fn decode_failures_are_serde_errors() {
    let service = ServiceOptions::new()
        .collection("notes", InMemoryCollection::new())
        .build()
        .unwrap();

    service.records::<Note>().save(&Note::new("hello")).await.unwrap();

    let err = service.records::<StrictCount>().fetch_all().await.unwrap_err();
    assert!(matches!(err, ServiceError::Serde(_)));
}
