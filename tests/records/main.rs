//! Integration tests for DataService over in-memory collections.


use std::sync::{Arc, Mutex};

use data_service::bson::{doc, oid::ObjectId, Bson, Document};
use data_service::{
    ChangeEvent, ChangeKind, DataService, InMemoryCollection, ServiceError, ServiceOptions,
    StoreError, StoreWrite, INDEPENDENT_ID_LEN,
};
use flaky::FlakyCollection;

fn service(collection: &InMemoryCollection) -> DataService {
    ServiceOptions::new()
        .service_name("records-test")
        .default_collection(collection.clone())
        .build()
        .unwrap()
}

fn recording_service(
    collection: &InMemoryCollection,
) -> (DataService, Arc<Mutex<Vec<ChangeEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let service = ServiceOptions::new()
        .default_collection(collection.clone())
        .listener(move |event: &ChangeEvent| sink.lock().unwrap().push(event.clone()))
        .build()
        .unwrap();
    (service, events)
}

fn msgs(records: &[Document]) -> Vec<String> {
    let mut msgs: Vec<String> = records
        .iter()
        .map(|record| record.get_str("msg").unwrap().to_string())
        .collect();
    msgs.sort();
    msgs
}

#[tokio::test]
async fn hello_round_trip() {
    let collection = InMemoryCollection::new();
    let service = service(&collection);

    let saved = service.save(doc! { "msg": "hello" }).await.unwrap();
    assert_eq!(saved.kind, ChangeKind::Create);
    assert!(matches!(saved.write, StoreWrite::Inserted { .. }));

    let native_id = match saved.native_id() {
        Some(Bson::ObjectId(oid)) => *oid,
        other => panic!("expected an ObjectId, got {:?}", other),
    };
    let independent_id = saved.independent_id().unwrap().to_string();
    assert_eq!(independent_id.len(), INDEPENDENT_ID_LEN);

    assert_eq!(service.fetch_all().await.unwrap().len(), 1);

    // Every identity form resolves to the same record.
    let by_oid = service.fetch_one(native_id).await.unwrap().unwrap();
    let by_hex = service.fetch_one(native_id.to_hex()).await.unwrap().unwrap();
    let by_independent = service.fetch_one(&independent_id).await.unwrap().unwrap();
    let by_filter = service
        .fetch_one(doc! { "id": independent_id.as_str() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_oid, saved.record);
    assert_eq!(by_hex, saved.record);
    assert_eq!(by_independent, saved.record);
    assert_eq!(by_filter, saved.record);

    // Mutate and re-save: replaced in place.
    let mut record = by_hex;
    record.insert("msg", "hi");
    let resaved = service.save(record).await.unwrap();
    assert_eq!(resaved.kind, ChangeKind::Update);
    assert_eq!(resaved.native_id(), Some(&Bson::ObjectId(native_id)));
    match &resaved.write {
        StoreWrite::Replaced(outcome) => {
            assert_eq!(outcome.matched_count, 1);
            assert_eq!(outcome.modified_count, 1);
            assert!(outcome.upserted_id.is_none());
        }
        other => panic!("expected a replace, got {:?}", other),
    }

    let reloaded = service.fetch_one(native_id.to_hex()).await.unwrap().unwrap();
    assert_eq!(reloaded.get_str("msg").unwrap(), "hi");
    assert_eq!(reloaded.get_str("id").unwrap(), independent_id);
    assert_eq!(collection.len().unwrap(), 1);

    let reloaded = service.fetch_one(&independent_id).await.unwrap().unwrap();
    assert_eq!(reloaded.get_str("msg").unwrap(), "hi");

    let removed = service.remove(native_id.to_hex()).await.unwrap();
    assert_eq!(removed.deleted_count, 1);
    assert!(service.fetch_one(native_id.to_hex()).await.unwrap().is_none());
    assert!(service.fetch_one(&independent_id).await.unwrap().is_none());
}

#[tokio::test]
async fn without_independent_ids() {
    let collection = InMemoryCollection::new();
    let service = ServiceOptions::new()
        .default_collection(collection.clone())
        .use_independent_ids(false)
        .build()
        .unwrap();
    assert!(!service.use_independent_ids());

    let saved = service.save(doc! { "msg": "world" }).await.unwrap();
    assert!(saved.native_id().is_some());
    assert!(saved.independent_id().is_none());
    assert!(!saved.record.contains_key("id"));

    let native_hex = match saved.native_id() {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        other => panic!("expected an ObjectId, got {:?}", other),
    };
    assert_eq!(
        service.create_id_query(native_hex.as_str()),
        doc! { "_id": ObjectId::parse_str(&native_hex).unwrap() }
    );
    assert!(service.fetch_one(native_hex).await.unwrap().is_some());
}

#[tokio::test]
async fn resave_is_idempotent() {
    let collection = InMemoryCollection::new();
    let service = service(&collection);

    let saved = service.save(doc! { "msg": "hello" }).await.unwrap();
    let again = service.save(saved.record.clone()).await.unwrap();
    let third = service.save(again.record.clone()).await.unwrap();

    assert_eq!(third.record, saved.record);
    assert_eq!(collection.len().unwrap(), 1);
    match third.write {
        StoreWrite::Replaced(outcome) => assert_eq!(outcome.modified_count, 0),
        other => panic!("expected a replace, got {:?}", other),
    }
}

#[tokio::test]
async fn save_with_unknown_native_id_upserts() {
    let collection = InMemoryCollection::new();
    let service = service(&collection);
    let oid = ObjectId::new();

    let saved = service
        .save(doc! { "_id": oid, "msg": "imported" })
        .await
        .unwrap();
    assert_eq!(saved.kind, ChangeKind::Update);
    match &saved.write {
        StoreWrite::Replaced(outcome) => {
            assert_eq!(outcome.upserted_id, Some(Bson::ObjectId(oid)));
        }
        other => panic!("expected a replace, got {:?}", other),
    }

    // The replace path leaves `id` alone.
    assert!(saved.independent_id().is_none());
    assert!(service.fetch_one(oid).await.unwrap().is_some());
}

#[tokio::test]
async fn fetch_empty_and_unmatched() {
    let collection = InMemoryCollection::new();
    let service = service(&collection);

    assert!(service.fetch_all().await.unwrap().is_empty());
    assert!(service.fetch(doc! { "msg": "hello" }).await.unwrap().is_empty());
    assert!(service.fetch_one("nothing").await.unwrap().is_none());

    service.save(doc! { "msg": "hello" }).await.unwrap();
    assert!(service.fetch(doc! { "name": "Kolz" }).await.unwrap().is_empty());
}

#[tokio::test]
async fn save_many_then_fetch() {
    let collection = InMemoryCollection::new();
    let service = service(&collection);

    let results = service
        .save_many(vec![doc! { "msg": "hello" }, doc! { "msg": "world" }])
        .await;
    assert_eq!(results.len(), 2);
    let saved: Vec<Document> = results
        .into_iter()
        .map(|result| result.unwrap().into_record())
        .collect();
    assert_eq!(saved[0].get_str("msg").unwrap(), "hello");
    assert_eq!(saved[1].get_str("msg").unwrap(), "world");

    let all = service.fetch_all().await.unwrap();
    assert_eq!(msgs(&all), vec!["hello", "world"]);
    for record in &all {
        assert!(record.get_object_id("_id").is_ok());
        assert!(!record.get_str("id").unwrap().is_empty());
    }

    let ids: Vec<String> = all
        .iter()
        .map(|record| record.get_str("id").unwrap().to_string())
        .collect();
    let hexes: Vec<String> = all
        .iter()
        .map(|record| record.get_object_id("_id").unwrap().to_hex())
        .collect();

    let by_in = service
        .fetch(doc! { "id": { "$in": ids.clone() } })
        .await
        .unwrap();
    assert_eq!(by_in.len(), 2);

    assert!(service.fetch_one(ids.clone()).await.unwrap().is_some());
    assert!(service.fetch_one(hexes.clone()).await.unwrap().is_some());

    let by_ids = service.fetch(service.create_id_query(ids)).await.unwrap();
    assert_eq!(msgs(&by_ids), vec!["hello", "world"]);

    let by_hexes = service.fetch(service.create_id_query(hexes)).await.unwrap();
    assert_eq!(msgs(&by_hexes), vec!["hello", "world"]);
}

#[tokio::test]
async fn id_list_query_matches_exactly_its_members() {
    let collection = InMemoryCollection::new();
    let service = service(&collection);

    let a = service.save(doc! { "msg": "a" }).await.unwrap();
    let b = service.save(doc! { "msg": "b" }).await.unwrap();
    service.save(doc! { "msg": "c" }).await.unwrap();

    let query = service.create_id_query(vec![
        a.native_id().cloned().unwrap(),
        Bson::String(b.independent_id().unwrap().to_string()),
    ]);
    let matched = service.fetch(query).await.unwrap();
    assert_eq!(msgs(&matched), vec!["a", "b"]);

    let none = service
        .fetch(service.create_id_query(Vec::<String>::new()))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn numeric_native_ids() {
    let collection = InMemoryCollection::new();
    let service = service(&collection);

    service.save(doc! { "_id": 42, "msg": "answer" }).await.unwrap();

    let found = service.fetch_one(42_i32).await.unwrap().unwrap();
    assert_eq!(found.get_str("msg").unwrap(), "answer");

    // Numbers compare by value; the string "42" is a different identity.
    assert!(service.fetch_one(42_i64).await.unwrap().is_some());
    assert!(service.fetch_one("42").await.unwrap().is_none());

    // Re-saving under a wider integer replaces the same record.
    let resaved = service
        .save(doc! { "_id": 42_i64, "msg": "still the answer" })
        .await
        .unwrap();
    assert_eq!(resaved.kind, ChangeKind::Update);
    assert_eq!(collection.len().unwrap(), 1);
    let found = service.fetch_one(42_i32).await.unwrap().unwrap();
    assert_eq!(found.get_str("msg").unwrap(), "still the answer");

    assert_eq!(service.remove(42_i32).await.unwrap().deleted_count, 1);
}

#[tokio::test]
async fn remove_by_filter_deletes_all_matches() {
    let collection = InMemoryCollection::new();
    let service = service(&collection);

    service
        .save_many(vec![
            doc! { "kind": "draft" },
            doc! { "kind": "draft" },
            doc! { "kind": "final" },
        ])
        .await;

    let removed = service.remove(doc! { "kind": "draft" }).await.unwrap();
    assert_eq!(removed.deleted_count, 2);
    assert_eq!(removed.query, doc! { "kind": "draft" });
    assert_eq!(service.fetch_all().await.unwrap().len(), 1);

    let removed = service.remove("missing").await.unwrap();
    assert_eq!(removed.deleted_count, 0);
}

#[tokio::test]
async fn notifications_follow_each_write() {
    let collection = InMemoryCollection::new();
    let (service, events) = recording_service(&collection);

    let saved = service.save(doc! { "msg": "hello" }).await.unwrap();
    service.fetch_all().await.unwrap();
    service.fetch_one(saved.independent_id().unwrap()).await.unwrap();

    let mut record = saved.record.clone();
    record.insert("msg", "hi");
    let resaved = service.save(record).await.unwrap();

    let hex = saved.native_id().unwrap().as_object_id().unwrap().to_hex();
    let removed = service.remove(hex).await.unwrap();

    let events = events.lock().unwrap();
    let kinds: Vec<ChangeKind> = events.iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        vec![ChangeKind::Create, ChangeKind::Update, ChangeKind::Delete]
    );
    assert!(events.iter().all(|event| event.label == "object-change"));
    assert_eq!(events[0].payload, saved.record);
    assert_eq!(events[1].payload, resaved.record);
    assert_eq!(events[2].payload, removed.query);
}

#[tokio::test]
async fn custom_event_label_and_channel_listener() {
    let collection = InMemoryCollection::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ChangeEvent>();
    let service = ServiceOptions::new()
        .default_collection(collection)
        .event_label("records")
        .listener(tx)
        .build()
        .unwrap();

    service.save(doc! { "msg": "hello" }).await.unwrap();
    service.remove(doc! { "msg": "hello" }).await.unwrap();

    let created = rx.recv().await.unwrap();
    assert_eq!(created.label, "records");
    assert_eq!(created.kind, ChangeKind::Create);

    let deleted = rx.recv().await.unwrap();
    assert_eq!(deleted.kind, ChangeKind::Delete);
    assert_eq!(deleted.payload, doc! { "msg": "hello" });
}

#[tokio::test]
async fn save_many_failures_are_independent() {
    let flaky = FlakyCollection::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let service = ServiceOptions::new()
        .default_collection(flaky)
        .listener(move |event: &ChangeEvent| sink.lock().unwrap().push(event.kind))
        .build()
        .unwrap();

    let results = service
        .save_many(vec![
            doc! { "msg": "first" },
            doc! { "msg": "broken", "fail": true },
            doc! { "msg": "third" },
        ])
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0].as_ref().unwrap().record.get_str("msg").unwrap(),
        "first"
    );
    assert_eq!(
        results[1].as_ref().unwrap_err(),
        &ServiceError::Store(StoreError::Backend("connection reset".into()))
    );
    assert_eq!(
        results[2].as_ref().unwrap().record.get_str("msg").unwrap(),
        "third"
    );

    assert_eq!(msgs(&service.fetch_all().await.unwrap()), vec!["first", "third"]);

    // Only the successful writes notify.
    assert_eq!(events.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn duplicate_native_id_on_insert_propagates() {
    let collection = InMemoryCollection::new();
    let service = service(&collection);

    let saved = service.save(doc! { "msg": "hello" }).await.unwrap();

    // `save` would take the replace path, so insert through the collection.
    let err = data_service::Collection::insert_one(&collection, saved.record.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey { .. }));
}

#[tokio::test]
async fn named_collections_are_isolated() {
    let notes = InMemoryCollection::new();
    let archive = InMemoryCollection::new();
    let service = ServiceOptions::new()
        .default_collection(notes.clone())
        .collection("archive", archive.clone())
        .build()
        .unwrap();

    service.save(doc! { "msg": "current" }).await.unwrap();
    let archived = service
        .save_in("archive", doc! { "msg": "old" })
        .await
        .unwrap();

    assert_eq!(msgs(&service.fetch_all().await.unwrap()), vec!["current"]);
    assert_eq!(
        msgs(&service.fetch_in("archive", doc! {}).await.unwrap()),
        vec!["old"]
    );

    let id = archived.independent_id().unwrap().to_string();
    assert!(service.fetch_one(&id).await.unwrap().is_none());
    assert!(service.fetch_one_in("archive", &id).await.unwrap().is_some());

    let results = service
        .save_many_in("archive", vec![doc! { "msg": "older" }])
        .await;
    assert!(results[0].is_ok());
    assert_eq!(archive.len().unwrap(), 2);

    assert_eq!(service.remove_in("archive", &id).await.unwrap().deleted_count, 1);
    assert_eq!(archive.len().unwrap(), 1);
    assert_eq!(notes.len().unwrap(), 1);

    let err = service.fetch_in("missing", doc! {}).await.unwrap_err();
    assert_eq!(err, ServiceError::UnknownCollection("missing".into()));
}

#[test]
fn generated_ids_are_distinct() {
    let service = service(&InMemoryCollection::new());
    let a = service.generate_id();
    let b = service.generate_id();
    assert_ne!(a, b);
    assert_eq!(a.len(), INDEPENDENT_ID_LEN);
}

#[cfg(feature = "emitter")]
#[tokio::test]
async fn emitter_listener_receives_json_payloads() {
    use data_service::{EmitterListener, EventEmitter};

    let listener = EmitterListener::new(EventEmitter::new());
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    listener.on("object-change", move |payload: String| {
        sink.lock().unwrap().push(payload);
    });

    let service = ServiceOptions::new()
        .default_collection(InMemoryCollection::new())
        .listener(listener)
        .build()
        .unwrap();

    service.save(doc! { "msg": "hello" }).await.unwrap();
    service.remove(doc! { "msg": "hello" }).await.unwrap();

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 2);

    let created: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
    assert_eq!(created["event"], "object-change");
    assert_eq!(created["kind"], "create");
    assert_eq!(created["payload"]["msg"], "hello");

    let deleted: serde_json::Value = serde_json::from_str(&received[1]).unwrap();
    assert_eq!(deleted["kind"], "delete");
}
