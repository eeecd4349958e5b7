//! Identifier queries and their normalization into store filters.

use bson::{doc, oid::ObjectId, Bson, Document};

use crate::identity::{INDEPENDENT_ID_FIELD, NATIVE_ID_FIELD};

/// What a caller can hand to `fetch_one` / `remove`.
///
/// Conversions exist for filter documents, strings, object ids, integers,
/// raw `Bson` values and lists of any of those.
#[derive(Debug, Clone, PartialEq)]
pub enum IdQuery {
    /// A native filter, passed through unchanged.
    Filter(Document),
    /// A single identifier.
    Id(Bson),
    /// Several identifiers; matches a record equal to any of them.
    Ids(Vec<Bson>),
}

/// Turn `query` into a store filter.
///
/// - a 24-character hex string matches `_id` as an `ObjectId`
/// - any other string or scalar matches `_id` literally
/// - with `use_independent_ids`, string ids also match the `id` field
/// - a list becomes an `$or` of its normalized elements; an empty list matches nothing
pub fn normalize_id_query(query: IdQuery, use_independent_ids: bool) -> Document {
    match query {
        IdQuery::Filter(filter) => filter,
        IdQuery::Id(id) => normalize_single(id, use_independent_ids),
        IdQuery::Ids(ids) if ids.is_empty() => doc! { NATIVE_ID_FIELD: { "$in": [] } },
        IdQuery::Ids(ids) => {
            let clauses: Vec<Bson> = ids
                .into_iter()
                .map(|id| {
                    Bson::Document(normalize_id_query(IdQuery::from(id), use_independent_ids))
                })
                .collect();
            doc! { "$or": clauses }
        }
    }
}

fn normalize_single(id: Bson, use_independent_ids: bool) -> Document {
    match id {
        Bson::String(id) => {
            let native = match parse_object_id(&id) {
                Some(oid) => doc! { NATIVE_ID_FIELD: oid },
                None => doc! { NATIVE_ID_FIELD: id.as_str() },
            };

            if use_independent_ids {
                doc! { "$or": [native, { INDEPENDENT_ID_FIELD: id }] }
            } else {
                native
            }
        }
        Bson::Document(filter) => filter,
        Bson::Array(ids) => normalize_id_query(IdQuery::Ids(ids), use_independent_ids),
        // Numbers, booleans, ObjectIds, ...: literal native identity.
        other => doc! { NATIVE_ID_FIELD: other },
    }
}

fn parse_object_id(id: &str) -> Option<ObjectId> {
    if id.len() != 24 {
        return None;
    }
    ObjectId::parse_str(id).ok()
}

impl From<Document> for IdQuery {
    fn from(filter: Document) -> Self {
        IdQuery::Filter(filter)
    }
}

impl From<&Document> for IdQuery {
    fn from(filter: &Document) -> Self {
        IdQuery::Filter(filter.clone())
    }
}

impl From<Bson> for IdQuery {
    fn from(value: Bson) -> Self {
        match value {
            Bson::Document(filter) => IdQuery::Filter(filter),
            Bson::Array(ids) => IdQuery::Ids(ids),
            id => IdQuery::Id(id),
        }
    }
}

impl From<&Bson> for IdQuery {
    fn from(value: &Bson) -> Self {
        IdQuery::from(value.clone())
    }
}

impl From<ObjectId> for IdQuery {
    fn from(id: ObjectId) -> Self {
        IdQuery::Id(Bson::ObjectId(id))
    }
}

impl From<String> for IdQuery {
    fn from(id: String) -> Self {
        IdQuery::Id(Bson::String(id))
    }
}

impl From<&String> for IdQuery {
    fn from(id: &String) -> Self {
        IdQuery::Id(Bson::String(id.clone()))
    }
}

impl From<&str> for IdQuery {
    fn from(id: &str) -> Self {
        IdQuery::Id(Bson::String(id.to_string()))
    }
}

impl From<i32> for IdQuery {
    fn from(id: i32) -> Self {
        IdQuery::Id(Bson::Int32(id))
    }
}

impl From<i64> for IdQuery {
    fn from(id: i64) -> Self {
        IdQuery::Id(Bson::Int64(id))
    }
}

impl<T: Into<Bson>> From<Vec<T>> for IdQuery {
    fn from(ids: Vec<T>) -> Self {
        IdQuery::Ids(ids.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<Bson>> From<&[T]> for IdQuery {
    fn from(ids: &[T]) -> Self {
        IdQuery::Ids(ids.iter().cloned().map(Into::into).collect())
    }
}
