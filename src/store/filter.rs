//! Filter evaluation for in-process collections.
//!
//! Supports the subset of the MongoDB query language the service produces
//! and callers commonly hand-write: field equality (dotted paths, array
//! containment, numeric equality across widths), `$or` / `$and` / `$nor`, and
//! the field operators `$eq`, `$ne`, `$in`, `$nin`, `$exists`.

use bson::{Bson, Document};

use super::StoreError;

/// Check that every clause of `filter` is supported, independent of any document.
///
/// `matches` short-circuits, so it only reports an unsupported clause it reaches.
pub fn validate(filter: &Document) -> Result<(), StoreError> {
    for (key, condition) in filter {
        match key.as_str() {
            "$or" | "$and" | "$nor" => {
                for clause in clauses(condition, key)? {
                    validate(clause)?;
                }
            }
            op if op.starts_with('$') => {
                return Err(StoreError::UnsupportedFilter(format!(
                    "top-level operator {}",
                    op
                )))
            }
            _ => {
                if let Some(operators) = is_operator_document(condition) {
                    for (op, operand) in operators {
                        match op.as_str() {
                            "$eq" | "$ne" | "$exists" => {}
                            "$in" | "$nin" => {
                                candidates(operand, op)?;
                            }
                            other => {
                                return Err(StoreError::UnsupportedFilter(format!(
                                    "field operator {}",
                                    other
                                )))
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Returns true when `document` satisfies every clause of `filter`.
pub fn matches(document: &Document, filter: &Document) -> Result<bool, StoreError> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$or" => {
                let mut any = false;
                for clause in clauses(condition, "$or")? {
                    if matches(document, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$and" => {
                let mut all = true;
                for clause in clauses(condition, "$and")? {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$nor" => {
                let mut none = true;
                for clause in clauses(condition, "$nor")? {
                    if matches(document, clause)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            op if op.starts_with('$') => {
                return Err(StoreError::UnsupportedFilter(format!(
                    "top-level operator {}",
                    op
                )))
            }
            path => field_matches(lookup(document, path), condition)?,
        };

        if !matched {
            return Ok(false);
        }
    }

    Ok(true)
}

fn clauses<'a>(condition: &'a Bson, op: &str) -> Result<Vec<&'a Document>, StoreError> {
    let items = match condition {
        Bson::Array(items) if !items.is_empty() => items,
        _ => {
            return Err(StoreError::UnsupportedFilter(format!(
                "{} requires a non-empty array",
                op
            )))
        }
    };

    items
        .iter()
        .map(|item| match item {
            Bson::Document(clause) => Ok(clause),
            other => Err(StoreError::UnsupportedFilter(format!(
                "{} entries must be documents, got {:?}",
                op,
                other.element_type()
            ))),
        })
        .collect()
}

/// Resolve a dotted path such as `address.city` against nested documents.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn is_operator_document(condition: &Bson) -> Option<&Document> {
    match condition {
        Bson::Document(inner)
            if !inner.is_empty() && inner.keys().all(|key| key.starts_with('$')) =>
        {
            Some(inner)
        }
        _ => None,
    }
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> Result<bool, StoreError> {
    let Some(operators) = is_operator_document(condition) else {
        return Ok(equals(value, condition));
    };

    for (op, operand) in operators {
        let matched = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$in" => candidates(operand, "$in")?
                .iter()
                .any(|candidate| equals(value, candidate)),
            "$nin" => !candidates(operand, "$nin")?
                .iter()
                .any(|candidate| equals(value, candidate)),
            "$exists" => value.is_some() == truthy(operand),
            other => {
                return Err(StoreError::UnsupportedFilter(format!(
                    "field operator {}",
                    other
                )))
            }
        };

        if !matched {
            return Ok(false);
        }
    }

    Ok(true)
}

fn candidates<'a>(operand: &'a Bson, op: &str) -> Result<&'a Vec<Bson>, StoreError> {
    match operand {
        Bson::Array(items) => Ok(items),
        _ => Err(StoreError::UnsupportedFilter(format!(
            "{} requires an array",
            op
        ))),
    }
}

fn truthy(operand: &Bson) -> bool {
    match operand {
        Bson::Boolean(b) => *b,
        Bson::Null | Bson::Undefined => false,
        other => as_f64(other).map(|n| n != 0.0).unwrap_or(true),
    }
}

/// Missing fields equal `null`; arrays match when any element is equal.
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(actual) => {
            same_value(actual, expected)
                || matches!(
                    actual,
                    Bson::Array(items) if items.iter().any(|item| same_value(item, expected))
                )
        }
    }
}

/// Equality with numbers compared by value across widths.
pub(crate) fn same_value(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}
