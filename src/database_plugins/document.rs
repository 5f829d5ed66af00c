// ABOUTME: JSON document helpers shared by the volatile and durable backends
// ABOUTME: Filter evaluation, sort ordering, projection and update application over documents
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Every backend stores an entity as the JSON object produced by its `Serialize`
//! impl. The functions here are the single definition of how a filter, a sort,
//! a projection and an update act on such an object; the durable backend
//! compiles the same rules to SQL and is tested against these.

use std::borrow::Cow;
use std::cmp::Ordering;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use super::filter::{FieldValue, Filter, Projection, Sort, SortDirection, Update, UpdateOp};
use crate::constants::fields;
use crate::errors::{AppError, AppResult};
use crate::models::Entity;

/// A stored JSON object
pub type Document = Map<String, Value>;

/// Serialize an entity into a document
///
/// # Errors
///
/// Returns a serialization error if the entity does not serialize to an object
pub fn to_document<T: Serialize>(item: &T) -> AppResult<Document> {
    match serde_json::to_value(item)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::serialization(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Deserialize a document into an entity
///
/// # Errors
///
/// Returns a serialization error if the document does not match the entity shape
pub fn from_document<T: DeserializeOwned>(document: Document) -> AppResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

/// Identifier stored in a document
#[must_use]
pub fn document_id(document: &Document) -> Option<Uuid> {
    document
        .get(fields::ID)
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

/// Resolve a dotted path; `None` when any segment is missing
#[must_use]
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn from_json(number: &Number) -> Self {
        number.as_i64().map_or_else(
            || Self::Float(number.as_f64().unwrap_or(f64::NAN)),
            Self::Int,
        )
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn compare(self, other: Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(&b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal),
        }
    }
}

/// A stored value reduced to its comparison class
#[derive(Debug, Clone)]
enum Scalar<'a> {
    Null,
    Number(Num),
    Text(Cow<'a, str>),
    /// Arrays and objects: never equal to a scalar
    Container(&'a Value),
}

impl<'a> Scalar<'a> {
    fn from_stored(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Null,
            Some(Value::Bool(b)) => Self::Number(Num::Int(i64::from(*b))),
            Some(Value::Number(n)) => Self::Number(Num::from_json(n)),
            Some(Value::String(s)) => Self::Text(Cow::Borrowed(s.as_str())),
            Some(container) => Self::Container(container),
        }
    }

    fn from_operand(value: &'a FieldValue) -> Self {
        match value {
            FieldValue::Null => Self::Null,
            FieldValue::Bool(b) => Self::Number(Num::Int(i64::from(*b))),
            FieldValue::Int(i) => Self::Number(Num::Int(*i)),
            FieldValue::Float(f) => Self::Number(Num::Float(*f)),
            FieldValue::Text(s) => Self::Text(Cow::Borrowed(s.as_str())),
        }
    }

    /// Same-class comparison; `None` across classes
    fn compare_same_class(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Some(a.compare(*b)),
            (Self::Text(a), Self::Text(b)) => Some(a.as_ref().cmp(b.as_ref())),
            _ => None,
        }
    }

    fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            _ => self.compare_same_class(other) == Some(Ordering::Equal),
        }
    }

    /// Total order used for sorting: null < numeric < text; containers sort
    /// as their JSON text
    fn sort_key(self) -> Self {
        match self {
            Self::Container(value) => Self::Text(Cow::Owned(value.to_string())),
            other => other,
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Number(_) => 1,
            Self::Text(_) | Self::Container(_) => 2,
        }
    }

    fn total_cmp(&self, other: &Self) -> Ordering {
        self.compare_same_class(other)
            .unwrap_or_else(|| self.rank().cmp(&other.rank()))
    }
}

/// Evaluate a filter against a document
#[must_use]
pub fn matches(document: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::Eq(field, value) => field_equals(document, field, value),
        Filter::Ne(field, value) => !field_equals(document, field, value),
        Filter::In(field, values) => values
            .iter()
            .any(|value| field_equals(document, field, value)),
        Filter::Cmp(field, comparison, value) => {
            let stored = Scalar::from_stored(lookup(document, field));
            stored
                .compare_same_class(&Scalar::from_operand(value))
                .is_some_and(|ordering| comparison.accepts(ordering))
        }
        Filter::And(filters) => filters.iter().all(|inner| matches(document, inner)),
    }
}

fn field_equals(document: &Document, field: &str, value: &FieldValue) -> bool {
    Scalar::from_stored(lookup(document, field)).equals(&Scalar::from_operand(value))
}

/// Compare two documents by sort keys, ties broken by id ascending
#[must_use]
pub fn compare(a: &Document, b: &Document, sort: &Sort) -> Ordering {
    for (field, direction) in sort.keys() {
        let left = Scalar::from_stored(lookup(a, field)).sort_key();
        let right = Scalar::from_stored(lookup(b, field)).sort_key();
        let ordering = match direction {
            SortDirection::Ascending => left.total_cmp(&right),
            SortDirection::Descending => right.total_cmp(&left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    let id_of = |document: &Document| {
        document
            .get(fields::ID)
            .and_then(Value::as_str)
            .map(str::to_owned)
    };
    id_of(a).cmp(&id_of(b))
}

/// Keep only the projected fields (and the id)
#[must_use]
pub fn project(document: &Document, projection: &Projection) -> Document {
    let mut projected = Document::new();
    if let Some(id) = document.get(fields::ID) {
        projected.insert(fields::ID.to_owned(), id.clone());
    }
    for field in projection.fields() {
        if let Some(value) = lookup(document, field) {
            set_path(&mut projected, field, value.clone());
        }
    }
    projected
}

/// Mean of the numeric values of `field` over `documents`
#[must_use]
pub fn average<'a>(documents: impl IntoIterator<Item = &'a Document>, field: &str) -> Option<f64> {
    let (sum, count) = documents
        .into_iter()
        .filter_map(|document| match lookup(document, field) {
            Some(Value::Number(n)) => n.as_f64(),
            _ => None,
        })
        .fold((0.0_f64, 0_u64), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn set_path(document: &mut Document, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };
    let mut current = document;
    for segment in segments {
        let slot = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
    current.insert(last.to_owned(), value);
}

fn parent_mut<'a>(document: &'a mut Document, path: &'a str) -> AppResult<Option<(&'a mut Document, &'a str)>> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return Ok(None);
    };
    let mut current = document;
    for segment in segments {
        match current.get_mut(segment) {
            Some(Value::Object(next)) => current = next,
            None | Some(Value::Null) => return Ok(None),
            Some(_) => {
                return Err(AppError::invalid_input(format!(
                    "Cannot address '{path}': '{segment}' is not an object"
                )))
            }
        }
    }
    Ok(Some((current, last)))
}

/// Apply an update in place
///
/// # Errors
///
/// Returns `InvalidInput` if an increment targets a non-numeric field or a
/// path crosses a non-object value
pub fn apply_update(document: &mut Document, update: &Update) -> AppResult<()> {
    for op in update.ops() {
        match op {
            UpdateOp::Set(field, value) => {
                if let Some(Value::String(_) | Value::Number(_) | Value::Bool(_)) =
                    first_scalar_on_path(document, field)
                {
                    return Err(AppError::invalid_input(format!(
                        "Cannot set '{field}': an intermediate field is not an object"
                    )));
                }
                set_path(document, field, value.to_json());
            }
            UpdateOp::Unset(field) => {
                if let Some((parent, key)) = parent_mut(document, field)? {
                    parent.remove(key);
                }
            }
            UpdateOp::Inc(field, amount) => {
                let current = lookup(document, field).cloned().unwrap_or(Value::Null);
                let next = increment(&current, amount).ok_or_else(|| {
                    AppError::invalid_input(format!("Cannot increment non-numeric field '{field}'"))
                })?;
                set_path(document, field, next);
            }
        }
    }
    Ok(())
}

/// First non-object, non-null value found on the intermediate segments of `path`
fn first_scalar_on_path<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = document;
    for segment in &segments[..segments.len().saturating_sub(1)] {
        match current.get(*segment) {
            Some(Value::Object(next)) => current = next,
            Some(Value::Null) | None => return None,
            Some(other) => return Some(other),
        }
    }
    None
}

fn increment(current: &Value, amount: &FieldValue) -> Option<Value> {
    let base = match current {
        Value::Null => Num::Int(0),
        Value::Number(n) => Num::from_json(n),
        _ => return None,
    };
    let delta = match amount {
        FieldValue::Int(i) => Num::Int(*i),
        FieldValue::Float(f) => Num::Float(*f),
        _ => return None,
    };
    match (base, delta) {
        (Num::Int(a), Num::Int(b)) => Some(a.checked_add(b).map_or_else(
            || FieldValue::Float(a as f64 + b as f64).to_json(),
            |sum| Value::Number(Number::from(sum)),
        )),
        (a, b) => Some(FieldValue::Float(a.as_f64() + b.as_f64()).to_json()),
    }
}

/// Apply `update` to a copy of `document` and normalize it through `T`
///
/// Returns `Ok(None)` when the normalized result equals the original, i.e. the
/// update modified nothing.
///
/// # Errors
///
/// Returns `InvalidInput` if the update cannot be applied or leaves a
/// document that is no longer a valid `T`
pub fn revise<T: Entity>(document: &Document, update: &Update) -> AppResult<Option<Document>> {
    let mut candidate = document.clone();
    apply_update(&mut candidate, update)?;
    let normalized = normalize::<T>(candidate)?;
    Ok((normalized != *document).then_some(normalized))
}

/// Build the document inserted by an upsert that matched nothing
///
/// The document is made of the filter's top-level equality constraints plus
/// the update, under a fresh identifier, and must form a valid `T`.
///
/// # Errors
///
/// Returns `InvalidInput` if the result is not a valid `T`
pub fn upsert_document<T: Entity>(filter: &Filter, update: &Update) -> AppResult<Document> {
    let mut document = Document::new();
    for (field, value) in filter.equalities() {
        if field != fields::ID {
            set_path(&mut document, field, value.to_json());
        }
    }
    apply_update(&mut document, update)?;
    document.insert(
        fields::ID.to_owned(),
        Value::String(Uuid::new_v4().to_string()),
    );
    normalize::<T>(document)
}

/// Round-trip a document through `T` so that stored documents always have
/// the entity's exact shape
fn normalize<T: Entity>(document: Document) -> AppResult<Document> {
    let item: T = serde_json::from_value(Value::Object(document)).map_err(|e| {
        AppError::invalid_input(format!("Document is not a valid {} item: {e}", T::COLLECTION))
    })?;
    to_document(&item)
}
