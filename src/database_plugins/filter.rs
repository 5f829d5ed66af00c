// ABOUTME: Structural query language shared by every storage backend
// ABOUTME: Typed filters, sort keys, projections and field updates over JSON documents
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Query Language
//!
//! Filters are a small tagged expression tree instead of string-keyed maps, so
//! both backends interpret exactly the same operators:
//!
//! - a missing field reads as null, and `Eq(field, Null)` matches it
//! - booleans compare as the integers `0` and `1`
//! - integers and floats compare numerically
//! - ordering comparisons only match values of the same class (numeric or text)
//! - `In(field, [])` matches nothing
//!
//! Field names may address nested objects with dots (`privacy.attempts`) and
//! are restricted to ASCII letters, digits, `_` and `.`.

use chrono::{DateTime, Utc};
use serde_json::{Number, Value};
use uuid::Uuid;

use crate::constants::fields;
use crate::errors::{AppError, AppResult};
use crate::models::Privacy;

/// A scalar value a filter or update can carry
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// JSON null (also matches a missing field)
    Null,
    /// Boolean, compared as 0/1
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// UTF-8 text
    Text(String),
}

/// Comparison class of a non-null value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    /// Booleans, integers and floats
    Numeric,
    /// Strings
    Text,
}

impl FieldValue {
    /// Class used by ordering comparisons, `None` for null
    #[must_use]
    pub const fn class(&self) -> Option<ValueClass> {
        match self {
            Self::Null => None,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) => Some(ValueClass::Numeric),
            Self::Text(_) => Some(ValueClass::Text),
        }
    }

    /// Reject floats that have no JSON representation
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for NaN or an infinity
    pub fn validate(&self, field: &str) -> AppResult<()> {
        match self {
            Self::Float(f) if !f.is_finite() => Err(AppError::invalid_input(format!(
                "Value for '{field}' must be a finite number"
            ))),
            _ => Ok(()),
        }
    }

    /// JSON representation stored in documents
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Number(Number::from(*i)),
            Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Int(value.timestamp_millis())
    }
}

impl From<Privacy> for FieldValue {
    fn from(value: Privacy) -> Self {
        Self::Text(value.as_str().to_owned())
    }
}

impl<V: Into<Self>> From<Option<V>> for FieldValue {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Check that a field name is a dotted path of `[A-Za-z0-9_]` segments
///
/// # Errors
///
/// Returns `InvalidInput` for empty names, empty segments or other characters
pub fn validate_field(field: &str) -> AppResult<()> {
    let well_formed = !field.is_empty()
        && field.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        });
    if well_formed {
        Ok(())
    } else {
        Err(AppError::invalid_input(format!(
            "Invalid field name '{field}'"
        )))
    }
}

/// Comparison operator of a comparison filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

impl Comparison {
    /// SQL operator token
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    /// Whether `cmp` (stored value compared to the operand) satisfies the operator
    #[must_use]
    pub const fn accepts(self, cmp: std::cmp::Ordering) -> bool {
        match self {
            Self::Gt => cmp.is_gt(),
            Self::Gte => cmp.is_ge(),
            Self::Lt => cmp.is_lt(),
            Self::Lte => cmp.is_le(),
        }
    }
}

/// A structural predicate over document fields
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Matches every document
    #[default]
    All,
    /// Field equals value
    Eq(String, FieldValue),
    /// Field does not equal value (missing fields match unless the value is null)
    Ne(String, FieldValue),
    /// Field equals one of the values
    In(String, Vec<FieldValue>),
    /// Ordering comparison against a value of the same class
    Cmp(String, Comparison, FieldValue),
    /// Conjunction
    And(Vec<Filter>),
}

impl Filter {
    /// `field == value`
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    /// `field != value`
    #[must_use]
    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Ne(field.into(), value.into())
    }

    /// `field in values`
    #[must_use]
    pub fn is_in<V: Into<FieldValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// `field > value`
    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Cmp(field.into(), Comparison::Gt, value.into())
    }

    /// `field >= value`
    #[must_use]
    pub fn gte(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Cmp(field.into(), Comparison::Gte, value.into())
    }

    /// `field < value`
    #[must_use]
    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Cmp(field.into(), Comparison::Lt, value.into())
    }

    /// `field <= value`
    #[must_use]
    pub fn lte(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Cmp(field.into(), Comparison::Lte, value.into())
    }

    /// Match on the document identifier
    #[must_use]
    pub fn by_id(id: Uuid) -> Self {
        Self::eq(fields::ID, id)
    }

    /// Conjunction of `self` and `other`, flattening nested conjunctions
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::all_of([self, other])
    }

    /// Conjunction of several filters; `All` members are dropped
    #[must_use]
    pub fn all_of(filters: impl IntoIterator<Item = Self>) -> Self {
        let mut parts = Vec::new();
        for filter in filters {
            match filter {
                Self::All => {}
                Self::And(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }
        match parts.len() {
            0 => Self::All,
            1 => parts.remove(0),
            _ => Self::And(parts),
        }
    }

    /// Check every field name in the tree
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any field name is malformed
    pub fn validate(&self) -> AppResult<()> {
        match self {
            Self::All => Ok(()),
            Self::Eq(field, value) | Self::Ne(field, value) | Self::Cmp(field, _, value) => {
                validate_field(field)?;
                value.validate(field)
            }
            Self::In(field, values) => {
                validate_field(field)?;
                values.iter().try_for_each(|value| value.validate(field))
            }
            Self::And(filters) => filters.iter().try_for_each(Self::validate),
        }
    }

    /// Top-level equality constraints, used to seed upserted documents
    #[must_use]
    pub fn equalities(&self) -> Vec<(&str, &FieldValue)> {
        match self {
            Self::Eq(field, value) => vec![(field.as_str(), value)],
            Self::And(filters) => filters.iter().flat_map(Self::equalities).collect(),
            _ => Vec::new(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// Ordered sort keys; empty means insertion order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sort {
    keys: Vec<(String, SortDirection)>,
}

impl Sort {
    /// Insertion order
    #[must_use]
    pub const fn none() -> Self {
        Self { keys: Vec::new() }
    }

    /// Single ascending key
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self::none().then(field, SortDirection::Ascending)
    }

    /// Single descending key
    #[must_use]
    pub fn descending(field: impl Into<String>) -> Self {
        Self::none().then(field, SortDirection::Descending)
    }

    /// Append a secondary key
    #[must_use]
    pub fn then(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.keys.push((field.into(), direction));
        self
    }

    /// Sort keys in priority order
    #[must_use]
    pub fn keys(&self) -> &[(String, SortDirection)] {
        &self.keys
    }

    /// Whether no key was given
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Check every field name
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any field name is malformed
    pub fn validate(&self) -> AppResult<()> {
        self.keys.iter().try_for_each(|(field, _)| validate_field(field))
    }
}

/// Fields to keep when reading raw documents; the id is always kept
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    /// Keep only the named fields (plus `id`)
    #[must_use]
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Projected field names
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Check every field name
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any field name is malformed
    pub fn validate(&self) -> AppResult<()> {
        self.fields.iter().try_for_each(|field| validate_field(field))
    }
}

/// One field modification
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Set the field, creating intermediate objects
    Set(String, FieldValue),
    /// Remove the field if present
    Unset(String),
    /// Add a number to the field (a missing field counts as zero)
    Inc(String, FieldValue),
}

/// An ordered list of field modifications
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    /// Empty update
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Add a `Set`
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.ops.push(UpdateOp::Set(field.into(), value.into()));
        self
    }

    /// Add an `Unset`
    #[must_use]
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset(field.into()));
        self
    }

    /// Add an `Inc`
    #[must_use]
    pub fn inc(mut self, field: impl Into<String>, amount: impl Into<FieldValue>) -> Self {
        self.ops.push(UpdateOp::Inc(field.into(), amount.into()));
        self
    }

    /// Operations in application order
    #[must_use]
    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    /// Check field names and values, reject identifier writes and non-numeric increments
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the update cannot be applied to any document
    pub fn validate(&self) -> AppResult<()> {
        for op in &self.ops {
            let field = match op {
                UpdateOp::Unset(field) => field,
                UpdateOp::Set(field, value) => {
                    value.validate(field)?;
                    field
                }
                UpdateOp::Inc(field, amount) => {
                    if !matches!(amount, FieldValue::Int(_) | FieldValue::Float(_)) {
                        return Err(AppError::invalid_input(format!(
                            "Increment of '{field}' requires a number"
                        )));
                    }
                    amount.validate(field)?;
                    field
                }
            };
            validate_field(field)?;
            if field.split('.').next() == Some(fields::ID) {
                return Err(AppError::invalid_input("The id field cannot be updated"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_name_validation() {
        assert!(validate_field("privacy.attempts").is_ok());
        assert!(validate_field("created_at").is_ok());
        assert!(validate_field("").is_err());
        assert!(validate_field("a..b").is_err());
        assert!(validate_field("name') OR 1=1 --").is_err());
        assert!(validate_field("$.user").is_err());
    }

    #[test]
    fn test_and_flattens_and_drops_all() {
        let filter = Filter::eq("user", "a")
            .and(Filter::All)
            .and(Filter::gt("rating", 2));
        match filter {
            Filter::And(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected conjunction, got {other:?}"),
        }
        assert_eq!(Filter::All.and(Filter::All), Filter::All);
        assert_eq!(
            Filter::All.and(Filter::eq("a", 1)),
            Filter::eq("a", 1)
        );
    }

    #[test]
    fn test_equalities_collects_top_level_eq() {
        let filter = Filter::eq("user", "u1")
            .and(Filter::gt("rating", 3))
            .and(Filter::eq("route", "r1"));
        let names: Vec<&str> = filter.equalities().iter().map(|(f, _)| *f).collect();
        assert_eq!(names, vec!["user", "route"]);
    }

    #[test]
    fn test_update_rejects_id_and_bad_increment() {
        assert!(Update::new().set("id", "x").validate().is_err());
        assert!(Update::new().set("id.nested", 1).validate().is_err());
        assert!(Update::new().inc("count", "one").validate().is_err());
        assert!(Update::new().inc("count", 1).set("name", "n").validate().is_ok());
    }

    #[test]
    fn test_non_finite_operands_rejected() {
        assert!(Filter::eq("rating", f64::NAN).validate().is_err());
        assert!(Filter::lt("rating", f64::INFINITY).validate().is_err());
        assert!(Filter::eq("user", "u1")
            .and(Filter::is_in("rating", vec![1.0, f64::NAN]))
            .validate()
            .is_err());
        assert!(Update::new().set("rating", f64::NAN).validate().is_err());
        assert!(Update::new().inc("rating", f64::NEG_INFINITY).validate().is_err());
        assert!(Filter::gte("rating", 2.5).validate().is_ok());
    }

    #[test]
    fn test_conversions() {
        let when = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(FieldValue::from(when), FieldValue::Int(1_700_000_000_123));
        assert_eq!(FieldValue::from(Privacy::Private), FieldValue::from("private"));
        assert_eq!(FieldValue::from(None::<i64>), FieldValue::Null);
        assert_eq!(FieldValue::Float(f64::NAN).to_json(), Value::Null);
    }
}
