//! Bidirectional translation between the Host's attribute trees and the
//! Platform's structured records.
//!
//! Expand walks a [`Plan`] in parallel with the kind's schema and produces a
//! Platform record; flatten walks a record and produces the attribute map
//! that gets persisted. Both directions share the conventions in this
//! module: max-cardinality-1 list blocks encode structs, timestamps render
//! as ISO-8601 UTC with second precision, durations render in the unit the
//! schema declares, and set identity derives from the element schema rather
//! than runtime values.

use crate::error::ProviderError;
use crate::schema::{Block, Schema};
use chrono::{SecondsFormat, TimeZone, Utc};
use prost_types::{Duration, Timestamp};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// A flat mapping from top-level attribute name to attribute tree.
pub type AttrMap = Map<String, Value>;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

// ============================================================================
// Plan: typed read access over the Host's attribute tree
// ============================================================================

/// Read access to one managed object's desired state.
///
/// Getters for required fields fail with [`ProviderError::SchemaParse`]
/// naming the absent field; getters for optional fields fall back to the
/// Platform's zero value so the expanded record field stays unset.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    attrs: AttrMap,
    path: String,
}

impl Plan {
    /// Wrap the Host's attribute tree. `Null` is treated as an empty plan.
    pub fn new(tree: Value) -> Result<Self, ProviderError> {
        match tree {
            Value::Object(attrs) => Ok(Self {
                attrs,
                path: String::new(),
            }),
            Value::Null => Ok(Self::default()),
            other => Err(ProviderError::schema_parse(
                "",
                format!("expected an attribute map, got {}", type_name(&other)),
            )),
        }
    }

    /// Wrap an already-flat attribute map.
    pub fn from_map(attrs: AttrMap) -> Self {
        Self {
            attrs,
            path: String::new(),
        }
    }

    fn nested(attrs: AttrMap, path: String) -> Self {
        Self { attrs, path }
    }

    fn path_of(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    /// The top-level keys present in this plan.
    pub fn keys(&self) -> BTreeSet<String> {
        self.attrs.keys().cloned().collect()
    }

    /// Whether the plan carries a non-null value for `key`.
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.attrs.get(key), Some(v) if !v.is_null())
    }

    /// Raw access to an attribute tree.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// A required, non-empty string.
    pub fn required_string(&self, key: &str) -> Result<String, ProviderError> {
        match self.attrs.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                Err(ProviderError::missing_field(self.path_of(key)))
            }
            Some(other) => Err(ProviderError::schema_parse(
                self.path_of(key),
                format!("expected string, got {}", type_name(other)),
            )),
        }
    }

    /// An optional string; absent maps to the empty string.
    pub fn optional_string(&self, key: &str) -> String {
        match self.attrs.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    /// An optional string with a fallback used when the plan omits it.
    ///
    /// Used for `organization` and `project`, which fall back to the
    /// provider-level defaults.
    pub fn string_or(&self, key: &str, fallback: &str) -> String {
        let value = self.optional_string(key);
        if value.is_empty() {
            fallback.to_string()
        } else {
            value
        }
    }

    /// A required integer.
    pub fn required_i64(&self, key: &str) -> Result<i64, ProviderError> {
        match self.attrs.get(key) {
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
                ProviderError::schema_parse(self.path_of(key), "expected a 64-bit integer")
            }),
            None | Some(Value::Null) => Err(ProviderError::missing_field(self.path_of(key))),
            Some(other) => Err(ProviderError::schema_parse(
                self.path_of(key),
                format!("expected integer, got {}", type_name(other)),
            )),
        }
    }

    /// An optional integer; absent maps to 0.
    pub fn optional_i64(&self, key: &str) -> i64 {
        match self.attrs.get(key) {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            _ => 0,
        }
    }

    /// An optional integer narrowed to the Platform's 32-bit type.
    ///
    /// Truncation is an error only when the value exceeds the target range.
    pub fn optional_i32(&self, key: &str) -> Result<i32, ProviderError> {
        coerce_i32(self.optional_i64(key), &self.path_of(key))
    }

    /// An optional boolean; absent maps to false.
    pub fn optional_bool(&self, key: &str) -> bool {
        matches!(self.attrs.get(key), Some(Value::Bool(true)))
    }

    /// A boolean with its absence preserved.
    ///
    /// The one place the tri-state matters is terms-and-conditions
    /// acceptance, where absent and false must be distinguishable from true.
    pub fn bool_tri_state(&self, key: &str) -> Option<bool> {
        match self.attrs.get(key) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// A list of non-empty strings.
    ///
    /// An empty element fails with `SchemaParse` naming the element path.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, ProviderError> {
        let arr = match self.attrs.get(key) {
            Some(Value::Array(arr)) => arr,
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(other) => {
                return Err(ProviderError::schema_parse(
                    self.path_of(key),
                    format!("expected list, got {}", type_name(other)),
                ))
            }
        };
        let mut out = Vec::with_capacity(arr.len());
        for (i, elem) in arr.iter().enumerate() {
            match elem {
                Value::String(s) if !s.is_empty() => out.push(s.clone()),
                _ => {
                    return Err(ProviderError::missing_field(format!(
                        "{}.{}",
                        self.path_of(key),
                        i
                    )))
                }
            }
        }
        Ok(out)
    }

    /// Descend into a max-cardinality-1 block.
    ///
    /// Accepts the Host's single-element list encoding as well as a bare
    /// object; absent or empty lists mean the block was not declared.
    pub fn single_block(&self, key: &str) -> Result<Option<Plan>, ProviderError> {
        match self.attrs.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(arr)) => match arr.len() {
                0 => Ok(None),
                1 => self.block_element(key, 0, &arr[0]).map(Some),
                n => Err(ProviderError::schema_parse(
                    self.path_of(key),
                    format!("at most one block allowed, got {}", n),
                )),
            },
            Some(Value::Object(map)) => {
                Ok(Some(Plan::nested(map.clone(), self.path_of(key))))
            }
            Some(other) => Err(ProviderError::schema_parse(
                self.path_of(key),
                format!("expected block, got {}", type_name(other)),
            )),
        }
    }

    /// Descend into a repeated block, preserving order.
    pub fn block_list(&self, key: &str) -> Result<Vec<Plan>, ProviderError> {
        let arr = match self.attrs.get(key) {
            Some(Value::Array(arr)) => arr,
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(other) => {
                return Err(ProviderError::schema_parse(
                    self.path_of(key),
                    format!("expected list of blocks, got {}", type_name(other)),
                ))
            }
        };
        arr.iter()
            .enumerate()
            .map(|(i, elem)| self.block_element(key, i, elem))
            .collect()
    }

    /// Descend into a set of blocks: order-independent, duplicates rejected.
    pub fn block_set(&self, key: &str) -> Result<Vec<Plan>, ProviderError> {
        let blocks = self.block_list(key)?;
        for (i, a) in blocks.iter().enumerate() {
            for b in blocks.iter().skip(i + 1) {
                if a.attrs == b.attrs {
                    return Err(ProviderError::schema_parse(
                        self.path_of(key),
                        "duplicate set element",
                    ));
                }
            }
        }
        Ok(blocks)
    }

    fn block_element(&self, key: &str, index: usize, elem: &Value) -> Result<Plan, ProviderError> {
        match elem {
            Value::Object(map) => Ok(Plan::nested(
                map.clone(),
                format!("{}.{}", self.path_of(key), index),
            )),
            other => Err(ProviderError::schema_parse(
                format!("{}.{}", self.path_of(key), index),
                format!("expected block, got {}", type_name(other)),
            )),
        }
    }
}

// ============================================================================
// StateView: the persisted post-image
// ============================================================================

/// One managed object's persisted state: canonical id plus attribute map.
///
/// An empty id is the tombstone: the Host drops tracking for the object and
/// persists no attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateView {
    /// The Platform-assigned canonical id. Empty means "no such object".
    pub id: String,
    /// Top-level attribute name to attribute tree.
    pub attrs: AttrMap,
}

impl StateView {
    /// The tombstone state.
    pub fn absent() -> Self {
        Self::default()
    }

    /// A state holding only an id, before any read-back.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attrs: AttrMap::new(),
        }
    }

    /// Reconstruct a state view from the Host's persisted mapping.
    pub fn from_parts(id: impl Into<String>, attrs: AttrMap) -> Self {
        Self {
            id: id.into(),
            attrs,
        }
    }

    /// Whether this state is the tombstone.
    pub fn is_absent(&self) -> bool {
        self.id.is_empty()
    }

    /// The keys currently persisted, i.e. the prior key-presence set.
    pub fn keys(&self) -> BTreeSet<String> {
        self.attrs.keys().cloned().collect()
    }

    /// Raw access to a persisted attribute tree.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Build the post-image after a read.
    ///
    /// Only keys the prior state had asked about are written back, so the
    /// Host can keep distinguishing "not declared" from "declared and the
    /// server reports the zero value". Computed keys are always written:
    /// their value must track the Platform's most recent response.
    pub fn persist(
        id: impl Into<String>,
        flattened: AttrMap,
        presence: &BTreeSet<String>,
        schema: &Schema,
    ) -> Self {
        let attrs = flattened
            .into_iter()
            .filter(|(key, _)| presence.contains(key) || schema.is_computed(key))
            .collect();
        Self {
            id: id.into(),
            attrs,
        }
    }

    /// View the persisted attributes as a plan, for diffing.
    pub fn as_plan(&self) -> Plan {
        Plan::from_map(self.attrs.clone())
    }
}

// ============================================================================
// Flatten helpers
// ============================================================================

/// Builder for the flattened attribute map of a Platform record.
#[derive(Debug, Default)]
pub struct Flat(AttrMap);

impl Flat {
    /// Start an empty flattened map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a string attribute.
    pub fn str(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), Value::String(value.into()));
        self
    }

    /// Set an integer attribute.
    pub fn i64(mut self, key: &str, value: i64) -> Self {
        self.0.insert(key.to_string(), Value::from(value));
        self
    }

    /// Set a boolean attribute.
    pub fn bool(mut self, key: &str, value: bool) -> Self {
        self.0.insert(key.to_string(), Value::Bool(value));
        self
    }

    /// Render a timestamp as ISO-8601 UTC with second precision.
    pub fn timestamp(self, key: &str, ts: Option<&Timestamp>) -> Self {
        let rendered = timestamp_string(ts);
        self.str(key, rendered)
    }

    /// Set a list of strings.
    pub fn str_list(mut self, key: &str, values: &[String]) -> Self {
        self.0.insert(
            key.to_string(),
            Value::Array(values.iter().map(|s| Value::String(s.clone())).collect()),
        );
        self
    }

    /// Encode a nested record as the single-element sequence the Host needs.
    pub fn single_block(mut self, key: &str, block: AttrMap) -> Self {
        self.0
            .insert(key.to_string(), Value::Array(vec![Value::Object(block)]));
        self
    }

    /// Set a repeated block attribute.
    pub fn blocks(mut self, key: &str, blocks: Vec<AttrMap>) -> Self {
        self.0.insert(
            key.to_string(),
            Value::Array(blocks.into_iter().map(Value::Object).collect()),
        );
        self
    }

    /// Encode set-nested blocks, ordered by their schema-derived identity.
    ///
    /// The Platform returns set members in arbitrary order; keying each
    /// element by [`set_element_hash`] makes re-reads of identical members
    /// flatten identically.
    pub fn set_blocks(mut self, key: &str, element: &Block, blocks: Vec<AttrMap>) -> Self {
        let mut keyed: Vec<(String, AttrMap)> = blocks
            .into_iter()
            .map(|b| (set_element_hash(element, &b), b))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        self.0.insert(
            key.to_string(),
            Value::Array(keyed.into_iter().map(|(_, b)| Value::Object(b)).collect()),
        );
        self
    }

    /// Finish the map.
    pub fn build(self) -> AttrMap {
        self.0
    }
}

/// Render a timestamp as ISO-8601 UTC with second precision.
///
/// A nil timestamp becomes the empty string.
pub fn timestamp_string(ts: Option<&Timestamp>) -> String {
    let Some(ts) = ts else {
        return String::new();
    };
    match Utc.timestamp_opt(ts.seconds, ts.nanos.max(0) as u32) {
        chrono::LocalResult::Single(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        _ => String::new(),
    }
}

/// Parse an ISO-8601 string back into a wire timestamp.
///
/// The empty string maps to `None`.
pub fn parse_timestamp(value: &str, field: &str) -> Result<Option<Timestamp>, ProviderError> {
    if value.is_empty() {
        return Ok(None);
    }
    let dt = chrono::DateTime::parse_from_rfc3339(value)
        .map_err(|e| ProviderError::schema_parse(field, format!("invalid timestamp: {}", e)))?;
    Ok(Some(Timestamp {
        seconds: dt.timestamp(),
        nanos: 0,
    }))
}

/// A retention period in days as the Platform's duration.
///
/// Zero means "unset" and maps to no duration at all.
pub fn duration_from_days(days: i64) -> Option<Duration> {
    (days > 0).then_some(Duration {
        seconds: days * SECONDS_PER_DAY,
        nanos: 0,
    })
}

/// A lifetime in seconds as the Platform's duration.
pub fn duration_from_seconds(seconds: i64) -> Option<Duration> {
    (seconds > 0).then_some(Duration { seconds, nanos: 0 })
}

/// Render a duration in days, rounding down.
pub fn days_from_duration(d: Option<&Duration>) -> i64 {
    d.map(|d| d.seconds / SECONDS_PER_DAY).unwrap_or(0)
}

/// Render a duration in seconds.
pub fn seconds_from_duration(d: Option<&Duration>) -> i64 {
    d.map(|d| d.seconds).unwrap_or(0)
}

/// Narrow a plan integer to the Platform's 32-bit type.
pub fn coerce_i32(value: i64, field: &str) -> Result<i32, ProviderError> {
    i32::try_from(value).map_err(|_| {
        ProviderError::schema_parse(field, format!("{} exceeds the 32-bit range", value))
    })
}

// ============================================================================
// Hashing
// ============================================================================

/// A stable identity key for set elements, derived from the element schema.
///
/// Hashing the schema rather than runtime field values keeps element
/// identity stable across re-reads that return identical values.
pub fn schema_hash(block: &Block) -> String {
    let serialized = serde_json::to_value(block).unwrap_or(Value::Null);
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(&serialized).as_bytes());
    hex::encode(&hasher.finalize()[..8])
}

/// The identity key of one set element.
///
/// The element schema's hash seeds the digest, then the element's canonical
/// rendering; two elements with the same values under the same schema always
/// share an identity, so set membership is stable across re-reads.
pub fn set_element_hash(block: &Block, element: &AttrMap) -> String {
    let mut hasher = Sha256::new();
    hasher.update(schema_hash(block).as_bytes());
    hasher.update(canonical_json(&Value::Object(element.clone())).as_bytes());
    hex::encode(&hasher.finalize()[..8])
}

/// Derive a data-source id from response payload parts.
///
/// Parts are sorted, joined, and digested so the id is deterministic across
/// invocations regardless of listing order.
pub fn hashed_id<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut sorted: Vec<String> = parts.into_iter().map(Into::into).collect();
    sorted.sort();
    let mut hasher = Sha256::new();
    hasher.update(sorted.join(",").as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical rendering with object keys sorted, so hashing is order-free.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{:?}:{}", k, canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
