//! Change detection between prior state and planned attributes.
//!
//! The differ compares top-level keys under the kind's schema, applying the
//! schema's diff-suppression predicates so representation gaps between the
//! Host and the Platform do not show up as phantom diffs. Its output drives
//! two things: the additive update path (only changed fields are copied into
//! the current record) and replacement planning (a changed force-new
//! attribute means destroy-then-create).

use crate::schema::{Block, NestedBlock, Schema};
use crate::translate::{Plan, StateView};
use serde_json::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A change to a single top-level attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The attribute that changed.
    pub path: String,
    /// The value before the change (`None` when creating).
    pub before: Option<Value>,
    /// The value after the change (`None` when removing).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// A change introducing a new attribute value.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(value),
        }
    }

    /// A change replacing an existing attribute value.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(before),
            after: Some(after),
        }
    }
}

/// The result of planning one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The state the resource will have after apply.
    pub planned_state: Value,
    /// Per-attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether a changed force-new attribute requires destroy-then-create.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }
}

/// The set of top-level keys whose planned value differs from prior state.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    changed: BTreeSet<String>,
}

impl ChangeSet {
    /// Whether the given key changed.
    pub fn has(&self, key: &str) -> bool {
        self.changed.contains(key)
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// The changed keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }
}

/// Compute the changed top-level keys between prior state and plan.
///
/// Keys the schema marks computed-only never count as changes: their value
/// belongs to the Platform, not the plan. Suppression predicates and the
/// single-block absent-encoding rule are applied here and nowhere else.
pub fn changed_keys(schema: &Schema, prior: &StateView, plan: &Plan) -> ChangeSet {
    let mut changed = BTreeSet::new();

    for (name, attr) in &schema.block.attributes {
        if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
            continue;
        }
        let before = normalized(prior.get(name));
        let after = normalized(plan.get(name));
        if before == after {
            continue;
        }
        if let Some(suppress) = &attr.diff_suppress {
            if suppress.suppresses(&before, &after) {
                continue;
            }
        }
        changed.insert(name.clone());
    }

    for (name, nested) in &schema.block.blocks {
        if nested.computed {
            continue;
        }
        let before = normalized(prior.get(name));
        let after = normalized(plan.get(name));
        if before == after {
            continue;
        }
        // The Host reports length 0 for absent optional blocks, so a
        // server-reported single element against an omitted block is a
        // representation gap, not a user change.
        if nested.is_single() && nested.min_items == 0 && after.is_null() {
            continue;
        }
        if blocks_equal(nested, &before, &after) {
            continue;
        }
        changed.insert(name.clone());
    }

    ChangeSet { changed }
}

/// Element-wise block comparison under the nested schema's suppression
/// rules, so server-assigned fields inside a block do not leak out as a
/// change of the whole block.
fn blocks_equal(nested: &NestedBlock, before: &Value, after: &Value) -> bool {
    let before_items = block_items(before);
    let after_items = block_items(after);
    if before_items.len() != after_items.len() {
        return false;
    }
    before_items
        .iter()
        .zip(after_items.iter())
        .all(|(b, a)| element_equal(&nested.block, b, a))
}

/// The elements a block value holds. A bare object is the struct form of a
/// max-cardinality-1 block.
fn block_items(v: &Value) -> Vec<&Value> {
    match v {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn element_equal(block: &Block, before: &Value, after: &Value) -> bool {
    for (name, attr) in &block.attributes {
        if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
            continue;
        }
        let b = normalized(before.get(name));
        let a = normalized(after.get(name));
        if b == a {
            continue;
        }
        if let Some(suppress) = &attr.diff_suppress {
            if suppress.suppresses(&b, &a) {
                continue;
            }
        }
        return false;
    }
    for (name, inner) in &block.blocks {
        if inner.computed {
            continue;
        }
        let b = normalized(before.get(name));
        let a = normalized(after.get(name));
        if b == a {
            continue;
        }
        if inner.is_single() && inner.min_items == 0 && a.is_null() {
            continue;
        }
        if !blocks_equal(inner, &b, &a) {
            return false;
        }
    }
    true
}

/// The changed keys that are marked force-new, sorted.
pub fn force_new_changes(schema: &Schema, prior: &StateView, plan: &Plan) -> Vec<String> {
    let changes = changed_keys(schema, prior, plan);
    changes
        .keys()
        .filter(|key| {
            schema
                .attribute(key)
                .map(|a| a.force_new)
                .or_else(|| schema.nested_block(key).map(|b| b.force_new))
                .unwrap_or(false)
        })
        .map(str::to_string)
        .collect()
}

/// Plan one resource: diff prior against proposed and flag replacement.
pub fn plan_resource(schema: &Schema, prior: Option<&StateView>, proposed: &Plan) -> PlanResult {
    let proposed_tree = Value::Object(
        proposed
            .keys()
            .iter()
            .filter_map(|k| proposed.get(k).map(|v| (k.clone(), v.clone())))
            .collect(),
    );

    let Some(prior) = prior else {
        // Create: every declared attribute is an addition.
        let changes = proposed
            .keys()
            .iter()
            .filter_map(|k| {
                proposed
                    .get(k)
                    .filter(|v| !v.is_null())
                    .map(|v| AttributeChange::added(k.clone(), v.clone()))
            })
            .collect();
        return PlanResult {
            planned_state: proposed_tree,
            changes,
            requires_replace: false,
        };
    };

    let change_set = changed_keys(schema, prior, proposed);
    if change_set.is_empty() {
        let prior_tree = Value::Object(prior.attrs.clone());
        return PlanResult::no_change(prior_tree);
    }

    let requires_replace = !force_new_changes(schema, prior, proposed).is_empty();
    let changes = change_set
        .keys()
        .map(|key| AttributeChange {
            path: key.to_string(),
            before: prior.get(key).cloned(),
            after: proposed.get(key).cloned(),
        })
        .collect();

    PlanResult {
        planned_state: proposed_tree,
        changes,
        requires_replace,
    }
}

/// Fold the encodings of "absent" into `Null` before comparison.
fn normalized(v: Option<&Value>) -> Value {
    match v {
        None | Some(Value::Null) => Value::Null,
        Some(Value::Array(arr)) if arr.is_empty() => Value::Null,
        Some(other) => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, DiffSuppress, NestedBlock};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("project", Attribute::optional_string().force_new())
            .with_attribute("node_size_id", Attribute::server_assigned_string())
            .with_attribute(
                "node_disk_size",
                Attribute::optional_int64().with_diff_suppress(DiffSuppress::ZeroSentinel),
            )
            .with_block(
                "location",
                NestedBlock::single(
                    Block::new().with_attribute("region", Attribute::required_string()),
                )
                .force_new(),
            )
    }

    fn state(v: serde_json::Value) -> StateView {
        let Value::Object(attrs) = v else { panic!() };
        StateView::from_parts("id-1", attrs)
    }

    fn plan(v: serde_json::Value) -> Plan {
        Plan::new(v).unwrap()
    }

    #[test]
    fn test_no_change_when_equal() {
        let prior = state(json!({"name": "dep", "project": "p-1"}));
        let proposed = plan(json!({"name": "dep", "project": "p-1"}));
        assert!(changed_keys(&schema(), &prior, &proposed).is_empty());
    }

    #[test]
    fn test_real_change_detected() {
        let prior = state(json!({"name": "dep"}));
        let proposed = plan(json!({"name": "dep-renamed"}));
        let changes = changed_keys(&schema(), &prior, &proposed);
        assert!(changes.has("name"));
    }

    #[test]
    fn test_server_assigned_empty_to_value_suppressed() {
        // Server filled node_size_id; the user never declared it.
        let prior = state(json!({"name": "dep", "node_size_id": "c4-a4"}));
        let proposed = plan(json!({"name": "dep"}));
        assert!(changed_keys(&schema(), &prior, &proposed).is_empty());
    }

    #[test]
    fn test_server_assigned_real_change_not_suppressed() {
        let prior = state(json!({"name": "dep", "node_size_id": "c4-a4"}));
        let proposed = plan(json!({"name": "dep", "node_size_id": "c4-a8"}));
        assert!(changed_keys(&schema(), &prior, &proposed).has("node_size_id"));
    }

    #[test]
    fn test_zero_sentinel_suppressed() {
        let prior = state(json!({"name": "dep", "node_disk_size": 0}));
        let proposed = plan(json!({"name": "dep"}));
        assert!(changed_keys(&schema(), &prior, &proposed).is_empty());
    }

    #[test]
    fn test_absent_single_block_suppressed() {
        // The server reported the block; the user omitted the optional
        // block, which the Host encodes as length 0.
        let prior = state(json!({"name": "dep", "location": [{"region": "gcp-eu"}]}));
        let proposed = plan(json!({"name": "dep", "location": []}));
        assert!(changed_keys(&schema(), &prior, &proposed).is_empty());
    }

    #[test]
    fn test_changed_single_block_detected() {
        let prior = state(json!({"name": "dep", "location": [{"region": "gcp-eu"}]}));
        let proposed = plan(json!({"name": "dep", "location": [{"region": "gcp-us"}]}));
        let changes = changed_keys(&schema(), &prior, &proposed);
        assert!(changes.has("location"));
    }

    #[test]
    fn test_server_assigned_inside_block_suppressed() {
        let schema = Schema::v0().with_block(
            "configuration",
            NestedBlock::single(
                Block::new()
                    .with_attribute("model", Attribute::optional_string())
                    .with_attribute("node_size_id", Attribute::server_assigned_string())
                    .with_attribute(
                        "node_count",
                        Attribute::optional_int64().with_diff_suppress(DiffSuppress::ZeroSentinel),
                    ),
            ),
        );
        let prior = state(json!({"configuration": [{
            "model": "oneshard",
            "node_size_id": "c4-a4",
            "node_count": 3,
        }]}));

        // Server-resolved fields the plan leaves unset are not a change.
        let omitted = plan(json!({"configuration": [{"model": "oneshard"}]}));
        assert!(changed_keys(&schema, &prior, &omitted).is_empty());

        // A real change inside the block still surfaces the block key.
        let resized = plan(json!({"configuration": [{
            "model": "oneshard",
            "node_count": 5,
        }]}));
        assert!(changed_keys(&schema, &prior, &resized).has("configuration"));
    }

    #[test]
    fn test_force_new_detection() {
        let prior = state(json!({"name": "dep", "project": "p-1"}));
        let proposed = plan(json!({"name": "dep", "project": "p-2"}));
        assert_eq!(
            force_new_changes(&schema(), &prior, &proposed),
            vec!["project".to_string()]
        );

        let result = plan_resource(&schema(), Some(&prior), &proposed);
        assert!(result.requires_replace);
        assert_eq!(result.changes.len(), 1);
    }

    #[test]
    fn test_plan_create_lists_additions() {
        let proposed = plan(json!({"name": "dep", "project": "p-1"}));
        let result = plan_resource(&schema(), None, &proposed);
        assert!(!result.requires_replace);
        assert_eq!(result.changes.len(), 2);
    }

    #[test]
    fn test_plan_no_change_keeps_prior_state() {
        let prior = state(json!({"name": "dep"}));
        let proposed = plan(json!({"name": "dep"}));
        let result = plan_resource(&schema(), Some(&prior), &proposed);
        assert!(result.changes.is_empty());
        assert_eq!(result.planned_state["name"], "dep");
    }
}
