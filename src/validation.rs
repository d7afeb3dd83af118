//! Plan validation against a kind's schema.
//!
//! Walks a `serde_json::Value` attribute tree recursively, checking the
//! required/optional/computed tri-state, attribute types, and nested-block
//! cardinality bounds. Returns diagnostics rather than failing fast so the
//! Host can surface every problem in one pass.

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, DiagnosticSeverity, NestedBlock,
    Schema,
};
use serde_json::Value;

/// Validate an attribute tree against a schema.
///
/// An empty result means the tree is valid. Computed-only attributes are
/// skipped; the reconciler owns their values.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Convenience wrapper around [`validate`] returning `Err` on any diagnostic.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Whether an attribute tree is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value)))
                    .with_attribute_if_not_empty(path),
            );
            return;
        }
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested, obj.get(name), &block_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Computed-only attributes belong to the reconciler, not the plan.
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required && attr.default.is_none() {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => {
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
        }
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element) | AttributeType::Set(element) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if nested.computed {
        return;
    }
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
        }
        // Struct-shaped blocks also accept a bare object, the same leniency
        // the translator extends.
        Some(Value::Object(_)) if nested.is_single() => {
            if let Some(v) = value {
                validate_block(&nested.block, v, path, diagnostics);
            }
        }
        Some(Value::Array(arr)) => {
            let len = arr.len() as u32;
            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }
            if nested.nesting_mode == BlockNestingMode::Set {
                for (i, item) in arr.iter().enumerate() {
                    if arr[..i].contains(item) {
                        diagnostics.push(
                            Diagnostic::error(format!(
                                "Block '{}' contains duplicate elements",
                                path
                            ))
                            .with_attribute(format!("{}.{}", path, i)),
                        );
                    }
                }
            }
            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        }
        Some(v) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        }
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        }
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic {
        severity: DiagnosticSeverity::Error,
        summary: format!("Invalid type for attribute '{}'", path),
        detail: Some(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        )),
        attribute: Some(path.to_string()),
    }
}

trait DiagnosticExt {
    fn with_attribute_if_not_empty(self, path: &str) -> Self;
}

impl DiagnosticExt for Diagnostic {
    fn with_attribute_if_not_empty(self, path: &str) -> Self {
        if path.is_empty() {
            self
        } else {
            self.with_attribute(path)
        }
    }
}
