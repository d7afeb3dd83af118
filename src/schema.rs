//! Schema registry: the typed, nested attribute shape of every kind.
//!
//! Schemas are static data. Each kind declares a root [`Schema`] whose
//! attributes carry a type, a required/optional/computed tri-state, an
//! optional diff-suppression predicate, an optional default source, and a
//! force-new flag. The translator and the reconciler treat the schema as the
//! single source of truth for interpreting the Host's untyped attribute
//! trees.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The type of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
    /// A boolean value.
    Bool,
    /// An ordered list of values of a single type.
    List(Box<AttributeType>),
    /// An unordered set of values of a single type.
    Set(Box<AttributeType>),
}

impl AttributeType {
    /// Create a list type.
    pub fn list(element: AttributeType) -> Self {
        Self::List(Box::new(element))
    }

    /// Create a set type.
    pub fn set(element: AttributeType) -> Self {
        Self::Set(Box::new(element))
    }
}

/// The required/optional/computed tri-state plus sensitivity.
///
/// `required` and `optional` describe what the plan may carry; `computed`
/// marks fields the reconciler fills from the Platform's responses and never
/// demands from the plan. `optional` and `computed` may be combined for
/// fields the Platform assigns when the user leaves them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute must appear in the plan.
    pub required: bool,
    /// The attribute may appear in the plan.
    pub optional: bool,
    /// The attribute is filled by the reconciler from Platform responses.
    pub computed: bool,
    /// The attribute is hidden in logs and UI output.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Flags for a required attribute.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Flags for an optional attribute.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Flags for a computed attribute.
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Flags for an optional attribute the Platform assigns when absent.
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }
}

/// A diff-suppression predicate.
///
/// Each variant hides one documented representation gap between the Host's
/// view and the Platform's. Suppression never hides a change the user
/// actually made; it only bridges values the two sides render differently.
/// A closed enum (rather than a function pointer) keeps schemas
/// serializable and the suppression behavior deterministic and testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffSuppress {
    /// Suppress the diff whenever the plan leaves the field empty, on
    /// strings the Platform computes server-side (default node size id,
    /// default certificate id, default version). An empty plan value means
    /// "whatever the server assigned", never "clear it".
    ComputedOnServer,
    /// Suppress the diff whenever the plan leaves the field at `0` or
    /// unset, on optional integers the Platform treats `0` as "unspecified"
    /// for.
    ZeroSentinel,
}

impl DiffSuppress {
    /// Whether the difference between `prior` and `planned` should be hidden.
    pub fn suppresses(&self, _prior: &Value, planned: &Value) -> bool {
        match self {
            Self::ComputedOnServer => is_empty_string_or_null(planned),
            Self::ZeroSentinel => is_zero_or_null(planned),
        }
    }
}

fn is_empty_string_or_null(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn is_zero_or_null(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Number(n) => n.as_i64() == Some(0),
        _ => false,
    }
}

/// Where an attribute's default value comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultSource {
    /// A literal JSON value.
    Literal(Value),
    /// The value of an environment variable, if set.
    Env(String),
}

impl DefaultSource {
    /// Resolve the default, consulting the environment for [`DefaultSource::Env`].
    pub fn resolve(&self) -> Option<Value> {
        match self {
            Self::Literal(v) => Some(v.clone()),
            Self::Env(name) => std::env::var(name).ok().map(Value::String),
        }
    }
}

/// Describes a single attribute in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The type of the attribute.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Tri-state flags.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Changing this attribute requires destroy-then-create.
    #[serde(default)]
    pub force_new: bool,
    /// Default source consulted when the plan omits the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultSource>,
    /// Diff-suppression predicate, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_suppress: Option<DiffSuppress>,
}

impl Attribute {
    /// Create a new attribute with the given type and flags.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
            diff_suppress: None,
        }
    }

    /// A required string attribute.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// An optional string attribute.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// A computed string attribute.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// An optional string the Platform assigns when the plan omits it.
    pub fn server_assigned_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional_computed())
            .with_diff_suppress(DiffSuppress::ComputedOnServer)
    }

    /// A required int64 attribute.
    pub fn required_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::required())
    }

    /// An optional int64 attribute.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// A computed int64 attribute.
    pub fn computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::computed())
    }

    /// A required bool attribute.
    pub fn required_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::required())
    }

    /// An optional bool attribute.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// A computed bool attribute.
    pub fn computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::computed())
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the attribute as forcing replacement when changed.
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Set a literal default.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(DefaultSource::Literal(value));
        self
    }

    /// Set an environment-variable default.
    pub fn with_env_default(mut self, var: impl Into<String>) -> Self {
        self.default = Some(DefaultSource::Env(var.into()));
        self
    }

    /// Attach a diff-suppression predicate.
    pub fn with_diff_suppress(mut self, suppress: DiffSuppress) -> Self {
        self.diff_suppress = Some(suppress);
        self
    }

    /// Mark the attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }
}

/// How a nested block repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockNestingMode {
    /// An ordered list of blocks. Max-cardinality-1 lists encode structs:
    /// the translator always flattens them to a single-element sequence.
    #[default]
    List,
    /// An unordered set of blocks with schema-derived element identity.
    Set,
}

/// A group of attributes and nested blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    /// The attributes within this block.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Attribute>,
    /// Nested blocks within this block.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub blocks: HashMap<String, NestedBlock>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    /// Create a new empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }
}

/// A nested block with its mode, cardinality bounds, and flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    /// The block definition.
    #[serde(flatten)]
    pub block: Block,
    /// How the block repeats.
    #[serde(default)]
    pub nesting_mode: BlockNestingMode,
    /// Minimum number of blocks required.
    #[serde(default)]
    pub min_items: u32,
    /// Maximum number of blocks allowed (0 = unlimited).
    #[serde(default)]
    pub max_items: u32,
    /// Whether the whole block is computed by the reconciler.
    #[serde(default)]
    pub computed: bool,
    /// Changing this block requires destroy-then-create.
    #[serde(default)]
    pub force_new: bool,
}

impl NestedBlock {
    /// A struct-shaped block: an optional list with max cardinality 1.
    ///
    /// The Host always reports length 0 for the absent case, so a 1 -> 0
    /// cardinality diff on these blocks is suppressed by the differ.
    pub fn single(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::List,
            min_items: 0,
            max_items: 1,
            computed: false,
            force_new: false,
        }
    }

    /// A list of blocks with no cardinality bound.
    pub fn list(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::List,
            min_items: 0,
            max_items: 0,
            computed: false,
            force_new: false,
        }
    }

    /// A set of blocks with no cardinality bound.
    pub fn set(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::Set,
            min_items: 0,
            max_items: 0,
            computed: false,
            force_new: false,
        }
    }

    /// Set the minimum cardinality.
    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Set the maximum cardinality.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }

    /// Mark the block as computed by the reconciler.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Mark the block as forcing replacement when changed.
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Whether this block is the struct-shaped single-element encoding.
    pub fn is_single(&self) -> bool {
        self.nesting_mode == BlockNestingMode::List && self.max_items == 1
    }
}

/// Schema for a resource kind or data-source kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schema {
    /// Version of this schema, for state upgrades.
    #[serde(default)]
    pub version: u64,
    /// The root block.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self::default()
    }

    /// Add an attribute to the root block.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block to the root block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block.blocks.insert(name.into(), block);
        self
    }

    /// Look up a root attribute.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.get(name)
    }

    /// Look up a root nested block.
    pub fn nested_block(&self, name: &str) -> Option<&NestedBlock> {
        self.block.blocks.get(name)
    }

    /// Whether a root key is computed (attribute or block).
    pub fn is_computed(&self, name: &str) -> bool {
        if let Some(attr) = self.block.attributes.get(name) {
            return attr.flags.computed;
        }
        if let Some(block) = self.block.blocks.get(name) {
            return block.computed;
        }
        false
    }
}

/// The full provider schema: provider config plus every kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// Schema for the provider-level configuration attributes.
    #[serde(default)]
    pub provider: Schema,
    /// Schemas for each resource kind.
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
    /// Schemas for each data-source kind.
    #[serde(default)]
    pub data_sources: HashMap<String, Schema>,
}

impl ProviderSchema {
    /// Create a new empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource kind schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Add a data-source kind schema.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Prevents the operation from completing.
    Error,
    /// Should be addressed but does not block the operation.
    Warning,
}

/// A diagnostic message surfaced to the Host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// Short summary.
    pub summary: String,
    /// Detailed description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Dotted attribute path the diagnostic refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flags_tri_state() {
        let required = AttributeFlags::required();
        assert!(required.required && !required.optional && !required.computed);

        let server_assigned = AttributeFlags::optional_computed();
        assert!(server_assigned.optional && server_assigned.computed);
    }

    #[test]
    fn test_computed_on_server_suppression() {
        let s = DiffSuppress::ComputedOnServer;
        // Server filled in a value the user never set.
        assert!(s.suppresses(&json!("c1234-node-size"), &json!("")));
        assert!(s.suppresses(&json!("3.11"), &Value::Null));
        // A real user-made change is never hidden.
        assert!(!s.suppresses(&json!("small"), &json!("large")));
        assert!(!s.suppresses(&json!(""), &json!("pinned")));
    }

    #[test]
    fn test_zero_sentinel_suppression() {
        let s = DiffSuppress::ZeroSentinel;
        assert!(s.suppresses(&json!(3), &Value::Null));
        assert!(s.suppresses(&json!(3), &json!(0)));
        assert!(s.suppresses(&Value::Null, &json!(0)));
        assert!(!s.suppresses(&json!(0), &json!(5)));
        assert!(!s.suppresses(&json!(3), &json!(5)));
    }

    #[test]
    fn test_env_default_source() {
        std::env::set_var("OASIS_TEST_DEFAULT_ORG", "org-abc");
        let src = DefaultSource::Env("OASIS_TEST_DEFAULT_ORG".to_string());
        assert_eq!(src.resolve(), Some(json!("org-abc")));

        let missing = DefaultSource::Env("OASIS_TEST_UNSET_VAR".to_string());
        assert_eq!(missing.resolve(), None);

        let literal = DefaultSource::Literal(json!(3));
        assert_eq!(literal.resolve(), Some(json!(3)));
    }

    #[test]
    fn test_single_block_encoding() {
        let single = NestedBlock::single(
            Block::new().with_attribute("region", Attribute::required_string()),
        );
        assert!(single.is_single());
        assert_eq!(single.max_items, 1);

        let list = NestedBlock::list(Block::new());
        assert!(!list.is_single());
    }

    #[test]
    fn test_schema_computed_lookup() {
        let schema = Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_block(
                "tier",
                NestedBlock::set(Block::new()).computed(),
            );

        assert!(schema.is_computed("id"));
        assert!(!schema.is_computed("name"));
        assert!(schema.is_computed("tier"));
        assert!(!schema.is_computed("absent"));
    }

    #[test]
    fn test_builder_round_trip() {
        let schema = Schema::v0()
            .with_attribute(
                "node_size_id",
                Attribute::server_assigned_string().with_description("Node size id"),
            )
            .with_attribute(
                "organization",
                Attribute::optional_string()
                    .with_env_default("OASIS_ORGANIZATION")
                    .force_new(),
            );

        let attr = schema.attribute("node_size_id").unwrap();
        assert_eq!(attr.diff_suppress, Some(DiffSuppress::ComputedOnServer));
        assert!(attr.flags.computed && attr.flags.optional);

        let org = schema.attribute("organization").unwrap();
        assert!(org.force_new);
        assert!(matches!(org.default, Some(DefaultSource::Env(_))));
    }
}
