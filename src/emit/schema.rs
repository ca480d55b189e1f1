//! Per-action parameter schemas
//!
//! The table maps (block id, action) to the positional parameters and block
//! tags the platform expects. A built-in table is embedded in the crate and
//! parsed once; custom tables can be loaded from TOML and merged over it.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use thiserror::Error;

use crate::value::Value;

/// Errors that can occur when loading or validating a schema
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse schema TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid schema for {block} {action}: {reason}")]
    Invalid {
        block: String,
        action: String,
        reason: String,
    },
}

const BUILTIN_SCHEMA: &str = include_str!("builtin_schema.toml");

/// Kind of value a parameter position accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Text,
    Number,
    Location,
    Vector,
    Item,
    Sound,
    Potion,
    Particle,
    List,
    Dict,
    Variable,
    Any,
}

impl ParamKind {
    /// Variables and game values stand in for any kind except `variable`
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (ParamKind::Any, _) => true,
            (ParamKind::Variable, Value::Variable(_)) => true,
            (ParamKind::Variable, _) => false,
            (_, Value::Variable(_) | Value::GameValue(_)) => true,
            (ParamKind::Text, Value::Text(_))
            | (ParamKind::Number, Value::Number(_))
            | (ParamKind::Location, Value::Location(_))
            | (ParamKind::Vector, Value::Vector(_))
            | (ParamKind::Item, Value::Item(_))
            | (ParamKind::Sound, Value::Sound(_))
            | (ParamKind::Potion, Value::Potion(_))
            | (ParamKind::Particle, Value::Particle(_))
            | (ParamKind::List, Value::List(_))
            | (ParamKind::Dict, Value::Dict(_)) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParamKind::Text => "text",
            ParamKind::Number => "number",
            ParamKind::Location => "location",
            ParamKind::Vector => "vector",
            ParamKind::Item => "item",
            ParamKind::Sound => "sound",
            ParamKind::Potion => "potion",
            ParamKind::Particle => "particle",
            ParamKind::List => "list",
            ParamKind::Dict => "dict",
            ParamKind::Variable => "variable",
            ParamKind::Any => "any",
        }
    }
}

/// One positional parameter
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSpec {
    pub kind: ParamKind,
    #[serde(default)]
    pub optional: bool,
    /// Accepts one or more values (zero or more when also optional)
    #[serde(default)]
    pub plural: bool,
}

impl ParamSpec {
    pub fn new(kind: ParamKind) -> Self {
        Self {
            kind,
            optional: false,
            plural: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn plural(mut self) -> Self {
        self.plural = true;
        self
    }
}

impl fmt::Display for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        match (self.optional, self.plural) {
            (true, true) => f.write_str("*"),
            (false, true) => f.write_str("+"),
            (true, false) => f.write_str("?"),
            (false, false) => Ok(()),
        }
    }
}

/// A block tag with its allowed options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagSpec {
    pub name: String,
    pub options: Vec<String>,
    pub default: String,
}

/// Schema of one (block, action) pair
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionSchema {
    pub block: String,
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    #[serde(default)]
    pub tags: Vec<TagSpec>,
}

impl ActionSchema {
    pub fn new(block: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            name: name.into(),
            params: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn with_tag(mut self, name: &str, options: &[&str], default: &str) -> Self {
        self.tags.push(TagSpec {
            name: name.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            default: default.to_string(),
        });
        self
    }

    pub fn tag(&self, name: &str) -> Option<&TagSpec> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Parameter signature such as `(text, number?, item*)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        format!("({})", params.join(", "))
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let invalid = |reason: String| SchemaError::Invalid {
            block: self.block.clone(),
            action: self.name.clone(),
            reason,
        };

        let mut seen_optional = false;
        for (position, spec) in self.params.iter().enumerate() {
            if spec.plural && position + 1 != self.params.len() {
                return Err(invalid(format!(
                    "plural parameter at position {position} is not last"
                )));
            }
            if spec.optional {
                seen_optional = true;
            } else if seen_optional {
                return Err(invalid(format!(
                    "required parameter at position {position} follows an optional one"
                )));
            }
        }

        let mut names = HashSet::new();
        for tag in &self.tags {
            if !names.insert(tag.name.as_str()) {
                return Err(invalid(format!("duplicate tag '{}'", tag.name)));
            }
            if !tag.options.contains(&tag.default) {
                return Err(invalid(format!(
                    "default '{}' of tag '{}' is not one of its options",
                    tag.default, tag.name
                )));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlSchema {
    #[serde(default)]
    action: Vec<ActionSchema>,
}

/// Lookup table of action schemas
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaTable {
    blocks: BTreeMap<String, BTreeMap<String, ActionSchema>>,
}

impl SchemaTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The embedded default table, parsed on first use
    pub fn builtin() -> &'static SchemaTable {
        static BUILTIN: OnceLock<SchemaTable> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            SchemaTable::from_str(BUILTIN_SCHEMA).expect("built-in schema should be valid")
        })
    }

    /// Load a schema from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a schema from a TOML string
    pub fn from_str(content: &str) -> Result<Self, SchemaError> {
        let parsed: TomlSchema = toml::from_str(content)?;
        let mut table = Self::new();
        for schema in parsed.action {
            table.insert(schema)?;
        }
        Ok(table)
    }

    /// Add or replace one schema
    pub fn insert(&mut self, schema: ActionSchema) -> Result<(), SchemaError> {
        schema.validate()?;
        self.blocks
            .entry(schema.block.clone())
            .or_default()
            .insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Merge another table over this one; its entries win
    pub fn merge(mut self, other: SchemaTable) -> Self {
        for (block, actions) in other.blocks {
            self.blocks.entry(block).or_default().extend(actions);
        }
        self
    }

    pub fn lookup(&self, block: &str, action: &str) -> Option<&ActionSchema> {
        self.blocks.get(block)?.get(action)
    }

    /// Action names known for a block, sorted
    pub fn actions(&self, block: &str) -> Vec<&str> {
        self.blocks
            .get(block)
            .map(|actions| actions.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.blocks.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{GameValue, Particle, ScopeClass, VariableRef};

    #[test]
    fn test_builtin_parses() {
        let table = SchemaTable::builtin();
        assert!(!table.is_empty());
        let send = table
            .lookup("player_action", "SendMessage")
            .expect("SendMessage should exist");
        assert_eq!(send.signature(), "(any*)");
        assert_eq!(send.tags.len(), 2);
        assert!(table.lookup("event", "Join").is_some());
        assert!(table.lookup("func", "dynamic").is_some());
        assert!(table.lookup("player_action", "Nope").is_none());
        let effect = table
            .lookup("player_action", "ParticleEffect")
            .expect("ParticleEffect should exist");
        assert_eq!(effect.signature(), "(particle, location*)");
    }

    #[test]
    fn test_signature_rendering() {
        let schema = ActionSchema::new("player_action", "Example")
            .with_param(ParamSpec::new(ParamKind::Text))
            .with_param(ParamSpec::new(ParamKind::Number).optional())
            .with_param(ParamSpec::new(ParamKind::Item).optional().plural());
        assert_eq!(schema.signature(), "(text, number?, item*)");
    }

    #[test]
    fn test_kind_acceptance() {
        let var = Value::Variable(VariableRef::new("x", ScopeClass::Local));
        let gval = Value::GameValue(GameValue::new("Location"));
        assert!(ParamKind::Text.accepts(&Value::text("a")));
        assert!(!ParamKind::Text.accepts(&Value::number(1.0)));
        assert!(ParamKind::Location.accepts(&var));
        assert!(ParamKind::Location.accepts(&gval));
        assert!(ParamKind::Variable.accepts(&var));
        assert!(!ParamKind::Variable.accepts(&gval));
        assert!(ParamKind::Any.accepts(&Value::list([])));
        assert!(ParamKind::Particle.accepts(&Value::from(Particle::new("Cloud"))));
        assert!(!ParamKind::Particle.accepts(&Value::text("Cloud")));
    }

    #[test]
    fn test_plural_must_be_last() {
        let toml = r#"
[[action]]
block = "player_action"
name = "Bad"
params = [{ kind = "item", plural = true }, { kind = "number" }]
"#;
        assert!(matches!(
            SchemaTable::from_str(toml),
            Err(SchemaError::Invalid { .. })
        ));
    }

    #[test]
    fn test_required_after_optional_rejected() {
        let schema = ActionSchema::new("player_action", "Bad")
            .with_param(ParamSpec::new(ParamKind::Text).optional())
            .with_param(ParamSpec::new(ParamKind::Text));
        assert!(SchemaTable::new().insert(schema).is_err());
    }

    #[test]
    fn test_tag_default_must_be_an_option() {
        let schema = ActionSchema::new("control", "Wait").with_tag(
            "Time Unit",
            &["Ticks", "Seconds"],
            "Hours",
        );
        assert!(matches!(
            SchemaTable::new().insert(schema),
            Err(SchemaError::Invalid { reason, .. }) if reason.contains("Hours")
        ));
    }

    #[test]
    fn test_merge_overrides() {
        let custom = SchemaTable::from_str(
            r#"
[[action]]
block = "player_action"
name = "SendMessage"
params = [{ kind = "text" }]

[[action]]
block = "player_action"
name = "Custom"
"#,
        )
        .expect("Should parse");
        let merged = SchemaTable::builtin().clone().merge(custom);
        let send = merged.lookup("player_action", "SendMessage").unwrap();
        assert_eq!(send.signature(), "(text)");
        assert!(send.tags.is_empty());
        assert!(merged.lookup("player_action", "Custom").is_some());
        assert!(merged.lookup("event", "Join").is_some());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let toml = r#"
[[action]]
block = "player_action"
name = "Bad"
params = [{ kind = "banana" }]
"#;
        assert!(matches!(
            SchemaTable::from_str(toml),
            Err(SchemaError::ParseError(_))
        ));
    }
}
