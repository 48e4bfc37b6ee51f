//! Core domain types for the AMSNet graph.
//!
//! Nodes and relationships are both identified by a name and carry a flat map
//! of scalar properties. Nodes and relationships live in separate namespaces.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Property key that identifies an entity. Never stored as a regular property.
pub const RESERVED_NAME_KEY: &str = "name";

/// Property holding the source node name of a relationship.
pub const FROM_NODE_KEY: &str = "fromNode";

/// Property holding the target node name of a relationship.
pub const TO_NODE_KEY: &str = "toNode";

/// Longest token accepted by [`validate_identifier`].
pub const MAX_IDENTIFIER_LEN: usize = 128;

// ── Properties ───────────────────────────────────────────────────

/// A scalar property value.
///
/// Untagged, so JSON scalars map directly. Lists, objects and `null` are
/// rejected at deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Literal textual form: strings unquoted, numbers and booleans as written.
impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Key/value attributes of a node or relationship.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

// ── Entities ─────────────────────────────────────────────────────

/// The namespace an entity name belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Node,
    Relationship,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => f.write_str("Node"),
            Self::Relationship => f.write_str("Relationship"),
        }
    }
}

/// A named vertex.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub properties: PropertyMap,
}

/// A named, directed edge. The name doubles as the relationship type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub name: String,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl Relationship {
    pub fn from_node(&self) -> Option<&str> {
        self.properties.get(FROM_NODE_KEY).and_then(|v| v.as_str())
    }

    pub fn to_node(&self) -> Option<&str> {
        self.properties.get(TO_NODE_KEY).and_then(|v| v.as_str())
    }
}

// ── Validation ───────────────────────────────────────────────────

/// Check a token against the identifier allow-list `[A-Za-z_][A-Za-z0-9_]*`.
///
/// Anything interpolated into query text (labels, relationship types) and every
/// property key must pass this; `what` names the token in the error message.
pub fn validate_identifier(what: &str, token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(ServiceError::invalid(format!("{what} is empty")));
    }
    if token.len() > MAX_IDENTIFIER_LEN {
        return Err(ServiceError::invalid(format!(
            "{what} exceeds {MAX_IDENTIFIER_LEN} characters"
        )));
    }

    let mut chars = token.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ServiceError::invalid(format!(
            "{what} '{token}' must match [A-Za-z_][A-Za-z0-9_]*"
        )));
    }
    Ok(())
}

/// Reject an empty entity name. Whitespace is a legal name.
pub fn require_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ServiceError::invalid(format!("{what} is empty")));
    }
    Ok(())
}
