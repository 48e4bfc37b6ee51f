//! Cypher statement builder.
//!
//! Turns a validated operation into a parameterized Cypher statement. Names,
//! endpoint names and property maps are always bound as parameters. The only
//! tokens written into the query text are the node label and the relationship
//! type, and both must pass [`validate_identifier`] first.

use std::fmt;

use amsnet_core::error::Result;
use amsnet_core::types::{
    require_name, validate_identifier, FROM_NODE_KEY, RESERVED_NAME_KEY, TO_NODE_KEY,
};
use amsnet_core::{EntityKind, PropertyMap, PropertyValue, ServiceError};

/// Label carried by every node the service manages.
pub const DEFAULT_NODE_LABEL: &str = "AMSNet";

// ── Operations ───────────────────────────────────────────────────

/// A single graph operation, already validated.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphOp {
    FindNode {
        name: String,
    },
    AllNodes,
    CreateNode {
        name: String,
        properties: PropertyMap,
    },
    UpdateNode {
        name: String,
        properties: PropertyMap,
    },
    DeleteNode {
        name: String,
    },
    FindRelationship {
        rel_type: String,
    },
    AllRelationships,
    CreateRelationship {
        rel_type: String,
        from: String,
        to: String,
        properties: PropertyMap,
    },
    DeleteRelationship {
        rel_type: String,
    },
}

impl GraphOp {
    /// Short operation name used in logs and failure injection.
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::FindNode { .. } => "find_node",
            Self::AllNodes => "all_nodes",
            Self::CreateNode { .. } => "create_node",
            Self::UpdateNode { .. } => "update_node",
            Self::DeleteNode { .. } => "delete_node",
            Self::FindRelationship { .. } => "find_relationship",
            Self::AllRelationships => "all_relationships",
            Self::CreateRelationship { .. } => "create_relationship",
            Self::DeleteRelationship { .. } => "delete_relationship",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateNode { .. }
                | Self::UpdateNode { .. }
                | Self::DeleteNode { .. }
                | Self::CreateRelationship { .. }
                | Self::DeleteRelationship { .. }
        )
    }

    /// The entity reported as missing when a statement matches nothing.
    ///
    /// A relationship create matches nothing only when an endpoint is gone.
    pub fn target(&self) -> (EntityKind, String) {
        match self {
            Self::FindNode { name }
            | Self::CreateNode { name, .. }
            | Self::UpdateNode { name, .. }
            | Self::DeleteNode { name } => (EntityKind::Node, name.clone()),
            Self::CreateRelationship { from, to, .. } => {
                (EntityKind::Node, format!("{from} or {to}"))
            }
            Self::FindRelationship { rel_type } | Self::DeleteRelationship { rel_type } => {
                (EntityKind::Relationship, rel_type.clone())
            }
            Self::AllNodes => (EntityKind::Node, String::new()),
            Self::AllRelationships => (EntityKind::Relationship, String::new()),
        }
    }
}

// ── Statements ───────────────────────────────────────────────────

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Value(PropertyValue),
    Map(PropertyMap),
}

/// A rendered Cypher statement plus the operation it implements.
///
/// Every statement that returns rows projects two columns: `name` and `props`.
#[derive(Debug, Clone)]
pub struct Statement {
    op: GraphOp,
    cypher: String,
    params: Vec<(&'static str, Param)>,
    must_match: bool,
}

impl Statement {
    fn new(op: GraphOp, cypher: String) -> Self {
        Self {
            op,
            cypher,
            params: Vec::new(),
            must_match: false,
        }
    }

    fn param(mut self, key: &'static str, value: Param) -> Self {
        self.params.push((key, value));
        self
    }

    fn text(self, key: &'static str, value: &str) -> Self {
        self.param(key, Param::Value(PropertyValue::from(value)))
    }

    /// Require at least one row back; otherwise the transaction is rolled back.
    fn must_match(mut self) -> Self {
        self.must_match = true;
        self
    }

    pub fn op(&self) -> &GraphOp {
        &self.op
    }

    pub fn cypher(&self) -> &str {
        &self.cypher
    }

    pub fn params(&self) -> &[(&'static str, Param)] {
        &self.params
    }

    pub fn requires_match(&self) -> bool {
        self.must_match
    }
}

/// The statement with its parameters inlined as escaped literals.
///
/// Used for log output only; the driver always receives bound parameters.
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // One pass over the template; inlined values are never rescanned.
        let mut rest = self.cypher.as_str();
        while let Some(pos) = rest.find('$') {
            f.write_str(&rest[..pos])?;
            let after = &rest[pos + 1..];
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let ident = &after[..end];
            match self.params.iter().find(|(key, _)| *key == ident) {
                Some((_, Param::Value(v))) => f.write_str(&render_value(v))?,
                Some((_, Param::Map(m))) => f.write_str(&render_map(m))?,
                None => write!(f, "${ident}")?,
            }
            rest = &after[end..];
        }
        f.write_str(rest)
    }
}

/// Quote a string for Cypher: backslashes doubled, quotes escaped.
pub fn escape_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('\'');
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn render_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::String(s) => escape_literal(s),
        other => other.to_string(),
    }
}

fn render_map(map: &PropertyMap) -> String {
    let fields: Vec<String> = map
        .iter()
        .map(|(k, v)| format!("`{}`: {}", k.replace('`', "``"), render_value(v)))
        .collect();
    format!("{{{}}}", fields.join(", "))
}

// ── Builder ──────────────────────────────────────────────────────

/// Builds statements against a single node label.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    label: String,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self {
            label: DEFAULT_NODE_LABEL.to_string(),
        }
    }
}

impl QueryBuilder {
    pub fn new(label: &str) -> Result<Self> {
        validate_identifier("node label", label)?;
        Ok(Self {
            label: label.to_string(),
        })
    }

    pub fn find_node(&self, name: &str) -> Result<Statement> {
        require_name("node name", name)?;
        let label = &self.label;
        let cypher = format!(
            "MATCH (n:`{label}` {{name: $name}})
             RETURN n.name AS name, properties(n) AS props
             LIMIT 1"
        );
        Ok(Statement::new(
            GraphOp::FindNode {
                name: name.to_string(),
            },
            cypher,
        )
        .text("name", name))
    }

    pub fn all_nodes(&self) -> Statement {
        let label = &self.label;
        let cypher = format!(
            "MATCH (n:`{label}`)
             RETURN n.name AS name, properties(n) AS props"
        );
        Statement::new(GraphOp::AllNodes, cypher)
    }

    pub fn create_node(&self, name: &str, properties: &PropertyMap) -> Result<Statement> {
        require_name("node name", name)?;
        let props = sanitize_properties(properties)?;
        let label = &self.label;
        let cypher = format!(
            "CREATE (n:`{label}` $props)
             SET n.name = $name
             RETURN n.name AS name, properties(n) AS props"
        );
        Ok(Statement::new(
            GraphOp::CreateNode {
                name: name.to_string(),
                properties: props.clone(),
            },
            cypher,
        )
        .text("name", name)
        .param("props", Param::Map(props))
        .must_match())
    }

    /// Merge `properties` into the node; keys not mentioned are left alone.
    pub fn update_node(&self, name: &str, properties: &PropertyMap) -> Result<Statement> {
        require_name("node name", name)?;
        let props = sanitize_properties(properties)?;
        let label = &self.label;
        let cypher = format!(
            "MATCH (n:`{label}` {{name: $name}})
             SET n += $props
             RETURN n.name AS name, properties(n) AS props"
        );
        Ok(Statement::new(
            GraphOp::UpdateNode {
                name: name.to_string(),
                properties: props.clone(),
            },
            cypher,
        )
        .text("name", name)
        .param("props", Param::Map(props))
        .must_match())
    }

    /// Detach-delete: incident relationships go with the node.
    pub fn delete_node(&self, name: &str) -> Result<Statement> {
        require_name("node name", name)?;
        let label = &self.label;
        let cypher = format!(
            "MATCH (n:`{label}` {{name: $name}})
             WITH n, n.name AS name, properties(n) AS props
             DETACH DELETE n
             RETURN name, props"
        );
        Ok(Statement::new(
            GraphOp::DeleteNode {
                name: name.to_string(),
            },
            cypher,
        )
        .text("name", name)
        .must_match())
    }

    /// First relationship of the given type, in whatever order the store yields them.
    pub fn find_relationship(&self, name: &str) -> Result<Statement> {
        validate_identifier("relationship name", name)?;
        let label = &self.label;
        let cypher = format!(
            "MATCH (:`{label}`)-[r:`{name}`]->(:`{label}`)
             RETURN type(r) AS name, properties(r) AS props
             LIMIT 1"
        );
        Ok(Statement::new(
            GraphOp::FindRelationship {
                rel_type: name.to_string(),
            },
            cypher,
        ))
    }

    pub fn all_relationships(&self) -> Statement {
        let label = &self.label;
        let cypher = format!(
            "MATCH (:`{label}`)-[r]->(:`{label}`)
             RETURN type(r) AS name, properties(r) AS props"
        );
        Statement::new(GraphOp::AllRelationships, cypher)
    }

    /// Directed edge `fromNode -> toNode` of type `name`.
    ///
    /// The endpoint entries stay on the edge as ordinary properties.
    pub fn create_relationship(&self, name: &str, properties: &PropertyMap) -> Result<Statement> {
        validate_identifier("relationship name", name)?;
        let (from, to) = endpoints(properties)?;
        let props = sanitize_properties(properties)?;
        let label = &self.label;
        let cypher = format!(
            "MATCH (a:`{label}` {{name: $from}})
             MATCH (b:`{label}` {{name: $to}})
             WITH a, b LIMIT 1
             CREATE (a)-[r:`{name}`]->(b)
             SET r = $props
             RETURN type(r) AS name, properties(r) AS props"
        );
        Ok(Statement::new(
            GraphOp::CreateRelationship {
                rel_type: name.to_string(),
                from: from.clone(),
                to: to.clone(),
                properties: props.clone(),
            },
            cypher,
        )
        .text("from", &from)
        .text("to", &to)
        .param("props", Param::Map(props))
        .must_match())
    }

    /// Deletes only the first relationship of that type.
    pub fn delete_relationship(&self, name: &str) -> Result<Statement> {
        validate_identifier("relationship name", name)?;
        let label = &self.label;
        let cypher = format!(
            "MATCH (:`{label}`)-[r:`{name}`]->(:`{label}`)
             WITH r LIMIT 1
             WITH r, type(r) AS name, properties(r) AS props
             DELETE r
             RETURN name, props"
        );
        Ok(Statement::new(
            GraphOp::DeleteRelationship {
                rel_type: name.to_string(),
            },
            cypher,
        )
        .must_match())
    }
}

/// Extract the `fromNode` / `toNode` names from relationship properties.
pub fn endpoints(properties: &PropertyMap) -> Result<(String, String)> {
    let endpoint = |key: &str| -> Result<String> {
        match properties.get(key) {
            Some(PropertyValue::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(PropertyValue::String(_)) | None => Err(ServiceError::invalid(format!(
                "relationship property '{key}' is missing or empty"
            ))),
            Some(_) => Err(ServiceError::invalid(format!(
                "relationship property '{key}' must be a node name"
            ))),
        }
    };
    Ok((endpoint(FROM_NODE_KEY)?, endpoint(TO_NODE_KEY)?))
}

/// Drop the reserved `name` key and validate every remaining key.
fn sanitize_properties(properties: &PropertyMap) -> Result<PropertyMap> {
    let mut props = PropertyMap::new();
    for (key, value) in properties {
        if key == RESERVED_NAME_KEY {
            continue;
        }
        validate_identifier("property key", key)?;
        props.insert(key.clone(), value.clone());
    }
    if props.is_empty() {
        return Err(ServiceError::invalid("properties are empty"));
    }
    Ok(props)
}
