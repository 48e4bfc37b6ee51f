//! In-memory [`GraphStore`] for tests and local runs.
//!
//! Behaves like an unconstrained Neo4j database as far as the service can
//! observe: node names are not unique at the storage level, relationship
//! lookups return the first match by type, and deleting a node takes its
//! incident relationships with it.
//!
//! A transaction reads from a snapshot taken at `begin`, stages its writes,
//! and replays them onto the shared graph at `commit`. Two transactions that
//! both create the same node therefore both succeed, which is exactly the race
//! the name locks exist to prevent.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use amsnet_core::types::RESERVED_NAME_KEY;
use amsnet_core::PropertyMap;

use crate::client::GraphError;
use crate::cypher::{GraphOp, Statement};
use crate::store::{GraphStore, Row, StoreTxn};

#[derive(Debug, Clone)]
struct StoredNode {
    properties: PropertyMap,
}

impl StoredNode {
    fn name(&self) -> Option<&str> {
        self.properties
            .get(RESERVED_NAME_KEY)
            .and_then(|v| v.as_str())
    }

    fn row(&self) -> Row {
        Row {
            name: self.name().unwrap_or_default().to_string(),
            properties: self.properties.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredEdge {
    rel_type: String,
    from: String,
    to: String,
    properties: PropertyMap,
}

impl StoredEdge {
    fn row(&self) -> Row {
        Row {
            name: self.rel_type.clone(),
            properties: self.properties.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphState {
    nodes: Vec<StoredNode>,
    edges: Vec<StoredEdge>,
}

impl GraphState {
    fn has_node(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n.name() == Some(name))
    }

    fn apply(&mut self, op: &GraphOp) -> Vec<Row> {
        match op {
            GraphOp::FindNode { name } => self
                .nodes
                .iter()
                .find(|n| n.name() == Some(name.as_str()))
                .map(StoredNode::row)
                .into_iter()
                .collect(),
            GraphOp::AllNodes => self.nodes.iter().map(StoredNode::row).collect(),
            GraphOp::CreateNode { name, properties } => {
                let mut properties = properties.clone();
                properties.insert(RESERVED_NAME_KEY.to_string(), name.as_str().into());
                let node = StoredNode { properties };
                let row = node.row();
                self.nodes.push(node);
                vec![row]
            }
            GraphOp::UpdateNode { name, properties } => self
                .nodes
                .iter_mut()
                .filter(|n| n.name() == Some(name.as_str()))
                .map(|n| {
                    n.properties
                        .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
                    n.row()
                })
                .collect(),
            GraphOp::DeleteNode { name } => {
                let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.nodes)
                    .into_iter()
                    .partition(|n| n.name() == Some(name.as_str()));
                self.nodes = kept;
                if !removed.is_empty() && !self.has_node(name) {
                    self.edges.retain(|e| e.from != *name && e.to != *name);
                }
                removed.iter().map(StoredNode::row).collect()
            }
            GraphOp::FindRelationship { rel_type } => self
                .edges
                .iter()
                .find(|e| e.rel_type == *rel_type)
                .map(StoredEdge::row)
                .into_iter()
                .collect(),
            GraphOp::AllRelationships => self.edges.iter().map(StoredEdge::row).collect(),
            GraphOp::CreateRelationship {
                rel_type,
                from,
                to,
                properties,
            } => {
                if !self.has_node(from) || !self.has_node(to) {
                    return Vec::new();
                }
                let edge = StoredEdge {
                    rel_type: rel_type.clone(),
                    from: from.clone(),
                    to: to.clone(),
                    properties: properties.clone(),
                };
                let row = edge.row();
                self.edges.push(edge);
                vec![row]
            }
            GraphOp::DeleteRelationship { rel_type } => {
                match self.edges.iter().position(|e| e.rel_type == *rel_type) {
                    Some(idx) => vec![self.edges.remove(idx).row()],
                    None => Vec::new(),
                }
            }
        }
    }
}

/// Shared in-process graph. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryGraphStore {
    state: Arc<Mutex<GraphState>>,
    fail_on: Arc<Mutex<Option<&'static str>>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next statement of the named operation (see
    /// [`GraphOp::op_name`]) fail with a backend error.
    pub fn fail_on(&self, op_name: &'static str) {
        *self.fail_on.lock().unwrap_or_else(PoisonError::into_inner) = Some(op_name);
    }

    /// Number of stored nodes carrying `name`, duplicates included.
    pub fn node_count(&self, name: &str) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.nodes.iter().filter(|n| n.name() == Some(name)).count()
    }

    /// Number of stored relationships of `rel_type`.
    pub fn relationship_count(&self, rel_type: &str) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.edges.iter().filter(|e| e.rel_type == rel_type).count()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn begin(&self) -> Result<Box<dyn StoreTxn>, GraphError> {
        let working = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(Box::new(MemoryTxn {
            shared: self.state.clone(),
            fail_on: self.fail_on.clone(),
            working,
            staged: Vec::new(),
        }))
    }
}

struct MemoryTxn {
    shared: Arc<Mutex<GraphState>>,
    fail_on: Arc<Mutex<Option<&'static str>>>,
    working: GraphState,
    staged: Vec<GraphOp>,
}

#[async_trait]
impl StoreTxn for MemoryTxn {
    async fn run(&mut self, statement: &Statement) -> Result<Vec<Row>, GraphError> {
        // Give concurrent transactions a chance to interleave, as a network round trip would.
        tokio::task::yield_now().await;

        let op = statement.op();
        {
            let mut fail_on = self.fail_on.lock().unwrap_or_else(PoisonError::into_inner);
            if *fail_on == Some(op.op_name()) {
                *fail_on = None;
                return Err(GraphError::Backend(format!(
                    "injected failure on {}",
                    op.op_name()
                )));
            }
        }

        let rows = self.working.apply(op);
        if op.is_mutation() {
            self.staged.push(op.clone());
        }
        Ok(rows)
    }

    async fn commit(self: Box<Self>) -> Result<(), GraphError> {
        tokio::task::yield_now().await;
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        for op in &self.staged {
            shared.apply(op);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), GraphError> {
        Ok(())
    }
}
