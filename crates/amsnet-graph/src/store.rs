//! Transactional store seam and its Neo4j implementation.
//!
//! The service only ever talks to a [`GraphStore`]: begin a transaction, run
//! statements, commit or roll back. [`Neo4jStore`] is the production backend;
//! [`crate::memory::MemoryGraphStore`] stands in for it in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use neo4rs::{BoltType, Query};

use amsnet_core::{PropertyMap, PropertyValue};

use crate::client::{GraphClient, GraphError};
use crate::cypher::{Param, Statement};

/// One result row: the entity name and its raw property map.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub properties: PropertyMap,
}

/// Opens transactions against the graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTxn>, GraphError>;
}

/// An open transaction. Dropping it without `commit` discards its writes.
#[async_trait]
pub trait StoreTxn: Send {
    /// Run one statement and collect its rows.
    async fn run(&mut self, statement: &Statement) -> Result<Vec<Row>, GraphError>;

    async fn commit(self: Box<Self>) -> Result<(), GraphError>;

    async fn rollback(self: Box<Self>) -> Result<(), GraphError>;
}

// ── Neo4j ────────────────────────────────────────────────────────

/// [`GraphStore`] backed by a pooled Neo4j connection.
#[derive(Clone)]
pub struct Neo4jStore {
    client: GraphClient,
}

impl Neo4jStore {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn begin(&self) -> Result<Box<dyn StoreTxn>, GraphError> {
        let txn = self.client.start_txn().await?;
        Ok(Box::new(Neo4jTxn { txn }))
    }
}

struct Neo4jTxn {
    txn: neo4rs::Txn,
}

#[async_trait]
impl StoreTxn for Neo4jTxn {
    async fn run(&mut self, statement: &Statement) -> Result<Vec<Row>, GraphError> {
        let mut stream = self.txn.execute(to_query(statement)).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next(self.txn.handle()).await? {
            rows.push(decode_row(&row)?);
        }
        Ok(rows)
    }

    async fn commit(self: Box<Self>) -> Result<(), GraphError> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), GraphError> {
        self.txn.rollback().await?;
        Ok(())
    }
}

/// Build the driver query; every parameter is bound, never inlined.
fn to_query(statement: &Statement) -> Query {
    statement
        .params()
        .iter()
        .fold(neo4rs::query(statement.cypher()), |q, (key, param)| {
            let value = match param {
                Param::Value(v) => to_bolt(v),
                Param::Map(m) => {
                    let map: HashMap<String, BoltType> =
                        m.iter().map(|(k, v)| (k.clone(), to_bolt(v))).collect();
                    BoltType::from(map)
                }
            };
            q.param(key, value)
        })
}

fn to_bolt(value: &PropertyValue) -> BoltType {
    match value {
        PropertyValue::Bool(b) => BoltType::from(*b),
        PropertyValue::Int(i) => BoltType::from(*i),
        PropertyValue::Float(x) => BoltType::from(*x),
        PropertyValue::String(s) => BoltType::from(s.clone()),
    }
}

fn decode_row(row: &neo4rs::Row) -> Result<Row, GraphError> {
    let name: String = row
        .get("name")
        .map_err(|e| GraphError::Serialization(format!("Failed to decode name: {e}")))?;
    let properties: HashMap<String, PropertyValue> = row
        .get("props")
        .map_err(|e| GraphError::Serialization(format!("Failed to decode properties: {e}")))?;

    Ok(Row {
        name,
        properties: properties.into_iter().collect(),
    })
}
