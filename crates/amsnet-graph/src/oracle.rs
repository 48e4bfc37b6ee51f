//! Existence checks by exact name.
//!
//! "Not found" is an ordinary `Ok(None)` here; callers decide whether that is
//! an error for what they are doing.

use amsnet_core::error::Result;
use amsnet_core::types::RESERVED_NAME_KEY;
use amsnet_core::{Node, PropertyMap, Relationship};

use crate::cypher::QueryBuilder;
use crate::executor::Executor;
use crate::store::Row;

#[derive(Clone)]
pub struct ExistenceOracle {
    executor: Executor,
    builder: QueryBuilder,
}

impl ExistenceOracle {
    pub fn new(executor: Executor, builder: QueryBuilder) -> Self {
        Self { executor, builder }
    }

    /// Look up a node by name. The `name` key is not repeated in `properties`.
    pub async fn find_node(&self, name: &str) -> Result<Option<Node>> {
        let statement = self.builder.find_node(name)?;
        let rows = self.executor.execute_one(&statement).await?;
        Ok(rows.into_iter().next().map(|row| {
            let (name, properties) = split_row(row);
            Node { name, properties }
        }))
    }

    pub async fn node_exists(&self, name: &str) -> Result<bool> {
        Ok(self.find_node(name).await?.is_some())
    }

    /// First relationship whose type equals `name`.
    pub async fn find_relationship(&self, name: &str) -> Result<Option<Relationship>> {
        let statement = self.builder.find_relationship(name)?;
        let rows = self.executor.execute_one(&statement).await?;
        Ok(rows.into_iter().next().map(|row| {
            let (name, properties) = split_row(row);
            Relationship { name, properties }
        }))
    }
}

/// Separate the identifying name from the remaining properties.
pub(crate) fn split_row(row: Row) -> (String, PropertyMap) {
    let Row {
        name,
        mut properties,
    } = row;
    properties.remove(RESERVED_NAME_KEY);
    (name, properties)
}
