//! The graph mutation service: node and relationship CRUD.
//!
//! Every operation validates its input, checks current state through the
//! [`ExistenceOracle`], then hands rendered statements to the [`Executor`].
//! Creation paths run under a per-name lock so that two callers cannot both
//! pass the existence check before either commits.
//!
//! Other same-name operations are not serialized against each other; the
//! store's transaction isolation is the only protection there. A relationship
//! name is its type, so lookups, deletes and updates address the first
//! relationship of that type.

use std::sync::Arc;

use serde::Deserialize;

use amsnet_core::error::Result;
use amsnet_core::types::require_name;
use amsnet_core::{EntityKind, Node, PropertyMap, Relationship, ServiceError};

use crate::client::GraphClient;
use crate::cypher::{self, QueryBuilder, DEFAULT_NODE_LABEL};
use crate::executor::Executor;
use crate::locks::NameLocks;
use crate::oracle::{split_row, ExistenceOracle};
use crate::store::{GraphStore, Neo4jStore};

/// Service settings, loaded from the `[service]` config section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Label shared by all managed nodes.
    pub node_label: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            node_label: DEFAULT_NODE_LABEL.to_string(),
        }
    }
}

/// Node and relationship CRUD over a transactional graph store.
///
/// Clone is cheap: the store, the lock table and the builder are shared.
#[derive(Clone)]
pub struct GraphService {
    builder: QueryBuilder,
    executor: Executor,
    oracle: ExistenceOracle,
    locks: NameLocks,
}

impl GraphService {
    pub fn new(store: Arc<dyn GraphStore>, config: &ServiceConfig) -> Result<Self> {
        let builder = QueryBuilder::new(&config.node_label)?;
        let executor = Executor::new(store);
        let oracle = ExistenceOracle::new(executor.clone(), builder.clone());
        Ok(Self {
            builder,
            executor,
            oracle,
            locks: NameLocks::new(),
        })
    }

    /// Service over a connected Neo4j client.
    pub fn neo4j(client: GraphClient, config: &ServiceConfig) -> Result<Self> {
        Self::new(Arc::new(Neo4jStore::new(client)), config)
    }

    /// The lock table, exposed so callers can observe that it drains.
    pub fn locks(&self) -> &NameLocks {
        &self.locks
    }

    // ── Nodes ────────────────────────────────────────────────────

    /// Create a node. Fails with `AlreadyExists` if the name is taken.
    pub async fn create_node(&self, name: &str, properties: &PropertyMap) -> Result<String> {
        tracing::debug!(name, "create_node");
        let statement = self.builder.create_node(name, properties)?;

        let _guard = self.locks.acquire(EntityKind::Node, name).await;
        if self.oracle.node_exists(name).await? {
            return Err(ServiceError::already_exists(EntityKind::Node, name));
        }
        self.executor.execute_one(&statement).await?;

        tracing::info!(name, properties = properties.len(), "Node created");
        Ok(name.to_string())
    }

    /// Delete a node together with all of its relationships.
    pub async fn delete_node(&self, name: &str) -> Result<String> {
        tracing::debug!(name, "delete_node");
        let statement = self.builder.delete_node(name)?;

        if !self.oracle.node_exists(name).await? {
            return Err(ServiceError::not_found(EntityKind::Node, name));
        }
        self.executor.execute_one(&statement).await?;

        tracing::info!(name, "Node deleted");
        Ok(name.to_string())
    }

    /// Merge `properties` into an existing node. Keys not given are kept.
    pub async fn update_node(&self, name: &str, properties: &PropertyMap) -> Result<String> {
        tracing::debug!(name, "update_node");
        let statement = self.builder.update_node(name, properties)?;

        if !self.oracle.node_exists(name).await? {
            return Err(ServiceError::not_found(EntityKind::Node, name));
        }
        self.executor.execute_one(&statement).await?;

        tracing::info!(name, properties = properties.len(), "Node updated");
        Ok(name.to_string())
    }

    /// `Ok(None)` when no node has this name.
    pub async fn find_node(&self, name: &str) -> Result<Option<Node>> {
        self.oracle.find_node(name).await
    }

    /// Every managed node; properties are left empty unless requested.
    pub async fn get_all_nodes(&self, include_properties: bool) -> Result<Vec<Node>> {
        let rows = self.executor.execute_one(&self.builder.all_nodes()).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let (name, properties) = split_row(row);
                Node {
                    name,
                    properties: if include_properties {
                        properties
                    } else {
                        PropertyMap::new()
                    },
                }
            })
            .collect())
    }

    // ── Relationships ────────────────────────────────────────────

    /// Create a directed `fromNode -> toNode` relationship of type `name`.
    pub async fn create_relationship(
        &self,
        name: &str,
        properties: &PropertyMap,
    ) -> Result<String> {
        tracing::debug!(name, "create_relationship");
        let statement = self.builder.create_relationship(name, properties)?;
        let (from, to) = cypher::endpoints(properties)?;

        let _guard = self.locks.acquire(EntityKind::Relationship, name).await;
        self.require_endpoints(&from, &to).await?;
        if self.oracle.find_relationship(name).await?.is_some() {
            return Err(ServiceError::already_exists(EntityKind::Relationship, name));
        }
        self.executor.execute_one(&statement).await?;

        tracing::info!(name, from = %from, to = %to, "Relationship created");
        Ok(name.to_string())
    }

    /// Delete the first relationship of type `name`.
    pub async fn delete_relationship(&self, name: &str) -> Result<String> {
        tracing::debug!(name, "delete_relationship");
        let statement = self.builder.delete_relationship(name)?;

        if self.oracle.find_relationship(name).await?.is_none() {
            return Err(ServiceError::not_found(EntityKind::Relationship, name));
        }
        self.executor.execute_one(&statement).await?;

        tracing::info!(name, "Relationship deleted");
        Ok(name.to_string())
    }

    /// Replace a relationship: delete it and recreate it from `properties`.
    ///
    /// Both steps share one transaction, so readers never see the
    /// relationship missing and a failed recreate leaves the old one intact.
    /// Endpoints may change; `properties` is a full replacement, not a merge.
    pub async fn update_relationship(
        &self,
        name: &str,
        properties: &PropertyMap,
    ) -> Result<String> {
        tracing::debug!(name, "update_relationship");
        let delete = self.builder.delete_relationship(name)?;
        let create = self.builder.create_relationship(name, properties)?;
        let (from, to) = cypher::endpoints(properties)?;

        let _guard = self.locks.acquire(EntityKind::Relationship, name).await;
        if self.oracle.find_relationship(name).await?.is_none() {
            return Err(ServiceError::not_found(EntityKind::Relationship, name));
        }
        self.require_endpoints(&from, &to).await?;
        self.executor.execute(&[delete, create]).await?;

        tracing::info!(name, from = %from, to = %to, "Relationship updated");
        Ok(name.to_string())
    }

    /// `Ok(None)` when no relationship has this type.
    pub async fn find_relationship(&self, name: &str) -> Result<Option<Relationship>> {
        self.oracle.find_relationship(name).await
    }

    /// Every relationship between managed nodes.
    pub async fn get_all_relationships(
        &self,
        include_properties: bool,
    ) -> Result<Vec<Relationship>> {
        let rows = self
            .executor
            .execute_one(&self.builder.all_relationships())
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let (name, properties) = split_row(row);
                Relationship {
                    name,
                    properties: if include_properties {
                        properties
                    } else {
                        PropertyMap::new()
                    },
                }
            })
            .collect())
    }

    async fn require_endpoints(&self, from: &str, to: &str) -> Result<()> {
        for endpoint in [from, to] {
            require_name("endpoint node name", endpoint)?;
            if !self.oracle.node_exists(endpoint).await? {
                return Err(ServiceError::not_found(EntityKind::Node, endpoint));
            }
        }
        Ok(())
    }
}
