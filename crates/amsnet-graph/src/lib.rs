//! AMSNet Graph: node and relationship CRUD over Neo4j.
//!
//! This crate is the single mutation point for the graph. Every read and
//! write goes through [`GraphService`], which validates input, checks
//! existence, serializes creation per name and runs each operation in a
//! transaction.

pub mod client;
pub mod cypher;
pub mod executor;
pub mod locks;
pub mod memory;
pub mod oracle;
pub mod service;
pub mod store;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use memory::MemoryGraphStore;
pub use service::{GraphService, ServiceConfig};
pub use store::{GraphStore, Neo4jStore};
