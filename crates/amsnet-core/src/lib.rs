//! amsnet-core: Shared types and error handling for the AMSNet graph service.
//!
//! This crate provides the foundational types used by the service and its callers:
//! - Node and relationship records with their scalar property maps
//! - Identifier validation for tokens that end up in query text
//! - The error taxonomy returned by every service operation

pub mod error;
pub mod types;

pub use error::{ErrorKind, ServiceError};
pub use types::{EntityKind, Node, PropertyMap, PropertyValue, Relationship};
