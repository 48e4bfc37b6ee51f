//! JSON response envelope written to stdout.

use serde::Serialize;

use amsnet_core::{ErrorKind, Node, Relationship, ServiceError};

/// Payload of a successful operation.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Name(String),
    Node(Option<Node>),
    Nodes(Vec<Node>),
    Relationship(Option<Relationship>),
    Relationships(Vec<Relationship>),
}

/// `{ code, data, message }`; code 0 means success.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub code: i32,
    pub data: Option<Outcome>,
    pub message: String,
}

impl Envelope {
    pub fn success(data: Outcome) -> Self {
        Self {
            code: 0,
            data: Some(data),
            message: "ok".to_string(),
        }
    }

    pub fn failure(err: &ServiceError) -> Self {
        Self {
            code: error_code(err.kind()),
            data: None,
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

pub fn error_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::InvalidArgument => 40000,
        ErrorKind::NotFound => 40400,
        ErrorKind::AlreadyExists => 40900,
        ErrorKind::StoreError => 50000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amsnet_core::{EntityKind, PropertyMap};

    #[test]
    fn test_success_envelope_shape() {
        let env = Envelope::success(Outcome::Name("pump".into()));
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["data"], "pump");
        assert!(env.is_success());
    }

    #[test]
    fn test_missing_entity_is_null_data() {
        let env = Envelope::success(Outcome::Node(None));
        let json = serde_json::to_value(&env).unwrap();
        assert!(json["data"].is_null());
    }

    #[test]
    fn test_node_list_serializes_properties() {
        let node = Node {
            name: "a".into(),
            properties: PropertyMap::new(),
        };
        let json = serde_json::to_value(Envelope::success(Outcome::Nodes(vec![node]))).unwrap();
        assert_eq!(json["data"][0]["name"], "a");
        assert!(json["data"][0]["properties"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_failure_envelope_codes() {
        let err = ServiceError::not_found(EntityKind::Node, "a");
        let env = Envelope::failure(&err);
        assert_eq!(env.code, 40400);
        assert_eq!(env.message, "Node not found: a");
        assert!(!env.is_success());

        assert_eq!(error_code(ErrorKind::InvalidArgument), 40000);
        assert_eq!(error_code(ErrorKind::AlreadyExists), 40900);
        assert_eq!(error_code(ErrorKind::StoreError), 50000);
    }
}
