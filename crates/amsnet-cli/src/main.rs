//! CLI entry point for the amsnet graph tool.
//!
//! One subcommand per service operation. Property maps are JSON objects of
//! scalars, passed with `--properties` or on stdin. Every invocation writes a
//! single JSON envelope to stdout; logs go to stderr.

mod config;
mod response;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use amsnet_core::{PropertyMap, ServiceError};
use amsnet_graph::{GraphClient, GraphService};

use crate::config::Settings;
use crate::response::{Envelope, Outcome};

#[derive(Parser)]
#[command(name = "amsnet")]
#[command(about = "Node and relationship CRUD for the AMSNet graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: amsnet).
    #[arg(short, long, default_value = "amsnet", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Create a node.
    CreateNode {
        #[arg(long)]
        name: String,
        /// JSON object of properties (read from stdin if omitted).
        #[arg(long)]
        properties: Option<String>,
    },
    /// Merge properties into an existing node.
    UpdateNode {
        #[arg(long)]
        name: String,
        /// JSON object of properties (read from stdin if omitted).
        #[arg(long)]
        properties: Option<String>,
    },
    /// Delete a node and all of its relationships.
    DeleteNode {
        #[arg(long)]
        name: String,
    },
    /// Look up a node by name.
    FindNode {
        #[arg(long)]
        name: String,
    },
    /// List all nodes.
    ListNodes {
        #[arg(long)]
        with_properties: bool,
    },
    /// Create a relationship; properties must include fromNode and toNode.
    CreateRelationship {
        #[arg(long)]
        name: String,
        /// JSON object of properties (read from stdin if omitted).
        #[arg(long)]
        properties: Option<String>,
    },
    /// Replace a relationship with a new one built from the given properties.
    UpdateRelationship {
        #[arg(long)]
        name: String,
        /// JSON object of properties (read from stdin if omitted).
        #[arg(long)]
        properties: Option<String>,
    },
    /// Delete the first relationship of the given type.
    DeleteRelationship {
        #[arg(long)]
        name: String,
    },
    /// Look up the first relationship of the given type.
    FindRelationship {
        #[arg(long)]
        name: String,
    },
    /// List all relationships.
    ListRelationships {
        #[arg(long)]
        with_properties: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;

    let client = GraphClient::connect(&settings.neo4j).await?;
    let service = GraphService::neo4j(client, &settings.service)?;

    let envelope = match dispatch(&service, cli.command).await? {
        Ok(outcome) => Envelope::success(outcome),
        Err(err) => {
            tracing::warn!(kind = ?err.kind(), error = %err, "Operation failed");
            Envelope::failure(&err)
        }
    };
    println!("{}", serde_json::to_string(&envelope)?);

    Ok(if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Run one command. The outer error is for I/O trouble reading input; the
/// inner one is the service outcome that goes into the envelope.
async fn dispatch(
    service: &GraphService,
    command: Command,
) -> anyhow::Result<Result<Outcome, ServiceError>> {
    let outcome = match command {
        Command::CreateNode { name, properties } => match read_properties(properties)? {
            Ok(props) => service.create_node(&name, &props).await.map(Outcome::Name),
            Err(e) => Err(e),
        },
        Command::UpdateNode { name, properties } => match read_properties(properties)? {
            Ok(props) => service.update_node(&name, &props).await.map(Outcome::Name),
            Err(e) => Err(e),
        },
        Command::DeleteNode { name } => service.delete_node(&name).await.map(Outcome::Name),
        Command::FindNode { name } => service.find_node(&name).await.map(Outcome::Node),
        Command::ListNodes { with_properties } => service
            .get_all_nodes(with_properties)
            .await
            .map(Outcome::Nodes),
        Command::CreateRelationship { name, properties } => match read_properties(properties)? {
            Ok(props) => service
                .create_relationship(&name, &props)
                .await
                .map(Outcome::Name),
            Err(e) => Err(e),
        },
        Command::UpdateRelationship { name, properties } => match read_properties(properties)? {
            Ok(props) => service
                .update_relationship(&name, &props)
                .await
                .map(Outcome::Name),
            Err(e) => Err(e),
        },
        Command::DeleteRelationship { name } => service
            .delete_relationship(&name)
            .await
            .map(Outcome::Name),
        Command::FindRelationship { name } => service
            .find_relationship(&name)
            .await
            .map(Outcome::Relationship),
        Command::ListRelationships { with_properties } => service
            .get_all_relationships(with_properties)
            .await
            .map(Outcome::Relationships),
    };
    Ok(outcome)
}

/// Properties from the flag, or from stdin when the flag is absent.
fn read_properties(arg: Option<String>) -> anyhow::Result<Result<PropertyMap, ServiceError>> {
    let raw = match arg {
        Some(raw) => raw,
        None => std::io::read_to_string(std::io::stdin())?,
    };
    Ok(parse_properties(&raw))
}

fn parse_properties(raw: &str) -> Result<PropertyMap, ServiceError> {
    if raw.trim().is_empty() {
        return Err(ServiceError::invalid("properties are empty"));
    }
    serde_json::from_str(raw).map_err(|e| {
        ServiceError::invalid(format!(
            "properties must be a JSON object of strings, numbers or booleans: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use amsnet_core::{ErrorKind, PropertyValue};

    #[test]
    fn test_parse_scalar_properties() {
        let props = parse_properties(r#"{"fromNode": "a", "toNode": "b", "w": 1.5}"#).unwrap();
        assert_eq!(props["fromNode"], PropertyValue::from("a"));
        assert_eq!(props["w"], PropertyValue::Float(1.5));
    }

    #[test]
    fn test_parse_rejects_nested_and_blank() {
        for raw in ["", "  ", r#"{"a": [1]}"#, r#"["a"]"#, "not json"] {
            let err = parse_properties(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "input {raw:?}");
        }
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "amsnet",
            "create-relationship",
            "--name",
            "FEEDS",
            "--properties",
            r#"{"fromNode":"a","toNode":"b"}"#,
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::CreateRelationship { ref name, properties: Some(_) } if name == "FEEDS"
        ));
        assert_eq!(cli.config, "amsnet");

        let cli = Cli::try_parse_from(["amsnet", "list-nodes", "--with-properties"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::ListNodes {
                with_properties: true
            }
        ));
    }
}
