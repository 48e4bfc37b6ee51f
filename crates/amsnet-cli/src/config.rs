//! Configuration for the amsnet command-line tool.

use serde::Deserialize;

use amsnet_graph::{GraphConfig, ServiceConfig};

/// Top-level settings.
///
/// Loaded from `amsnet.toml` (or the file named by `--config`), then
/// overridden by `AMSNET__<SECTION>__<KEY>` environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Neo4j connection settings (`[neo4j]`).
    #[serde(default)]
    pub neo4j: GraphConfig,

    /// Service behaviour (`[service]`).
    #[serde(default)]
    pub service: ServiceConfig,
}

impl Settings {
    pub fn load(file_prefix: &str) -> anyhow::Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("AMSNET")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let settings = Settings::load(prefix.to_str().unwrap()).unwrap();

        assert_eq!(settings.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(settings.service.node_label, "AMSNet");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amsnet.toml");
        std::fs::write(
            &path,
            r#"
[neo4j]
uri = "bolt://graph.internal:7687"
max_connections = 4

[service]
node_label = "Plant"
"#,
        )
        .unwrap();

        let prefix = dir.path().join("amsnet");
        let settings = Settings::load(prefix.to_str().unwrap()).unwrap();

        assert_eq!(settings.neo4j.uri, "bolt://graph.internal:7687");
        assert_eq!(settings.neo4j.max_connections, 4);
        assert_eq!(settings.neo4j.user, "neo4j");
        assert_eq!(settings.service.node_label, "Plant");
    }
}
