//! TF-006: Error taxonomy for loading, building, and emitting topologies.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the core.
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Every failure the core can surface. None of these are retried.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Invalid or missing input field.
    #[error("configuration error in '{field}': {message}")]
    Configuration { field: String, message: String },

    /// Two generation rules produced the same logical name.
    #[error("duplicate logical name '{0}'")]
    DuplicateName(String),

    /// A node references a name that is not in the graph.
    #[error("resource '{node}' references unknown resource '{reference}'")]
    UnknownReference { node: String, reference: String },

    /// No topological order exists.
    #[error("dependency cycle detected involving: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TopologyError {
    /// Shorthand for a [`TopologyError::Configuration`].
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The offending field, when this is a configuration error.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Configuration { field, .. } => Some(field),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tf006_config_display_names_field() {
        let e = TopologyError::config("network.cidr_block", "not a CIDR");
        assert_eq!(
            e.to_string(),
            "configuration error in 'network.cidr_block': not a CIDR"
        );
        assert_eq!(e.field(), Some("network.cidr_block"));
    }

    #[test]
    fn test_tf006_cycle_display_lists_members() {
        let e = TopologyError::CyclicDependency(vec!["a".into(), "b".into()]);
        assert_eq!(e.to_string(), "dependency cycle detected involving: a, b");
        assert!(e.field().is_none());
    }

    #[test]
    fn test_tf006_io_display() {
        let e = TopologyError::io(
            "/nope/topology.yaml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(e.to_string().contains("/nope/topology.yaml"));
    }
}
