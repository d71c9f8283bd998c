//! TF-011: Manifest emission.
//!
//! Walks the graph in execution order and renders each node into a hashed
//! [`Declaration`]. The manifest fingerprint is the composite of those
//! hashes, so any change to any declaration changes it.

use super::builder::build_topology;
use super::error::{Result, TopologyError};
use super::fingerprint::{composite_hash, hash_declaration};
use super::graph::Graph;
use super::resolver::execution_order;
use super::types::{Declaration, Manifest, ResolvedConfig, ResourceKind};
use crate::resources;
use indexmap::IndexMap;
use tracing::{debug, info};

/// Emit the ordered manifest for an already built graph.
pub fn emit(cfg: &ResolvedConfig, graph: &Graph) -> Result<Manifest> {
    let order = execution_order(graph)?;

    let mut declarations = Vec::with_capacity(order.len());
    let mut summary: IndexMap<ResourceKind, u32> = IndexMap::new();
    for name in &order {
        let decl = declare(cfg, graph, name)?;
        *summary.entry(decl.kind).or_insert(0) += 1;
        declarations.push(decl);
    }
    summary.sort_keys();

    let hashes: Vec<&str> = declarations.iter().map(|d| d.hash.as_str()).collect();
    let fingerprint = composite_hash(&hashes);
    info!(declarations = declarations.len(), %fingerprint, "manifest emitted");

    Ok(Manifest {
        name: cfg.name.clone(),
        environment: cfg.environment.clone(),
        fingerprint,
        summary,
        declarations,
        outputs: graph.outputs().clone(),
    })
}

/// Render one node of `graph` as a hashed declaration.
fn declare(cfg: &ResolvedConfig, graph: &Graph, name: &str) -> Result<Declaration> {
    let node = graph.get(name).ok_or_else(|| TopologyError::UnknownReference {
        node: cfg.name.clone(),
        reference: name.to_string(),
    })?;
    let hash = hash_declaration(&node.name, node.kind, &node.attributes, &node.depends_on)?;
    debug!(name = %node.name, kind = %node.kind, %hash, "declared");
    Ok(Declaration {
        name: node.name.clone(),
        kind: node.kind,
        type_token: node.kind.type_token().to_string(),
        attributes: node.attributes.clone(),
        depends_on: node.depends_on.clone(),
        hash,
    })
}

/// Build and emit in one step.
pub fn generate(cfg: &ResolvedConfig) -> Result<Manifest> {
    let graph = build_topology(cfg)?;
    emit(cfg, &graph)
}

pub fn render_yaml(manifest: &Manifest) -> Result<String> {
    Ok(serde_yaml_ng::to_string(manifest)?)
}

pub fn render_json(manifest: &Manifest) -> Result<String> {
    Ok(serde_json::to_string_pretty(manifest)?)
}

/// One-line plan description of a declaration.
pub fn describe_declaration(decl: &Declaration) -> String {
    resources::describe(&decl.name, decl.kind, &decl.attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{resolved_web_app, resolved_with};
    use crate::core::types::ResourceNode;
    use std::collections::HashSet;

    fn assert_topological(manifest: &Manifest) {
        let mut seen = HashSet::new();
        for decl in &manifest.declarations {
            for dep in &decl.depends_on {
                assert!(seen.contains(dep.as_str()), "{} emitted before {}", decl.name, dep);
            }
            seen.insert(decl.name.as_str());
        }
    }

    #[test]
    fn test_tf011_declare_unknown_name_fails() {
        let cfg = resolved_web_app();
        let mut graph = Graph::new();
        graph.insert(ResourceNode::new("main-vpc", ResourceKind::Network)).unwrap();
        assert!(declare(&cfg, &graph, "main-vpc").is_ok());
        let err = declare(&cfg, &graph, "ghost").unwrap_err();
        assert!(
            matches!(err, TopologyError::UnknownReference { ref reference, .. } if reference == "ghost"),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_tf011_emit_is_topological() {
        let manifest = generate(&resolved_web_app()).unwrap();
        assert_topological(&manifest);
        assert_eq!(manifest.declarations[0].name, "main-vpc");
        assert_eq!(manifest.name, "web");
        assert_eq!(manifest.environment, "production");
    }

    #[test]
    fn test_tf011_every_node_emitted_once() {
        let cfg = resolved_web_app();
        let graph = build_topology(&cfg).unwrap();
        let manifest = emit(&cfg, &graph).unwrap();
        assert_eq!(manifest.declarations.len(), graph.len());
        let unique: HashSet<_> = manifest.declarations.iter().map(|d| &d.name).collect();
        assert_eq!(unique.len(), graph.len());
    }

    #[test]
    fn test_tf011_summary_counts() {
        let manifest = generate(&resolved_web_app()).unwrap();
        assert_eq!(manifest.summary[&ResourceKind::Instance], 5);
        assert_eq!(manifest.summary[&ResourceKind::Subnet], 4);
        assert_eq!(manifest.summary.keys().next(), Some(&ResourceKind::Network));
        let total: u32 = manifest.summary.values().sum();
        assert_eq!(total as usize, manifest.declarations.len());
    }

    #[test]
    fn test_tf011_deterministic_rendering() {
        let cfg = resolved_web_app();
        let a = generate(&cfg).unwrap();
        let b = generate(&cfg).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(render_yaml(&a).unwrap(), render_yaml(&b).unwrap());
        assert_eq!(render_json(&a).unwrap(), render_json(&b).unwrap());
    }

    #[test]
    fn test_tf011_fingerprint_tracks_changes() {
        let a = generate(&resolved_web_app()).unwrap();
        let b = generate(&resolved_with("t3.small", "t3.medium")).unwrap();
        assert_ne!(a.fingerprint, b.fingerprint);
        assert!(a.fingerprint.starts_with("blake3:"));
    }

    #[test]
    fn test_tf011_render_json_shape() {
        let manifest = generate(&resolved_web_app()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&render_json(&manifest).unwrap()).unwrap();
        let first = &json["declarations"][0];
        assert_eq!(first["type"], "aws:ec2/vpc:Vpc");
        assert_eq!(first["kind"], "network");
        assert_eq!(first["attributes"]["cidr_block"], "10.0.0.0/16");
        assert_eq!(json["summary"]["instance"], 5);
        assert_eq!(json["outputs"]["vpc_id"]["ref"], "main-vpc");
    }

    #[test]
    fn test_tf011_render_yaml_parses() {
        let manifest = generate(&resolved_web_app()).unwrap();
        let yaml = render_yaml(&manifest).unwrap();
        let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(value["fingerprint"].as_str(), Some(manifest.fingerprint.as_str()));
    }

    #[test]
    fn test_tf011_cycle_reported() {
        let cfg = resolved_web_app();
        let mut graph = Graph::new();
        graph
            .extend(vec![
                ResourceNode::new("a", ResourceKind::Subnet).after("b"),
                ResourceNode::new("b", ResourceKind::Subnet).after("a"),
            ])
            .unwrap();
        assert!(matches!(
            emit(&cfg, &graph),
            Err(TopologyError::CyclicDependency(_))
        ));
    }

    #[test]
    fn test_tf011_describe_declaration() {
        let manifest = generate(&resolved_web_app()).unwrap();
        let vpc = &manifest.declarations[0];
        assert_eq!(describe_declaration(vpc), "main-vpc: network 10.0.0.0/16");
    }
}
