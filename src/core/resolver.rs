//! TF-004: Template resolution and dependency ordering.
//!
//! Resolves `{{project.name}}`, `{{project.environment}}`, and
//! `{{params.key}}` in tag values. Computes a topological order over the
//! resource graph using Kahn's algorithm; ties are broken by declaration
//! order so the same graph always yields the same sequence.

use super::error::{Result, TopologyError};
use super::graph::Graph;
use super::types::{yaml_value_to_string, Project};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use tracing::debug;

/// Values available to `{{...}}` templates.
pub struct TemplateContext<'a> {
    pub project: &'a Project,
    pub params: &'a HashMap<String, serde_yaml_ng::Value>,
}

/// Resolve all template variables in a string.
pub fn resolve_template(template: &str, ctx: &TemplateContext) -> std::result::Result<String, String> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(open) = result[start..].find("{{") {
        let open = start + open;
        let close = result[open..]
            .find("}}")
            .ok_or_else(|| format!("unclosed template at position {}", open))?;
        let close = open + close + 2;
        let key = result[open + 2..close - 2].trim();

        let value = if let Some(param_key) = key.strip_prefix("params.") {
            ctx.params
                .get(param_key)
                .map(yaml_value_to_string)
                .ok_or_else(|| format!("unknown param: {}", param_key))?
        } else {
            match key {
                "project.name" => ctx.project.name.clone(),
                "project.environment" => ctx.project.environment.clone(),
                _ => return Err(format!("unknown template variable: {}", key)),
            }
        };

        result.replace_range(open..close, &value);
        start = open + value.len();
    }

    Ok(result)
}

/// Build a topological execution order over the graph's nodes.
/// Uses Kahn's algorithm; among ready nodes the earliest-declared goes first.
pub fn execution_order(graph: &Graph) -> Result<Vec<String>> {
    let names: Vec<&str> = graph.nodes().map(|n| n.name.as_str()).collect();
    let index: FxHashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();

    let mut in_degree = vec![0usize; names.len()];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); names.len()];

    for (id, node) in graph.nodes().enumerate() {
        let mut seen = FxHashSet::default();
        let deps = node.depends_on.iter().map(String::as_str);
        for dep in deps.chain(node.attribute_refs()) {
            let dep_idx = *index.get(dep).ok_or_else(|| TopologyError::UnknownReference {
                node: node.name.clone(),
                reference: dep.to_string(),
            })?;
            if seen.insert(dep_idx) {
                adjacency[dep_idx].push(id);
                in_degree[id] += 1;
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(names.len());
    while let Some(Reverse(current)) = ready.pop() {
        order.push(names[current].to_string());
        for &next in &adjacency[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() != names.len() {
        let cycle_members: Vec<String> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > 0)
            .map(|(i, _)| names[i].to_string())
            .collect();
        return Err(TopologyError::CyclicDependency(cycle_members));
    }

    debug!(nodes = order.len(), "computed execution order");
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ResourceKind, ResourceNode};

    fn project() -> Project {
        Project {
            name: "web".to_string(),
            environment: "prod".to_string(),
        }
    }

    fn node(name: &str, deps: &[&str]) -> ResourceNode {
        deps.iter()
            .fold(ResourceNode::new(name, ResourceKind::Subnet), |n, d| n.after(d))
    }

    fn graph(nodes: Vec<ResourceNode>) -> Graph {
        let mut g = Graph::new();
        g.extend(nodes).unwrap();
        g
    }

    #[test]
    fn test_tf004_resolve_project() {
        let p = project();
        let params = HashMap::new();
        let ctx = TemplateContext { project: &p, params: &params };
        let result = resolve_template("{{project.name}}-{{ project.environment }}", &ctx).unwrap();
        assert_eq!(result, "web-prod");
    }

    #[test]
    fn test_tf004_resolve_params() {
        let p = project();
        let mut params = HashMap::new();
        params.insert(
            "owner".to_string(),
            serde_yaml_ng::Value::String("platform".to_string()),
        );
        let ctx = TemplateContext { project: &p, params: &params };
        assert_eq!(resolve_template("team-{{params.owner}}", &ctx).unwrap(), "team-platform");
    }

    #[test]
    fn test_tf004_resolve_unknown_param() {
        let p = project();
        let params = HashMap::new();
        let ctx = TemplateContext { project: &p, params: &params };
        let result = resolve_template("{{params.missing}}", &ctx);
        assert!(result.unwrap_err().contains("unknown param"));
    }

    #[test]
    fn test_tf004_resolve_unclosed() {
        let p = project();
        let params = HashMap::new();
        let ctx = TemplateContext { project: &p, params: &params };
        assert!(resolve_template("{{project.name", &ctx)
            .unwrap_err()
            .contains("unclosed"));
    }

    #[test]
    fn test_tf004_topo_linear() {
        let g = graph(vec![node("c", &["b"]), node("b", &["a"]), node("a", &[])]);
        assert_eq!(execution_order(&g).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tf004_topo_ties_follow_declaration_order() {
        let g = graph(vec![node("zeta", &[]), node("alpha", &[])]);
        // Declaration order, not alphabetical
        assert_eq!(execution_order(&g).unwrap(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_tf004_topo_diamond() {
        let g = graph(vec![
            node("top", &[]),
            node("right", &["top"]),
            node("left", &["top"]),
            node("bottom", &["left", "right"]),
        ]);
        let order = execution_order(&g).unwrap();
        assert_eq!(order, vec!["top", "right", "left", "bottom"]);
    }

    #[test]
    fn test_tf004_topo_lower_index_wins_among_ready() {
        // "late" is declared before "early", so once both are ready it goes first
        let g = graph(vec![
            node("a", &[]),
            node("late", &["b"]),
            node("b", &["a"]),
            node("early", &["a"]),
        ]);
        assert_eq!(execution_order(&g).unwrap(), vec!["a", "b", "late", "early"]);
    }

    #[test]
    fn test_tf004_topo_cycle() {
        let g = graph(vec![node("free", &[]), node("a", &["b"]), node("b", &["a"])]);
        let err = execution_order(&g).unwrap_err();
        match err {
            TopologyError::CyclicDependency(members) => assert_eq!(members, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tf004_topo_self_cycle() {
        let g = graph(vec![node("a", &["a"])]);
        assert!(matches!(
            execution_order(&g),
            Err(TopologyError::CyclicDependency(_))
        ));
    }

    #[test]
    fn test_tf004_topo_unknown_dependency() {
        let g = graph(vec![node("a", &["ghost"])]);
        assert!(matches!(
            execution_order(&g),
            Err(TopologyError::UnknownReference { .. })
        ));
    }
}
