//! TF-003: Resource graph: an arena of nodes keyed by logical name.
//!
//! Insertion order is declaration order. Dependencies are name-based and are
//! only checked for resolution here; ordering is the resolver's job.

use super::error::{Result, TopologyError};
use super::types::{AttrValue, ResourceKind, ResourceNode};
use indexmap::IndexMap;

/// Generate an indexed logical name: `{prefix}-{kind}-{index+1}`.
pub fn logical_name(prefix: &str, kind: &str, index: usize) -> String {
    format!("{}-{}-{}", prefix, kind, index + 1)
}

/// Ordered collection of uniquely named resource nodes plus stack outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    nodes: IndexMap<String, ResourceNode>,
    outputs: IndexMap<String, AttrValue>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Fails if the logical name is already taken.
    pub fn insert(&mut self, node: ResourceNode) -> Result<()> {
        if self.nodes.contains_key(&node.name) {
            return Err(TopologyError::DuplicateName(node.name));
        }
        self.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    /// Add many nodes, stopping at the first collision.
    pub fn extend(&mut self, nodes: impl IntoIterator<Item = ResourceNode>) -> Result<()> {
        for node in nodes {
            self.insert(node)?;
        }
        Ok(())
    }

    /// Record a stack output. References inside it are checked with the nodes.
    pub fn export(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.outputs.insert(key.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ResourceNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Declaration index of a node.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.get_index_of(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    pub fn outputs(&self) -> &IndexMap<String, AttrValue> {
        &self.outputs
    }

    /// Nodes of one kind, in declaration order.
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values().filter(move |n| n.kind == kind)
    }

    /// Every dependency, attribute reference, and output must name a node here.
    pub fn check_references(&self) -> Result<()> {
        for node in self.nodes.values() {
            let refs = node.depends_on.iter().map(String::as_str);
            for target in refs.chain(node.attribute_refs()) {
                if !self.nodes.contains_key(target) {
                    return Err(TopologyError::UnknownReference {
                        node: node.name.clone(),
                        reference: target.to_string(),
                    });
                }
            }
        }
        for (key, value) in &self.outputs {
            let mut refs = Vec::new();
            value.collect_refs(&mut refs);
            if let Some(missing) = refs.into_iter().find(|r| !self.nodes.contains_key(*r)) {
                return Err(TopologyError::UnknownReference {
                    node: format!("output:{}", key),
                    reference: missing.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Reference;

    #[test]
    fn test_tf003_logical_name() {
        assert_eq!(logical_name("backend", "instance", 0), "backend-instance-1");
        assert_eq!(logical_name("private", "rt", 2), "private-rt-3");
    }

    #[test]
    fn test_tf003_insert_preserves_order() {
        let mut g = Graph::new();
        g.insert(ResourceNode::new("b", ResourceKind::Network)).unwrap();
        g.insert(ResourceNode::new("a", ResourceKind::Subnet)).unwrap();
        let names: Vec<_> = g.nodes().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(g.index_of("a"), Some(1));
        assert_eq!(g.of_kind(ResourceKind::Subnet).count(), 1);
    }

    #[test]
    fn test_tf003_duplicate_name_rejected() {
        let mut g = Graph::new();
        g.insert(ResourceNode::new("main-vpc", ResourceKind::Network)).unwrap();
        let err = g
            .insert(ResourceNode::new("main-vpc", ResourceKind::Subnet))
            .unwrap_err();
        assert!(matches!(err, TopologyError::DuplicateName(ref n) if n == "main-vpc"));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_tf003_unknown_reference() {
        let mut g = Graph::new();
        g.insert(ResourceNode::new("s", ResourceKind::Subnet).reference("vpc_id", "ghost"))
            .unwrap();
        let err = g.check_references().unwrap_err();
        assert!(matches!(
            err,
            TopologyError::UnknownReference { ref reference, .. } if reference == "ghost"
        ));
    }

    #[test]
    fn test_tf003_unknown_output_reference() {
        let mut g = Graph::new();
        g.insert(ResourceNode::new("main-vpc", ResourceKind::Network)).unwrap();
        g.export("vpc_id", Reference::id("main-vpc"));
        assert!(g.check_references().is_ok());
        g.export("alb_dns_name", Reference::attr("main-alb", "dns_name"));
        let err = g.check_references().unwrap_err();
        assert!(err.to_string().contains("output:alb_dns_name"));
    }
}
