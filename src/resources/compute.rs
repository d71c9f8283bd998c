//! TF-009: Compute family: tier instances, spread round-robin over zones.

use super::network::subnet_name;
use super::security::security_group_name;
use super::{show, tags_for};
use crate::core::graph::logical_name;
use crate::core::types::{AttrValue, Reference, ResolvedConfig, ResourceKind, ResourceNode, Tier};
use indexmap::IndexMap;

pub fn instance_name(tier: Tier, index: usize) -> String {
    logical_name(&tier.to_string(), "instance", index)
}

pub fn compute_nodes(cfg: &ResolvedConfig) -> Vec<ResourceNode> {
    let mut nodes = Vec::new();
    for spec in &cfg.tiers {
        let sg = security_group_name(spec.tier);
        for n in (0..spec.replicas).map(|n| n as usize) {
            let slot = cfg.zones.slot(n);
            let Some(zone) = cfg.zones.get(slot) else {
                continue;
            };
            let name = instance_name(spec.tier, n);
            nodes.push(
                ResourceNode::new(&name, ResourceKind::Instance)
                    .attr("ami", spec.ami.as_str())
                    .attr("instance_type", spec.instance_type.as_str())
                    .reference("subnet_id", &subnet_name(spec.tier.placement(), slot))
                    .attr("vpc_security_group_ids", vec![Reference::id(sg.as_str())])
                    .attr("key_name", cfg.key_name.as_str())
                    .attr("availability_zone", zone.name.as_str())
                    .attr("tags", tags_for(cfg, &name)),
            );
        }
    }
    nodes
}

pub(super) fn describe(attrs: &IndexMap<String, AttrValue>) -> String {
    format!(
        "{} instance from {} in {}",
        show(attrs, "instance_type"),
        show(attrs, "ami"),
        show(attrs, "subnet_id")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{resolved_web_app, resolved_with};

    #[test]
    fn test_tf009_replica_counts() {
        let cfg = resolved_web_app();
        let nodes = compute_nodes(&cfg);
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        // frontend defaults to one per zone, backend asks for 3, database for 0
        assert_eq!(
            names,
            vec![
                "frontend-instance-1",
                "frontend-instance-2",
                "backend-instance-1",
                "backend-instance-2",
                "backend-instance-3",
            ]
        );
    }

    #[test]
    fn test_tf009_round_robin_placement() {
        let cfg = resolved_web_app();
        let nodes = compute_nodes(&cfg);
        let third = nodes.iter().find(|n| n.name == "backend-instance-3").unwrap();
        assert_eq!(third.attributes["subnet_id"].as_ref_target(), Some("private-subnet-1"));
        assert_eq!(third.attributes["availability_zone"].as_str(), Some("ap-southeast-1a"));
        let second = nodes.iter().find(|n| n.name == "backend-instance-2").unwrap();
        assert_eq!(second.attributes["subnet_id"].as_ref_target(), Some("private-subnet-2"));
    }

    #[test]
    fn test_tf009_frontend_in_public_subnet() {
        let cfg = resolved_web_app();
        let nodes = compute_nodes(&cfg);
        assert_eq!(nodes[0].depends_on, vec!["public-subnet-1", "frontend-sg"]);
    }

    #[test]
    fn test_tf009_database_instances_when_requested() {
        let cfg = resolved_with("replicas: 0", "replicas: 1");
        let nodes = compute_nodes(&cfg);
        let db = nodes.iter().find(|n| n.name == "database-instance-1").unwrap();
        assert_eq!(db.depends_on, vec!["private-subnet-1", "database-sg"]);
        assert_eq!(db.attributes["key_name"].as_str(), Some("my-ssh-key"));
    }

    #[test]
    fn test_tf009_describe() {
        let cfg = resolved_web_app();
        let nodes = compute_nodes(&cfg);
        assert_eq!(
            describe(&nodes[0].attributes),
            "t2.micro instance from ami-0c55b159cbfafe1f0 in public-subnet-1"
        );
    }
}
