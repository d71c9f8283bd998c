//! TF-008: Security family: one group per tier plus its egress rule.
//!
//! Ingress is least-privilege: the frontend accepts the internet on 80, 443,
//! and its service port; every other tier accepts only its upstream tier's
//! group, on its own port.

use super::network::VPC;
use super::{show, tags_for, ANYWHERE};
use crate::core::graph::logical_name;
use crate::core::types::{
    AttrValue, IngressRule, ResolvedConfig, ResourceKind, ResourceNode, RuleSource, Tier,
    TierSpec,
};
use indexmap::IndexMap;

const PUBLIC_PORTS: [u16; 2] = [80, 443];

pub fn security_group_name(tier: Tier) -> String {
    format!("{}-sg", tier)
}

/// Ingress rules for one tier, in emission order.
pub fn ingress_rules(spec: &TierSpec) -> Vec<IngressRule> {
    match spec.tier.trusted_upstream() {
        None => {
            let mut ports = PUBLIC_PORTS.to_vec();
            if !ports.contains(&spec.port) {
                ports.push(spec.port);
            }
            ports
                .into_iter()
                .map(|p| IngressRule::tcp(p, RuleSource::Cidr(ANYWHERE)))
                .collect()
        }
        Some(upstream) => vec![IngressRule::tcp(
            spec.port,
            RuleSource::SecurityGroup(security_group_name(upstream)),
        )],
    }
}

pub fn security_nodes(cfg: &ResolvedConfig) -> Vec<ResourceNode> {
    let mut nodes = Vec::with_capacity(cfg.tiers.len() * 2);
    for spec in &cfg.tiers {
        let sg = security_group_name(spec.tier);
        let ingress: Vec<AttrValue> = ingress_rules(spec).iter().map(AttrValue::from).collect();
        nodes.push(
            ResourceNode::new(&sg, ResourceKind::SecurityGroup)
                .reference("vpc_id", VPC)
                .attr("description", format!("Security group for {} instances", spec.tier))
                .attr("ingress", ingress)
                .attr("tags", tags_for(cfg, &sg)),
        );
        nodes.push(
            ResourceNode::new(logical_name(&sg, "egress", 0), ResourceKind::SecurityRule)
                .attr("type", "egress")
                .reference("security_group_id", &sg)
                .attr("protocol", "-1")
                .attr("from_port", 0i64)
                .attr("to_port", 0i64)
                .attr("cidr_blocks", vec![ANYWHERE]),
        );
    }
    nodes
}

pub(super) fn describe(kind: ResourceKind, attrs: &IndexMap<String, AttrValue>) -> String {
    match kind {
        ResourceKind::SecurityGroup => {
            let rules = match attrs.get("ingress") {
                Some(AttrValue::List(items)) => items.len(),
                _ => 0,
            };
            format!("security group with {} ingress rule(s)", rules)
        }
        _ => format!(
            "{} rule on {}",
            show(attrs, "type"),
            show(attrs, "security_group_id")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{resolved_web_app, resolved_with};

    fn ports(rules: &[IngressRule]) -> Vec<u16> {
        rules.iter().map(|r| r.from_port).collect()
    }

    #[test]
    fn test_tf008_frontend_open_to_internet() {
        let cfg = resolved_web_app();
        let rules = ingress_rules(cfg.tier(Tier::Frontend).unwrap());
        // default port 80 is already covered
        assert_eq!(ports(&rules), vec![80, 443]);
        assert!(rules.iter().all(|r| r.source == RuleSource::Cidr(ANYWHERE)));
    }

    #[test]
    fn test_tf008_frontend_custom_port_added() {
        let cfg = resolved_with("frontend:\n", "frontend:\n  port: 8080\n");
        let rules = ingress_rules(cfg.tier(Tier::Frontend).unwrap());
        assert_eq!(ports(&rules), vec![80, 443, 8080]);
    }

    #[test]
    fn test_tf008_backend_trusts_frontend_only() {
        let cfg = resolved_web_app();
        let rules = ingress_rules(cfg.tier(Tier::Backend).unwrap());
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].from_port, 4000);
        assert_eq!(rules[0].source, RuleSource::SecurityGroup("frontend-sg".into()));
    }

    #[test]
    fn test_tf008_database_trusts_backend_only() {
        let cfg = resolved_web_app();
        let rules = ingress_rules(cfg.tier(Tier::Database).unwrap());
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].from_port, 27017);
        assert_eq!(rules[0].source, RuleSource::SecurityGroup("backend-sg".into()));
    }

    #[test]
    fn test_tf008_group_dependencies() {
        let cfg = resolved_web_app();
        let nodes = security_nodes(&cfg);
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "frontend-sg",
                "frontend-sg-egress-1",
                "backend-sg",
                "backend-sg-egress-1",
                "database-sg",
                "database-sg-egress-1",
            ]
        );
        assert_eq!(nodes[0].depends_on, vec![VPC]);
        assert_eq!(nodes[2].depends_on, vec![VPC, "frontend-sg"]);
        assert_eq!(nodes[4].depends_on, vec![VPC, "backend-sg"]);
        assert_eq!(nodes[5].depends_on, vec!["database-sg"]);
    }

    #[test]
    fn test_tf008_describe() {
        let cfg = resolved_web_app();
        let nodes = security_nodes(&cfg);
        assert_eq!(
            describe(nodes[0].kind, &nodes[0].attributes),
            "security group with 2 ingress rule(s)"
        );
        assert_eq!(
            describe(nodes[1].kind, &nodes[1].attributes),
            "egress rule on frontend-sg"
        );
    }
}
