//! TF-010: Load-balancing family.
//!
//! Every load-balanced tier gets a target group, one attachment per
//! instance, and a listener on the shared application load balancer. The
//! balancer itself sits in the public subnets behind the frontend group and
//! is only declared when at least one tier is load balanced.

use super::compute::instance_name;
use super::network::{subnet_name, VPC};
use super::security::security_group_name;
use super::{show, tags_for};
use crate::core::graph::logical_name;
use crate::core::types::{
    AttrValue, Reference, ResolvedConfig, ResourceKind, ResourceNode, SubnetPlacement, Tier,
    TierSpec,
};
use indexmap::IndexMap;

pub const LOAD_BALANCER: &str = "main-alb";

pub fn target_group_name(tier: Tier) -> String {
    format!("{}-tg", tier)
}

pub fn listener_name(tier: Tier) -> String {
    format!("{}-listener", tier)
}

fn health_check(spec: &TierSpec) -> AttrValue {
    let mut check = IndexMap::new();
    check.insert("path".to_string(), AttrValue::from(spec.health_check_path.as_str()));
    check.insert("port".to_string(), AttrValue::from("traffic-port"));
    check.insert("protocol".to_string(), AttrValue::from("HTTP"));
    check.insert("matcher".to_string(), AttrValue::from("200"));
    AttrValue::Map(check)
}

fn forward_to(target_group: &str) -> AttrValue {
    let mut action = IndexMap::new();
    action.insert("type".to_string(), AttrValue::from("forward"));
    action.insert(
        "target_group_arn".to_string(),
        AttrValue::from(Reference::attr(target_group, "arn")),
    );
    AttrValue::Map(action)
}

/// Order `node` after every instance of the tier it fronts.
fn after_instances(node: ResourceNode, spec: &TierSpec) -> ResourceNode {
    (0..spec.replicas as usize).fold(node, |node, n| node.after(&instance_name(spec.tier, n)))
}

pub fn balancing_nodes(cfg: &ResolvedConfig) -> Vec<ResourceNode> {
    let fronted: Vec<&TierSpec> = cfg.tiers.iter().filter(|t| t.load_balanced).collect();
    let mut nodes = Vec::new();

    for spec in &fronted {
        let tg = target_group_name(spec.tier);
        let group = ResourceNode::new(&tg, ResourceKind::TargetGroup)
            .attr("port", spec.port)
            .attr("protocol", "HTTP")
            .attr("target_type", "instance")
            .reference("vpc_id", VPC)
            .attr("health_check", health_check(spec))
            .attr("tags", tags_for(cfg, &tg));
        nodes.push(after_instances(group, spec));
        for n in (0..spec.replicas).map(|n| n as usize) {
            nodes.push(
                ResourceNode::new(logical_name(&tg, "attachment", n), ResourceKind::Attachment)
                    .attr("target_group_arn", Reference::attr(tg.as_str(), "arn"))
                    .reference("target_id", &instance_name(spec.tier, n))
                    .attr("port", spec.port),
            );
        }
    }

    if fronted.is_empty() {
        return nodes;
    }

    let subnets: Vec<Reference> = (0..cfg.zones.len())
        .map(|i| Reference::id(subnet_name(SubnetPlacement::Public, i)))
        .collect();
    let balancer = ResourceNode::new(LOAD_BALANCER, ResourceKind::LoadBalancer)
        .attr("internal", false)
        .attr("load_balancer_type", "application")
        .attr(
            "security_groups",
            vec![Reference::id(security_group_name(Tier::Frontend))],
        )
        .attr("subnets", subnets)
        .attr("tags", tags_for(cfg, LOAD_BALANCER));
    nodes.push(fronted.iter().fold(balancer, |node, spec| after_instances(node, spec)));

    for spec in &fronted {
        nodes.push(
            ResourceNode::new(listener_name(spec.tier), ResourceKind::Listener)
                .attr("load_balancer_arn", Reference::attr(LOAD_BALANCER, "arn"))
                .attr("port", spec.port)
                .attr("protocol", "HTTP")
                .attr("default_actions", vec![forward_to(&target_group_name(spec.tier))]),
        );
    }

    nodes
}

pub(super) fn describe(kind: ResourceKind, attrs: &IndexMap<String, AttrValue>) -> String {
    match kind {
        ResourceKind::LoadBalancer => format!(
            "application load balancer across {} subnet(s)",
            match attrs.get("subnets") {
                Some(AttrValue::List(items)) => items.len(),
                _ => 0,
            }
        ),
        ResourceKind::TargetGroup => format!(
            "target group on port {} checking {}",
            show(attrs, "port"),
            match attrs.get("health_check") {
                Some(AttrValue::Map(check)) => show(check, "path"),
                _ => "?".to_string(),
            }
        ),
        ResourceKind::Listener => format!(
            "listener on port {} of {}",
            show(attrs, "port"),
            show(attrs, "load_balancer_arn")
        ),
        _ => format!(
            "attach {} to {}",
            show(attrs, "target_id"),
            show(attrs, "target_group_arn")
        ),
    }
}
