//! TF-007: Network family: VPC, gateways, subnets, routing.
//!
//! Each zone yields a public and a private subnet, a NAT gateway with its
//! elastic IP, a public route table through the internet gateway, and a
//! private route table routed through the zone's NAT gateway.

use super::{show, tags_for, ANYWHERE};
use crate::core::graph::logical_name;
use crate::core::types::{
    AttrValue, ResolvedConfig, ResourceKind, ResourceNode, SubnetPlacement,
};
use indexmap::IndexMap;

pub const VPC: &str = "main-vpc";
pub const INTERNET_GATEWAY: &str = "main-igw";

pub fn subnet_name(placement: SubnetPlacement, index: usize) -> String {
    logical_name(&placement.to_string(), "subnet", index)
}

pub fn nat_gateway_name(index: usize) -> String {
    logical_name("nat", "gateway", index)
}

pub fn public_route_table_name(index: usize) -> String {
    logical_name("public", "rt", index)
}

pub fn private_route_table_name(index: usize) -> String {
    logical_name("private", "rt", index)
}

/// Generate the network family for a resolved config.
pub fn network_nodes(cfg: &ResolvedConfig) -> Vec<ResourceNode> {
    let mut nodes = vec![
        ResourceNode::new(VPC, ResourceKind::Network)
            .attr("cidr_block", cfg.network_cidr)
            .attr("enable_dns_hostnames", cfg.enable_dns)
            .attr("enable_dns_support", cfg.enable_dns)
            .attr("tags", tags_for(cfg, VPC)),
        ResourceNode::new(INTERNET_GATEWAY, ResourceKind::InternetGateway)
            .reference("vpc_id", VPC)
            .attr("tags", tags_for(cfg, INTERNET_GATEWAY)),
    ];

    for (i, zone) in cfg.zones.iter().enumerate() {
        for placement in [SubnetPlacement::Public, SubnetPlacement::Private] {
            let name = subnet_name(placement, i);
            nodes.push(
                ResourceNode::new(&name, ResourceKind::Subnet)
                    .reference("vpc_id", VPC)
                    .attr("cidr_block", zone.cidr(placement))
                    .attr("availability_zone", zone.name.as_str())
                    .attr(
                        "map_public_ip_on_launch",
                        placement == SubnetPlacement::Public,
                    )
                    .attr("tags", tags_for(cfg, &name)),
            );
        }
    }

    for i in 0..cfg.zones.len() {
        let rt = public_route_table_name(i);
        nodes.push(
            ResourceNode::new(&rt, ResourceKind::RouteTable)
                .reference("vpc_id", VPC)
                .after(INTERNET_GATEWAY)
                .attr("tags", tags_for(cfg, &rt)),
        );
        nodes.push(
            ResourceNode::new(logical_name("public", "route", i), ResourceKind::Route)
                .reference("route_table_id", &rt)
                .attr("destination_cidr_block", ANYWHERE)
                .reference("gateway_id", INTERNET_GATEWAY),
        );
        nodes.push(
            ResourceNode::new(
                logical_name("public", "rt-association", i),
                ResourceKind::RouteTableAssociation,
            )
            .reference("subnet_id", &subnet_name(SubnetPlacement::Public, i))
            .reference("route_table_id", &rt),
        );
    }

    for i in 0..cfg.zones.len() {
        let eip = logical_name("nat", "eip", i);
        let nat = nat_gateway_name(i);
        nodes.push(
            ResourceNode::new(&eip, ResourceKind::ElasticIp)
                .attr("domain", "vpc")
                .attr("tags", tags_for(cfg, &eip)),
        );
        nodes.push(
            ResourceNode::new(&nat, ResourceKind::NatGateway)
                .reference("allocation_id", &eip)
                .reference("subnet_id", &subnet_name(SubnetPlacement::Public, i))
                .after(INTERNET_GATEWAY)
                .attr("tags", tags_for(cfg, &nat)),
        );
    }

    for i in 0..cfg.zones.len() {
        let rt = private_route_table_name(i);
        let nat = nat_gateway_name(i);
        nodes.push(
            ResourceNode::new(&rt, ResourceKind::RouteTable)
                .reference("vpc_id", VPC)
                .after(&subnet_name(SubnetPlacement::Public, i))
                .after(&nat)
                .attr("tags", tags_for(cfg, &rt)),
        );
        nodes.push(
            ResourceNode::new(logical_name("private", "route", i), ResourceKind::Route)
                .reference("route_table_id", &rt)
                .attr("destination_cidr_block", ANYWHERE)
                .reference("nat_gateway_id", &nat),
        );
        nodes.push(
            ResourceNode::new(
                logical_name("private", "rt-association", i),
                ResourceKind::RouteTableAssociation,
            )
            .reference("subnet_id", &subnet_name(SubnetPlacement::Private, i))
            .reference("route_table_id", &rt),
        );
    }

    nodes
}

pub(super) fn describe(kind: ResourceKind, attrs: &IndexMap<String, AttrValue>) -> String {
    match kind {
        ResourceKind::Network => format!("network {}", show(attrs, "cidr_block")),
        ResourceKind::InternetGateway => format!("internet gateway for {}", show(attrs, "vpc_id")),
        ResourceKind::Subnet => format!(
            "subnet {} in {}",
            show(attrs, "cidr_block"),
            show(attrs, "availability_zone")
        ),
        ResourceKind::RouteTable => format!("route table in {}", show(attrs, "vpc_id")),
        ResourceKind::Route => {
            let via = if attrs.contains_key("nat_gateway_id") {
                show(attrs, "nat_gateway_id")
            } else {
                show(attrs, "gateway_id")
            };
            format!(
                "route {} via {} in {}",
                show(attrs, "destination_cidr_block"),
                via,
                show(attrs, "route_table_id")
            )
        }
        ResourceKind::RouteTableAssociation => format!(
            "associate {} with {}",
            show(attrs, "subnet_id"),
            show(attrs, "route_table_id")
        ),
        ResourceKind::ElasticIp => "allocate elastic IP".to_string(),
        ResourceKind::NatGateway => format!("NAT gateway in {}", show(attrs, "subnet_id")),
        other => format!("create {}", other),
    }
}
