//! TF-013: Topology builder.
//!
//! Expands a resolved configuration into the full resource graph: network,
//! security, compute, then load balancing. Every family is appended in a
//! fixed order, so the same configuration always yields the same graph.

use super::error::Result;
use super::graph::Graph;
use super::types::{Reference, ResolvedConfig, ResourceKind, SubnetPlacement};
use crate::resources::{balancing, compute, network, security};
use tracing::{debug, info};

/// Build the resource graph for a resolved configuration.
pub fn build_topology(cfg: &ResolvedConfig) -> Result<Graph> {
    let mut graph = Graph::new();

    let families = [
        ("network", network::network_nodes(cfg)),
        ("security", security::security_nodes(cfg)),
        ("compute", compute::compute_nodes(cfg)),
        ("balancing", balancing::balancing_nodes(cfg)),
    ];
    for (family, nodes) in families {
        debug!(family, count = nodes.len(), "generated resources");
        graph.extend(nodes)?;
    }

    export_outputs(cfg, &mut graph);
    graph.check_references()?;

    info!(
        stack = %cfg.name,
        environment = %cfg.environment,
        resources = graph.len(),
        zones = cfg.zones.len(),
        "topology built"
    );
    Ok(graph)
}

fn export_outputs(cfg: &ResolvedConfig, graph: &mut Graph) {
    graph.export("vpc_id", Reference::id(network::VPC));
    for placement in [SubnetPlacement::Public, SubnetPlacement::Private] {
        let ids: Vec<Reference> = (0..cfg.zones.len())
            .map(|i| Reference::id(network::subnet_name(placement, i)))
            .collect();
        graph.export(&format!("{}_subnet_ids", placement), ids);
    }
    for spec in &cfg.tiers {
        let ids: Vec<Reference> = (0..spec.replicas)
            .map(|n| Reference::id(compute::instance_name(spec.tier, n as usize)))
            .collect();
        graph.export(&format!("{}_instance_ids", spec.tier), ids);
    }
    if graph.of_kind(ResourceKind::LoadBalancer).next().is_some() {
        graph.export(
            "alb_dns_name",
            Reference::attr(balancing::LOAD_BALANCER, "dns_name"),
        );
    }
}
