//! TF-014: Generation rules: one module per resource family.
//!
//! Each family produces:
//! 1. The nodes it contributes to the graph, in declaration order
//! 2. A one-line human description of each node it owns

pub mod balancing;
pub mod compute;
pub mod network;
pub mod security;

use crate::core::types::{AttrValue, ResolvedConfig, ResourceKind};
use indexmap::IndexMap;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// `0.0.0.0/0`
pub const ANYWHERE: Ipv4Net = Ipv4Net::new_assert(Ipv4Addr::UNSPECIFIED, 0);

/// Config tags plus `Name`, which always wins.
pub fn tags_for(cfg: &ResolvedConfig, name: &str) -> AttrValue {
    let mut tags: IndexMap<String, AttrValue> = cfg
        .tags
        .iter()
        .filter(|(k, _)| k.as_str() != "Name")
        .map(|(k, v)| (k.clone(), AttrValue::from(v.as_str())))
        .collect();
    tags.insert("Name".to_string(), AttrValue::from(name));
    AttrValue::Map(tags)
}

/// Short display form of an attribute, for descriptions.
fn show(attributes: &IndexMap<String, AttrValue>, key: &str) -> String {
    match attributes.get(key) {
        Some(AttrValue::Str(s)) => s.clone(),
        Some(AttrValue::Int(n)) => n.to_string(),
        Some(AttrValue::Bool(b)) => b.to_string(),
        Some(AttrValue::Cidr(net)) => net.to_string(),
        Some(AttrValue::Ref(r)) => r.target.clone(),
        Some(AttrValue::List(items)) => format!("{} item(s)", items.len()),
        Some(AttrValue::Map(_)) | None => "?".to_string(),
    }
}

/// Generate a human-readable description of a declared resource.
pub fn describe(name: &str, kind: ResourceKind, attributes: &IndexMap<String, AttrValue>) -> String {
    let what = match kind {
        ResourceKind::Network
        | ResourceKind::InternetGateway
        | ResourceKind::Subnet
        | ResourceKind::RouteTable
        | ResourceKind::Route
        | ResourceKind::RouteTableAssociation
        | ResourceKind::ElasticIp
        | ResourceKind::NatGateway => network::describe(kind, attributes),
        ResourceKind::SecurityGroup | ResourceKind::SecurityRule => {
            security::describe(kind, attributes)
        }
        ResourceKind::Instance => compute::describe(attributes),
        ResourceKind::LoadBalancer
        | ResourceKind::TargetGroup
        | ResourceKind::Listener
        | ResourceKind::Attachment => balancing::describe(kind, attributes),
    };
    format!("{}: {}", name, what)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::resolved_web_app;

    #[test]
    fn test_tf014_tags_include_name_last() {
        let cfg = resolved_web_app();
        let AttrValue::Map(tags) = tags_for(&cfg, "main-vpc") else {
            panic!("tags must be a map");
        };
        let keys: Vec<_> = tags.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Project", "Owner", "Name"]);
        assert_eq!(tags["Name"].as_str(), Some("main-vpc"));
    }

    #[test]
    fn test_tf014_anywhere() {
        assert_eq!(ANYWHERE.to_string(), "0.0.0.0/0");
    }

    #[test]
    fn test_tf014_describe_prefixes_name() {
        let mut attrs = IndexMap::new();
        attrs.insert("cidr_block".to_string(), AttrValue::Cidr("10.0.0.0/16".parse().unwrap()));
        let d = describe("main-vpc", ResourceKind::Network, &attrs);
        assert_eq!(d, "main-vpc: network 10.0.0.0/16");
    }
}
