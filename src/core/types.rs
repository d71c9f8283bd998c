//! TF-001: Configuration schema, resource graph types, and emitted declarations.
//!
//! The configuration types derive Serialize/Deserialize for YAML (and TOML)
//! roundtripping and JsonSchema for `topoforge schema`. The graph types are
//! built once per invocation and never mutated after emission.

use indexmap::IndexMap;
use ipnet::Ipv4Net;
use schemars::JsonSchema;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Top-level topology.yaml
// ============================================================================

/// Root configuration: the desired topology of one stack.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopologyConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Stack identity
    pub project: Project,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Template parameters, referenced as `{{params.key}}` in tag values
    #[serde(default)]
    #[schemars(with = "HashMap<String, serde_json::Value>")]
    pub params: HashMap<String, serde_yaml_ng::Value>,

    /// Tags applied to every taggable resource (order-preserving)
    #[serde(default)]
    pub tags: IndexMap<String, String>,

    /// Virtual network layout
    pub network: NetworkConfig,

    /// Settings shared by all instances
    pub compute: ComputeConfig,

    /// Public tier
    pub frontend: TierConfig,

    /// Service tier
    pub backend: TierConfig,

    /// Data tier
    #[serde(alias = "mongodb")]
    pub database: TierConfig,
}

/// Stack identity.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub name: String,

    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_environment() -> String {
    "dev".to_string()
}

/// Network CIDR, zones, and per-zone subnet CIDRs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NetworkConfig {
    /// Network CIDR (e.g., "10.0.0.0/16")
    pub cidr_block: String,

    /// Ordered availability zones; one public and one private subnet each
    pub availability_zones: Vec<String>,

    /// Public subnet CIDR per zone, same order as the zones
    pub public_subnets: Vec<String>,

    /// Private subnet CIDR per zone, same order as the zones
    pub private_subnets: Vec<String>,

    /// Enable DNS support and hostnames on the network
    #[serde(default = "default_true")]
    pub enable_dns: bool,
}

fn default_true() -> bool {
    true
}

/// Settings shared by all instances.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ComputeConfig {
    /// SSH key pair identifier
    pub key_name: String,
}

/// Per-tier instance pool. Omitted fields fall back to the tier's defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TierConfig {
    /// Instance type (e.g., "t2.micro")
    pub instance_type: String,

    /// Machine image identifier (e.g., "ami-0c55b159cbfafe1f0")
    pub ami: String,

    /// Number of instances; defaults to one per zone
    #[serde(default)]
    pub replicas: Option<i64>,

    /// Service port
    #[serde(default)]
    pub port: Option<i64>,

    /// Target group health check path
    #[serde(default)]
    pub health_check_path: Option<String>,

    /// Front this tier with a target group and listener
    #[serde(default)]
    pub load_balanced: Option<bool>,
}

// ============================================================================
// Tiers
// ============================================================================

/// Logical application layer with its own security boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Frontend,
    Backend,
    Database,
}

impl Tier {
    /// All tiers, in declaration order.
    pub const ALL: [Tier; 3] = [Tier::Frontend, Tier::Backend, Tier::Database];

    pub fn default_port(self) -> u16 {
        match self {
            Self::Frontend => 80,
            Self::Backend => 3000,
            Self::Database => 27017,
        }
    }

    pub fn default_health_check_path(self) -> &'static str {
        match self {
            Self::Backend => "/health",
            Self::Frontend | Self::Database => "/",
        }
    }

    pub fn default_load_balanced(self) -> bool {
        !matches!(self, Self::Database)
    }

    /// Frontend instances live in public subnets; everything else is private.
    pub fn placement(self) -> SubnetPlacement {
        match self {
            Self::Frontend => SubnetPlacement::Public,
            Self::Backend | Self::Database => SubnetPlacement::Private,
        }
    }

    /// The tier whose security group is allowed in, or None for the internet.
    pub fn trusted_upstream(self) -> Option<Tier> {
        match self {
            Self::Frontend => None,
            Self::Backend => Some(Self::Frontend),
            Self::Database => Some(Self::Backend),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frontend => write!(f, "frontend"),
            Self::Backend => write!(f, "backend"),
            Self::Database => write!(f, "database"),
        }
    }
}

/// Which subnet family a tier's instances are placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetPlacement {
    Public,
    Private,
}

impl fmt::Display for SubnetPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
        }
    }
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// One availability zone and its subnet pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub name: String,
    pub public_cidr: Ipv4Net,
    pub private_cidr: Ipv4Net,
}

impl Zone {
    pub fn cidr(&self, placement: SubnetPlacement) -> Ipv4Net {
        match placement {
            SubnetPlacement::Public => self.public_cidr,
            SubnetPlacement::Private => self.private_cidr,
        }
    }
}

/// Ordered zones. Drives per-zone multiplicity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityZoneSet(Vec<Zone>);

impl AvailabilityZoneSet {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self(zones)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Zone> {
        self.0.iter()
    }

    /// Zone index for the n-th replica (0-based), round-robin.
    pub fn slot(&self, replica: usize) -> usize {
        replica % self.0.len().max(1)
    }

    pub fn get(&self, index: usize) -> Option<&Zone> {
        self.0.get(index)
    }
}

/// A tier with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSpec {
    pub tier: Tier,
    pub instance_type: String,
    pub ami: String,
    pub replicas: u32,
    pub port: u16,
    pub health_check_path: String,
    pub load_balanced: bool,
}

/// Immutable, fully validated configuration consumed by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub name: String,
    pub environment: String,
    pub tags: IndexMap<String, String>,
    pub network_cidr: Ipv4Net,
    pub enable_dns: bool,
    pub zones: AvailabilityZoneSet,
    pub key_name: String,
    /// Always frontend, backend, database
    pub tiers: Vec<TierSpec>,
}

impl ResolvedConfig {
    pub fn tier(&self, tier: Tier) -> Option<&TierSpec> {
        self.tiers.iter().find(|t| t.tier == tier)
    }
}

// ============================================================================
// Resource graph
// ============================================================================

/// Resource kind enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    InternetGateway,
    Subnet,
    RouteTable,
    Route,
    RouteTableAssociation,
    ElasticIp,
    NatGateway,
    SecurityGroup,
    SecurityRule,
    Instance,
    LoadBalancer,
    TargetGroup,
    Listener,
    Attachment,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 15] = [
        Self::Network,
        Self::InternetGateway,
        Self::Subnet,
        Self::RouteTable,
        Self::Route,
        Self::RouteTableAssociation,
        Self::ElasticIp,
        Self::NatGateway,
        Self::SecurityGroup,
        Self::SecurityRule,
        Self::Instance,
        Self::LoadBalancer,
        Self::TargetGroup,
        Self::Listener,
        Self::Attachment,
    ];

    /// Type token understood by the provisioning engine.
    pub fn type_token(self) -> &'static str {
        match self {
            Self::Network => "aws:ec2/vpc:Vpc",
            Self::InternetGateway => "aws:ec2/internetGateway:InternetGateway",
            Self::Subnet => "aws:ec2/subnet:Subnet",
            Self::RouteTable => "aws:ec2/routeTable:RouteTable",
            Self::Route => "aws:ec2/route:Route",
            Self::RouteTableAssociation => "aws:ec2/routeTableAssociation:RouteTableAssociation",
            Self::ElasticIp => "aws:ec2/eip:Eip",
            Self::NatGateway => "aws:ec2/natGateway:NatGateway",
            Self::SecurityGroup => "aws:ec2/securityGroup:SecurityGroup",
            Self::SecurityRule => "aws:ec2/securityGroupRule:SecurityGroupRule",
            Self::Instance => "aws:ec2/instance:Instance",
            Self::LoadBalancer => "aws:lb/loadBalancer:LoadBalancer",
            Self::TargetGroup => "aws:lb/targetGroup:TargetGroup",
            Self::Listener => "aws:lb/listener:Listener",
            Self::Attachment => "aws:lb/targetGroupAttachment:TargetGroupAttachment",
        }
    }

    /// Whether the engine accepts a `tags` attribute for this kind.
    pub fn taggable(self) -> bool {
        !matches!(
            self,
            Self::Route
                | Self::RouteTableAssociation
                | Self::SecurityRule
                | Self::Listener
                | Self::Attachment
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::InternetGateway => "internet_gateway",
            Self::Subnet => "subnet",
            Self::RouteTable => "route_table",
            Self::Route => "route",
            Self::RouteTableAssociation => "route_table_association",
            Self::ElasticIp => "elastic_ip",
            Self::NatGateway => "nat_gateway",
            Self::SecurityGroup => "security_group",
            Self::SecurityRule => "security_rule",
            Self::Instance => "instance",
            Self::LoadBalancer => "load_balancer",
            Self::TargetGroup => "target_group",
            Self::Listener => "listener",
            Self::Attachment => "attachment",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.to_string() == s)
            .ok_or_else(|| format!("unknown resource kind: {}", s))
    }
}

/// Name-based pointer to an attribute of another node in the same graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub target: String,
    pub attribute: String,
}

impl Reference {
    /// Reference to the target's `id`.
    pub fn id(target: impl Into<String>) -> Self {
        Self::attr(target, "id")
    }

    pub fn attr(target: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            attribute: attribute.into(),
        }
    }
}

/// Kind-specific attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Cidr(Ipv4Net),
    Ref(Reference),
    List(Vec<AttrValue>),
    Map(IndexMap<String, AttrValue>),
}

impl AttrValue {
    /// Collect every reference target, depth-first, in attribute order.
    pub fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Ref(r) => out.push(&r.target),
            Self::List(items) => items.iter().for_each(|v| v.collect_refs(out)),
            Self::Map(map) => map.values().for_each(|v| v.collect_refs(out)),
            Self::Str(_) | Self::Int(_) | Self::Bool(_) | Self::Cidr(_) => {}
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_ref_target(&self) -> Option<&str> {
        match self {
            Self::Ref(r) => Some(&r.target),
            _ => None,
        }
    }
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str(s) => serializer.serialize_str(s),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Cidr(net) => serializer.collect_str(net),
            Self::Ref(r) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("ref", &r.target)?;
                map.serialize_entry("attr", &r.attribute)?;
                map.end()
            }
            Self::List(items) => items.serialize(serializer),
            Self::Map(entries) => entries.serialize(serializer),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u16> for AttrValue {
    fn from(n: u16) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u32> for AttrValue {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Ipv4Net> for AttrValue {
    fn from(net: Ipv4Net) -> Self {
        Self::Cidr(net)
    }
}

impl From<Reference> for AttrValue {
    fn from(r: Reference) -> Self {
        Self::Ref(r)
    }
}

impl From<IndexMap<String, AttrValue>> for AttrValue {
    fn from(map: IndexMap<String, AttrValue>) -> Self {
        Self::Map(map)
    }
}

impl<T: Into<AttrValue>> From<Vec<T>> for AttrValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// A single declared infrastructure object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    /// Stable logical name
    pub name: String,

    pub kind: ResourceKind,

    /// Kind-specific attributes (order-preserving)
    pub attributes: IndexMap<String, AttrValue>,

    /// Logical names this node must follow
    pub depends_on: Vec<String>,
}

impl ResourceNode {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            attributes: IndexMap::new(),
            depends_on: Vec::new(),
        }
    }

    /// Set an attribute. References inside the value become dependencies.
    pub fn attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        let value = value.into();
        let mut refs = Vec::new();
        value.collect_refs(&mut refs);
        for target in refs {
            push_unique(&mut self.depends_on, target);
        }
        self.attributes.insert(key.to_string(), value);
        self
    }

    /// Set an attribute that points at another node's `id`.
    pub fn reference(self, key: &str, target: &str) -> Self {
        self.attr(key, Reference::id(target))
    }

    /// Add an ordering edge without an attribute.
    pub fn after(mut self, target: &str) -> Self {
        push_unique(&mut self.depends_on, target);
        self
    }

    /// All reference targets found in attributes.
    pub fn attribute_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for value in self.attributes.values() {
            value.collect_refs(&mut out);
        }
        out
    }
}

fn push_unique(deps: &mut Vec<String>, target: &str) {
    if !deps.iter().any(|d| d == target) {
        deps.push(target.to_string());
    }
}

// ============================================================================
// Security rules
// ============================================================================

/// Ingress traffic source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    Cidr(Ipv4Net),
    /// Logical name of another security group
    SecurityGroup(String),
}

/// One (protocol, port-range, source) ingress triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    pub source: RuleSource,
}

impl IngressRule {
    pub fn tcp(port: u16, source: RuleSource) -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: port,
            to_port: port,
            source,
        }
    }
}

impl From<&IngressRule> for AttrValue {
    fn from(rule: &IngressRule) -> Self {
        let mut map = IndexMap::new();
        map.insert("protocol".to_string(), AttrValue::from(rule.protocol.as_str()));
        map.insert("from_port".to_string(), AttrValue::from(rule.from_port));
        map.insert("to_port".to_string(), AttrValue::from(rule.to_port));
        match &rule.source {
            RuleSource::Cidr(net) => {
                map.insert("cidr_blocks".to_string(), AttrValue::from(vec![*net]));
            }
            RuleSource::SecurityGroup(sg) => {
                map.insert(
                    "security_groups".to_string(),
                    AttrValue::from(vec![Reference::id(sg.as_str())]),
                );
            }
        }
        AttrValue::Map(map)
    }
}

// ============================================================================
// Emitted declarations
// ============================================================================

/// A rendered node, ready for the provisioning engine's apply step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub name: String,

    pub kind: ResourceKind,

    /// Engine type token
    #[serde(rename = "type")]
    pub type_token: String,

    pub attributes: IndexMap<String, AttrValue>,

    pub depends_on: Vec<String>,

    /// BLAKE3 of name, kind, attributes, and dependencies
    pub hash: String,
}

/// The ordered declaration sequence plus stack outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub name: String,

    pub environment: String,

    /// Composite BLAKE3 of every declaration hash, in order
    pub fingerprint: String,

    /// Declaration count per kind
    pub summary: IndexMap<ResourceKind, u32>,

    pub declarations: Vec<Declaration>,

    pub outputs: IndexMap<String, AttrValue>,
}

// ============================================================================
// Template helper
// ============================================================================

/// Convert a serde_yaml_ng::Value to a string for template resolution.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}

// ============================================================================
// Tests
// ============================================================================
