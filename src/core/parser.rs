//! TF-002: Configuration parsing, validation, and resolution.
//!
//! Parses topology.yaml (or .toml) and validates structural constraints:
//! - Version must be "1.0"
//! - CIDRs are well-formed, inside the network, and never overlap
//! - Zone and subnet lists have the same length
//! - Replica counts, ports, images, and instance types are in range
//!
//! Every violation names the offending field.

use super::error::{Result, TopologyError};
use super::resolver::{resolve_template, TemplateContext};
use super::types::*;
use indexmap::IndexMap;
use ipnet::Ipv4Net;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Upper bound on instances per tier.
pub const MAX_REPLICAS: i64 = 100;

static AMI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ami-([0-9a-f]{8}|[0-9a-f]{17})$").expect("static regex"));
static INSTANCE_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*\.[a-z0-9]+$").expect("static regex"));
static ZONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-[0-9]+[a-z]$").expect("static regex"));
static YAML_SCHEMA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:(?P<path>[^\s:]+): )?(?P<message>.*?)(?: at line \d+ column \d+)?$")
        .expect("static regex")
});
static MISSING_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^missing field `(?P<name>[^`]+)`").expect("static regex"));

/// Validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl From<ValidationError> for TopologyError {
    fn from(e: ValidationError) -> Self {
        TopologyError::Configuration {
            field: e.field,
            message: e.message,
        }
    }
}

/// Parse a topology file from disk. `.toml` files are read as TOML, anything else as YAML.
pub fn parse_config_file(path: &Path) -> Result<TopologyConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TopologyError::io(path, e))?;
    debug!(path = %path.display(), bytes = content.len(), "read configuration");
    if path.extension().is_some_and(|ext| ext == "toml") {
        return toml::from_str(&content).map_err(|e| {
            // syntax errors keep their own variant
            if toml::from_str::<toml::Table>(&content).is_err() {
                return TopologyError::Toml(e);
            }
            toml_field_error(&content, &e)
        });
    }
    parse_config(&content)
}

/// Parse a topology.yaml from a string.
///
/// Well-formed YAML that does not fit the schema (a missing section, a
/// value of the wrong type) is a [`TopologyError::Configuration`] naming
/// the field.
pub fn parse_config(yaml: &str) -> Result<TopologyConfig> {
    serde_yaml_ng::from_str(yaml).map_err(|e| {
        if serde_yaml_ng::from_str::<serde_yaml_ng::Value>(yaml).is_err() {
            return TopologyError::Yaml(e);
        }
        yaml_field_error(&e)
    })
}

/// Join a parent path and the name from a "missing field" message.
fn schema_error(path: &str, message: &str) -> TopologyError {
    let field = match MISSING_FIELD_RE.captures(message) {
        Some(caps) if path.is_empty() => caps["name"].to_string(),
        Some(caps) => format!("{}.{}", path, &caps["name"]),
        None if path.is_empty() => "config".to_string(),
        None => path.to_string(),
    };
    TopologyError::config(field, message)
}

/// serde_yaml_ng renders schema errors as `path: message at line L column C`.
fn yaml_field_error(e: &serde_yaml_ng::Error) -> TopologyError {
    let text = e.to_string();
    match YAML_SCHEMA_RE.captures(&text) {
        Some(caps) => schema_error(
            caps.name("path").map_or("", |m| m.as_str()),
            caps.name("message").map_or(text.as_str(), |m| m.as_str()),
        ),
        None => schema_error("", &text),
    }
}

/// TOML errors carry a span instead of a path: recover `section.key` from the source.
fn toml_field_error(content: &str, e: &toml::de::Error) -> TopologyError {
    let mut path = Vec::new();
    if let Some(span) = e.span() {
        let before = content.get(..span.start).unwrap_or(content);
        let section = before
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| line.starts_with('[') && line.ends_with(']'))
            .map(|line| line.trim_matches(['[', ']']).trim());
        path.extend(section);
        let line = before.rsplit('\n').next().unwrap_or_default();
        if let Some((key, _)) = line.split_once('=') {
            path.push(key.trim());
        }
    }
    schema_error(&path.join("."), e.message())
}

/// Parse, validate, and resolve a file in one step.
pub fn load_config_file(path: &Path) -> Result<ResolvedConfig> {
    let config = parse_config_file(path)?;
    resolve_config(&config)
}

/// Parse a CIDR, rejecting host bits.
fn parse_cidr(field: &str, raw: &str) -> std::result::Result<Ipv4Net, ValidationError> {
    let net: Ipv4Net = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::new(field, format!("'{}' is not a valid IPv4 CIDR", raw)))?;
    if net.trunc() != net {
        return Err(ValidationError::new(
            field,
            format!("'{}' has host bits set (did you mean {}?)", raw, net.trunc()),
        ));
    }
    Ok(net)
}

fn overlaps(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
}

fn tier_config(config: &TopologyConfig, tier: Tier) -> &TierConfig {
    match tier {
        Tier::Frontend => &config.frontend,
        Tier::Backend => &config.backend,
        Tier::Database => &config.database,
    }
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &TopologyConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(ValidationError::new(
            "version",
            format!("must be \"1.0\", got \"{}\"", config.version),
        ));
    }

    if config.project.name.trim().is_empty() {
        errors.push(ValidationError::new("project.name", "must not be empty"));
    }
    if config.project.environment.trim().is_empty() {
        errors.push(ValidationError::new("project.environment", "must not be empty"));
    }

    validate_network(&config.network, &mut errors);

    if config.compute.key_name.trim().is_empty() {
        errors.push(ValidationError::new("compute.key_name", "must not be empty"));
    }

    let mut listener_ports: Vec<(u16, Tier)> = Vec::new();
    for tier in Tier::ALL {
        let tc = tier_config(config, tier);
        validate_tier(tier, tc, &mut errors);

        let load_balanced = tc.load_balanced.unwrap_or(tier.default_load_balanced());
        let port = tc.port.map_or(Some(tier.default_port()), |p| u16::try_from(p).ok());
        if let (true, Some(port)) = (load_balanced, port) {
            if let Some((_, other)) = listener_ports.iter().find(|(p, _)| *p == port) {
                errors.push(ValidationError::new(
                    format!("{}.port", tier),
                    format!("listener port {} already used by the {} tier", port, other),
                ));
            } else {
                listener_ports.push((port, tier));
            }
        }
    }

    let ctx = TemplateContext {
        project: &config.project,
        params: &config.params,
    };
    for (key, value) in &config.tags {
        if key.trim().is_empty() {
            errors.push(ValidationError::new("tags", "tag keys must not be empty"));
        }
        if let Err(e) = resolve_template(value, &ctx) {
            errors.push(ValidationError::new(format!("tags.{}", key), e));
        }
    }

    errors
}

fn validate_network(network: &NetworkConfig, errors: &mut Vec<ValidationError>) {
    let network_cidr = match parse_cidr("network.cidr_block", &network.cidr_block) {
        Ok(net) => Some(net),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let zones = &network.availability_zones;
    if zones.is_empty() {
        errors.push(ValidationError::new(
            "network.availability_zones",
            "at least one zone is required",
        ));
    }
    let mut seen = HashSet::new();
    for (i, zone) in zones.iter().enumerate() {
        let field = format!("network.availability_zones[{}]", i);
        if !ZONE_RE.is_match(zone) {
            errors.push(ValidationError::new(
                &field,
                format!("'{}' is not a zone identifier (e.g., us-east-1a)", zone),
            ));
        }
        if !seen.insert(zone.as_str()) {
            errors.push(ValidationError::new(field, format!("zone '{}' listed twice", zone)));
        }
    }

    let mut subnets: Vec<(String, Ipv4Net)> = Vec::new();
    for (family, list) in [
        ("public_subnets", &network.public_subnets),
        ("private_subnets", &network.private_subnets),
    ] {
        if list.len() != zones.len() {
            errors.push(ValidationError::new(
                format!("network.{}", family),
                format!(
                    "{} CIDR(s) for {} availability zone(s); lengths must match",
                    list.len(),
                    zones.len()
                ),
            ));
        }
        for (i, raw) in list.iter().enumerate() {
            let field = format!("network.{}[{}]", family, i);
            match parse_cidr(&field, raw) {
                Ok(net) => {
                    if let Some(parent) = network_cidr {
                        if !parent.contains(&net) {
                            errors.push(ValidationError::new(
                                &field,
                                format!("{} is outside the network {}", net, parent),
                            ));
                        }
                    }
                    subnets.push((field, net));
                }
                Err(e) => errors.push(e),
            }
        }
    }

    for (i, (field, net)) in subnets.iter().enumerate() {
        if let Some((other_field, other)) = subnets[..i].iter().find(|(_, o)| overlaps(o, net)) {
            errors.push(ValidationError::new(
                field,
                format!("{} overlaps {} ({})", net, other, other_field),
            ));
        }
    }
}

fn validate_tier(tier: Tier, tc: &TierConfig, errors: &mut Vec<ValidationError>) {
    if !INSTANCE_TYPE_RE.is_match(&tc.instance_type) {
        errors.push(ValidationError::new(
            format!("{}.instance_type", tier),
            format!("'{}' is not an instance type (e.g., t2.micro)", tc.instance_type),
        ));
    }
    if !AMI_RE.is_match(&tc.ami) {
        errors.push(ValidationError::new(
            format!("{}.ami", tier),
            format!("'{}' is not an image id (ami-<8 or 17 hex>)", tc.ami),
        ));
    }
    if let Some(n) = tc.replicas {
        if !(0..=MAX_REPLICAS).contains(&n) {
            errors.push(ValidationError::new(
                format!("{}.replicas", tier),
                format!("must be between 0 and {}, got {}", MAX_REPLICAS, n),
            ));
        }
    }
    if let Some(p) = tc.port {
        if !(1..=65535).contains(&p) {
            errors.push(ValidationError::new(
                format!("{}.port", tier),
                format!("must be between 1 and 65535, got {}", p),
            ));
        }
    }
    if let Some(ref path) = tc.health_check_path {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                format!("{}.health_check_path", tier),
                format!("'{}' must start with '/'", path),
            ));
        }
    }
}

/// Validate and normalize a config into an immutable [`ResolvedConfig`].
///
/// Fails with the first validation error as a configuration error.
pub fn resolve_config(config: &TopologyConfig) -> Result<ResolvedConfig> {
    let errors = validate_config(config);
    if let Some(first) = errors.into_iter().next() {
        return Err(first.into());
    }

    let network = &config.network;
    let network_cidr = parse_cidr("network.cidr_block", &network.cidr_block)?;
    let mut zones = Vec::with_capacity(network.availability_zones.len());
    for (i, name) in network.availability_zones.iter().enumerate() {
        zones.push(Zone {
            name: name.clone(),
            public_cidr: parse_cidr(
                &format!("network.public_subnets[{}]", i),
                &network.public_subnets[i],
            )?,
            private_cidr: parse_cidr(
                &format!("network.private_subnets[{}]", i),
                &network.private_subnets[i],
            )?,
        });
    }

    let default_replicas = i64::try_from(zones.len()).unwrap_or(MAX_REPLICAS);
    let mut tiers = Vec::with_capacity(Tier::ALL.len());
    for tier in Tier::ALL {
        let tc = tier_config(config, tier);
        let replicas = tc.replicas.unwrap_or(default_replicas);
        let port = tc.port.unwrap_or(i64::from(tier.default_port()));
        tiers.push(TierSpec {
            tier,
            instance_type: tc.instance_type.clone(),
            ami: tc.ami.clone(),
            replicas: u32::try_from(replicas).map_err(|_| {
                TopologyError::config(format!("{}.replicas", tier), "out of range")
            })?,
            port: u16::try_from(port)
                .map_err(|_| TopologyError::config(format!("{}.port", tier), "out of range"))?,
            health_check_path: tc
                .health_check_path
                .clone()
                .unwrap_or_else(|| tier.default_health_check_path().to_string()),
            load_balanced: tc.load_balanced.unwrap_or(tier.default_load_balanced()),
        });
    }

    let ctx = TemplateContext {
        project: &config.project,
        params: &config.params,
    };
    let mut tags = IndexMap::new();
    for (key, value) in &config.tags {
        let resolved = resolve_template(value, &ctx)
            .map_err(|e| TopologyError::config(format!("tags.{}", key), e))?;
        tags.insert(key.clone(), resolved);
    }

    let resolved = ResolvedConfig {
        name: config.project.name.clone(),
        environment: config.project.environment.clone(),
        tags,
        network_cidr,
        enable_dns: network.enable_dns,
        zones: AvailabilityZoneSet::new(zones),
        key_name: config.compute.key_name.clone(),
        tiers,
    };
    info!(
        name = %resolved.name,
        zones = resolved.zones.len(),
        "configuration resolved"
    );
    Ok(resolved)
}
