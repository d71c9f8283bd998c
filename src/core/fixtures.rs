//! Shared configuration fixtures for unit tests.

use super::parser::{parse_config, resolve_config};
use super::types::ResolvedConfig;

/// Two zones, three backend replicas, no database replicas.
pub const WEB_APP: &str = r#"
version: "1.0"
project:
  name: web
  environment: production
params:
  owner: platform
tags:
  Project: "{{project.name}}"
  Owner: "{{params.owner}}"
network:
  cidr_block: 10.0.0.0/16
  availability_zones: [ap-southeast-1a, ap-southeast-1b]
  public_subnets: [10.0.1.0/24, 10.0.2.0/24]
  private_subnets: [10.0.10.0/24, 10.0.11.0/24]
compute:
  key_name: my-ssh-key
frontend:
  instance_type: t2.micro
  ami: ami-0c55b159cbfafe1f0
backend:
  instance_type: t3.small
  ami: ami-0c55b159cbfafe1f0
  replicas: 3
  port: 4000
mongodb:
  instance_type: t2.micro
  ami: ami-0c55b159cbfafe1f0
  replicas: 0
"#;

/// Resolve [`WEB_APP`] with one textual substitution applied.
pub fn resolved_with(patch: &str, replacement: &str) -> ResolvedConfig {
    assert!(WEB_APP.contains(patch), "fixture missing: {}", patch);
    let config = parse_config(&WEB_APP.replacen(patch, replacement, 1)).unwrap();
    resolve_config(&config).unwrap()
}

pub fn resolved_web_app() -> ResolvedConfig {
    resolve_config(&parse_config(WEB_APP).unwrap()).unwrap()
}
