//! TF-005: BLAKE3 fingerprints for declarations and whole manifests.

use super::error::Result;
use super::types::{AttrValue, ResourceKind};
use indexmap::IndexMap;
use serde::Serialize;

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Compute a composite hash from multiple component hashes.
pub fn composite_hash(components: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in components {
        hasher.update(c.as_bytes());
        hasher.update(b"\0");
    }
    format!("blake3:{}", hasher.finalize().to_hex())
}

#[derive(Serialize)]
struct HashInput<'a> {
    name: &'a str,
    kind: ResourceKind,
    attributes: &'a IndexMap<String, AttrValue>,
    depends_on: &'a [String],
}

/// Hash the observable content of one declaration.
///
/// Attribute order is part of the hash; the builder emits attributes in a
/// fixed order so identical configurations hash identically.
pub fn hash_declaration(
    name: &str,
    kind: ResourceKind,
    attributes: &IndexMap<String, AttrValue>,
    depends_on: &[String],
) -> Result<String> {
    let canonical = serde_json::to_string(&HashInput {
        name,
        kind,
        attributes,
        depends_on,
    })?;
    Ok(hash_string(&canonical))
}
