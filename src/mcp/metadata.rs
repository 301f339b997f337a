//! `_meta` field handling
//!
//! Keys starting with `mcp:` or `mcp-` belong to the protocol and may not be
//! set by tools or clients.

use serde_json::{Map, Value};

use crate::error::ReservedMetadataError;

/// Auxiliary key/value attachment on requests and results
pub type Metadata = Map<String, Value>;

/// Key prefixes reserved by the protocol (case-sensitive)
pub const RESERVED_PREFIXES: &[&str] = &["mcp:", "mcp-"];

/// Whether `key` starts with a reserved prefix
pub fn is_reserved(key: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}

/// Reject a map containing any reserved key
pub fn validate(meta: &Metadata) -> Result<(), ReservedMetadataError> {
    match meta.keys().find(|key| is_reserved(key)) {
        Some(key) => Err(ReservedMetadataError { key: key.clone() }),
        None => Ok(()),
    }
}

/// Copy of `meta` without reserved keys and without the empty key
pub fn sanitize(meta: &Metadata) -> Metadata {
    meta.iter()
        .filter(|(key, _)| !key.is_empty() && !is_reserved(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Merge maps left to right; later sources win on collisions
pub fn merge<'a, I>(sources: I) -> Metadata
where
    I: IntoIterator<Item = &'a Metadata>,
{
    let mut merged = Metadata::new();
    for source in sources {
        for (key, value) in source {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Sanitized map ready for serialization, or `None` when nothing is left
pub fn format(meta: &Metadata) -> Option<Metadata> {
    let sanitized = sanitize(meta);
    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}
