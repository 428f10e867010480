//! Author identity hook.
//!
//! Canonicalization (mapping raw git author strings to one name per person)
//! is owned by an external collaborator; the engine only invokes the supplied
//! function per record. The default is passthrough.

use std::sync::Arc;

pub type Canonicalizer = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Identity function: the raw author string is kept as-is.
pub fn passthrough() -> Canonicalizer {
    Arc::new(|raw: &str| raw.to_string())
}
