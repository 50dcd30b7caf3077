//! Correlation id generation for in-flight calls.

use uuid::Uuid;

/// Produce a candidate resolver id: `f` followed by eight lowercase hex
/// digits drawn from a fresh UUID.
///
/// The leading letter keeps the id usable as a bare JavaScript
/// identifier. Callers own collision checking against their own live
/// set; candidates are random, not sequential.
pub fn call_id_candidate() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    format!(
        "f{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}
