//! Locally pre-allocated resource identifiers.

use ulid::Ulid;

const ID_PREFIX: &str = "tp";

/// Generate an opaque resource ID: a fixed short prefix over a ULID, so IDs
/// stay lexicographically sortable and unique even when independent caller
/// processes create resources concurrently.
pub fn new_resource_id() -> String {
    format!("{}-{}", ID_PREFIX, Ulid::new())
}
