//! Transport-error classification.
//!
//! Control-plane errors arrive as opaque `anyhow` chains; callers classify
//! them by message. The retryable set is a closed allow-list so unknown
//! failure modes fail fast instead of retrying indefinitely.

use anyhow::Error;

const NOT_FOUND_FRAGMENT: &str = "404 not found";

/// Transient transport failures, matched case-sensitively against the
/// rendered error chain.
const RETRYABLE_FRAGMENTS: [&str; 2] = [
    "connect: connection refused",
    "Client.Timeout exceeded while awaiting headers",
];

/// True only for the closed set of transient transport failures. Validation
/// errors, conflicts, and anything unrecognized are permanent.
pub fn is_retryable(err: &Error) -> bool {
    let rendered = format!("{err:#}");
    RETRYABLE_FRAGMENTS.iter().any(|f| rendered.contains(f))
}

/// True when the error chain carries a "404 Not Found"-shaped message, in any
/// letter case.
pub fn is_not_found(err: &Error) -> bool {
    format!("{err:#}").to_lowercase().contains(NOT_FOUND_FRAGMENT)
}

/// Collapse a "404"-shaped lookup error into an absent result. The
/// surrounding declarative system reads `None` as "go create it" and an error
/// as "operation failed"; conflating the two causes spurious failures for
/// resources that legitimately do not exist yet.
pub fn absorb_not_found<T>(result: anyhow::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if is_not_found(&e) => Ok(None),
        Err(e) => Err(e),
    }
}
