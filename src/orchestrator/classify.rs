//! Provider failure classification.
//!
//! A fatal-authorization failure (revoked key, billing not enabled, model not
//! entitled) halts further spend for the rest of the cycle. Everything else is
//! reported and otherwise left alone.

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    FatalAuthorization,
    Other,
}

// Matched case-insensitively against the normalized error string.
// A 403 counts only where it appears as a status code, never as an arbitrary
// digit run inside the message.
// "entity was not found" is what the endpoint answers for a key without access
// to the paid model, so it is treated as an entitlement failure.
const FATAL_MARKERS: [&str; 8] = [
    "status 403",
    "\"code\":403",
    "\"status\":403",
    "403 forbidden",
    "permission_denied",
    "permission denied",
    "caller does not have permission",
    "requested entity was not found",
];

pub fn classify_message(message: &str) -> ErrorClass {
    let lowered = message.to_lowercase();
    if FATAL_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        ErrorClass::FatalAuthorization
    } else {
        ErrorClass::Other
    }
}

/// Normalize and classify in one step.
pub fn classify(err: &ApiError) -> (ErrorClass, String) {
    let detail = err.describe();
    (classify_message(&detail), detail)
}
