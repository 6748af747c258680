//! Fallback decisions of the policy engine.
//!
//! Both tables are pure functions of the policy and the status of the
//! attempt (`None` when the attempt produced no response), so the priority
//! order stays auditable and testable without any I/O.

use cachecall_core::CachePolicy;
use http::StatusCode;

/// Status a store answers with when it cannot satisfy `only-if-cached`.
pub const UNSATISFIABLE: StatusCode = StatusCode::GATEWAY_TIMEOUT;

/// Outcome of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Return the response.
    Success,
    /// Re-check connectivity, then retry against the network.
    NetworkFallback,
    /// Retry against the store.
    CacheFallback,
    /// The store had nothing and no fallback exists.
    CacheUnsatisfiable,
    /// Fail with the response, or its absence.
    StatusFailure,
}

fn is_success(status: Option<StatusCode>) -> bool {
    status.is_some_and(|status| status.is_success())
}

fn is_unsatisfied(status: Option<StatusCode>) -> bool {
    status.is_none_or(|status| status == UNSATISFIABLE)
}

// =============================================================================
// First attempt
// =============================================================================

/// Decides what follows the first attempt. First matching arm wins.
pub fn decide(policy: CachePolicy, status: Option<StatusCode>) -> Decision {
    match policy {
        CachePolicy::CacheThenNetwork if is_unsatisfied(status) => Decision::NetworkFallback,
        CachePolicy::NetworkThenCache if !is_success(status) => Decision::CacheFallback,
        CachePolicy::OnlyCache if is_unsatisfied(status) => Decision::CacheUnsatisfiable,
        _ if !is_success(status) => Decision::StatusFailure,
        _ => Decision::Success,
    }
}

// =============================================================================
// Second attempt
// =============================================================================

/// Decides the outcome of the fallback attempt. There is never a third one.
pub fn decide_fallback(policy: CachePolicy, status: Option<StatusCode>) -> Decision {
    match policy {
        CachePolicy::NetworkThenCache if status == Some(UNSATISFIABLE) => Decision::StatusFailure,
        _ if !is_success(status) => Decision::StatusFailure,
        _ => Decision::Success,
    }
}
