//! Cache policy types.
//!
//! This module provides the two values every call is described by:
//!
//! - [`CachePolicy`] - which source(s) the call may consult and in what order
//! - [`CachePolicyTag`] - the policy paired with a retention window
//!
//! ## Policies
//!
//! | Policy | First attempt | Fallback |
//! |--------|---------------|----------|
//! | [`OnlyNetwork`](CachePolicy::OnlyNetwork) | network | none |
//! | [`OnlyCache`](CachePolicy::OnlyCache) | cache | none |
//! | [`NetworkThenCache`](CachePolicy::NetworkThenCache) | network | cache |
//! | [`CacheThenNetwork`](CachePolicy::CacheThenNetwork) | cache | network |
//! | [`Server`](CachePolicy::Server) | unmodified request | none |

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Strategy governing whether a call consults the local store, the network,
/// or both.
///
/// # Example
///
/// ```
/// use cachecall_core::CachePolicy;
///
/// let policy: CachePolicy = serde_json::from_str("\"cache_then_network\"").unwrap();
/// assert_eq!(policy, CachePolicy::CacheThenNetwork);
/// assert!(!policy.rewrites_response());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Must succeed via the network; the store is never read.
    #[default]
    OnlyNetwork,
    /// Must succeed via the store; the network is never touched.
    OnlyCache,
    /// Try the network; on failure or a non-2xx status, fall back to the store.
    NetworkThenCache,
    /// Try the store; on a miss, fall back to the network.
    CacheThenNetwork,
    /// Defer to the server's own `Cache-Control` directives; nothing is rewritten.
    Server,
}

impl CachePolicy {
    /// Returns the policy as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CachePolicy::OnlyNetwork => "only_network",
            CachePolicy::OnlyCache => "only_cache",
            CachePolicy::NetworkThenCache => "network_then_cache",
            CachePolicy::CacheThenNetwork => "cache_then_network",
            CachePolicy::Server => "server",
        }
    }

    /// Whether successful network responses under this policy are stamped
    /// with the tag's retention headers.
    #[inline]
    pub const fn rewrites_response(&self) -> bool {
        matches!(
            self,
            CachePolicy::OnlyNetwork | CachePolicy::NetworkThenCache
        )
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable `(policy, retention)` pair attached to a single call.
///
/// A retention of `None`, zero or a negative number of seconds means the
/// response must not be persisted and carries no `max-age`.
///
/// # Example
///
/// ```
/// use cachecall_core::{CachePolicy, CachePolicyTag};
/// use std::time::Duration;
///
/// let tag = CachePolicyTag::new(CachePolicy::NetworkThenCache, Some(60));
/// assert_eq!(tag.retention(), Some(Duration::from_secs(60)));
///
/// let transient = CachePolicyTag::new(CachePolicy::OnlyNetwork, Some(-5));
/// assert_eq!(transient.retention_secs(), None);
/// assert!(!transient.persists());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CachePolicyTag {
    policy: CachePolicy,
    retention_secs: Option<u64>,
}

impl CachePolicyTag {
    /// Creates a tag, normalizing non-positive retention to "do not persist".
    pub fn new(policy: CachePolicy, retention_secs: Option<i64>) -> Self {
        Self {
            policy,
            retention_secs: retention_secs
                .and_then(|secs| u64::try_from(secs).ok())
                .filter(|secs| *secs > 0),
        }
    }

    /// Returns the policy.
    #[inline]
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Returns the positive retention in seconds, if any.
    #[inline]
    pub fn retention_secs(&self) -> Option<u64> {
        self.retention_secs
    }

    /// Returns the positive retention window, if any.
    pub fn retention(&self) -> Option<Duration> {
        self.retention_secs.map(Duration::from_secs)
    }

    /// Whether responses fetched under this tag may be persisted.
    #[inline]
    pub fn persists(&self) -> bool {
        self.retention_secs.is_some()
    }
}

impl fmt::Display for CachePolicyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.retention_secs {
            Some(secs) => write!(f, "{}(retention={}s)", self.policy, secs),
            None => write!(f, "{}(no retention)", self.policy),
        }
    }
}
