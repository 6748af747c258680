//! Caller configuration.
//!
//! Every field is optional in a configuration document; missing fields take
//! the defaults listed on [`CallerConfig`].
//!
//! ```
//! use cachecall::{CachePolicy, CallerConfig};
//!
//! let config = CallerConfig::from_yaml(r#"
//! connect_timeout: 5s
//! cache_size: 20 MiB
//! default_policy: network_then_cache
//! default_retention_secs: 300
//! "#).unwrap();
//!
//! assert_eq!(config.default_policy, CachePolicy::NetworkThenCache);
//! assert_eq!(config.cache_size.as_u64(), 20 * 1024 * 1024);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use bytesize::ByteSize;
use cachecall_core::{CachePolicy, CachePolicyTag};
use serde::{Deserialize, Serialize};

use crate::error::BuildError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Construction-time settings of a [`WebServiceCaller`](crate::WebServiceCaller).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CallerConfig {
    /// Time allowed to establish a connection (e.g. "10s", "500ms"). Default 10s.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Time allowed between reads of the response. Default 10s.
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Time allowed for sending the request. Default 10s.
    ///
    /// The HTTP client has no per-write timeout, so this contributes to the
    /// total request deadline together with the other two.
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
    /// Upper bound of the disk cache file (e.g. "10 MiB"). Default 10 MiB.
    ///
    /// Nothing is evicted to stay under it: when the file is full, new
    /// responses are served but not stored until older entries expire.
    pub cache_size: ByteSize,
    /// Directory of the disk cache. Without one, disk caching is disabled.
    pub cache_dir: Option<PathBuf>,
    /// Policy used when a call doesn't pick one. Default `only_network`.
    pub default_policy: CachePolicy,
    /// Retention used when a call doesn't pick one. Default none.
    pub default_retention_secs: Option<i64>,
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            cache_size: ByteSize::mib(10),
            cache_dir: None,
            default_policy: CachePolicy::default(),
            default_retention_secs: None,
        }
    }
}

impl CallerConfig {
    /// Parses a YAML configuration document.
    pub fn from_yaml(document: &str) -> Result<Self, BuildError> {
        Ok(serde_saphyr::from_str(document)?)
    }

    /// Total deadline of one request.
    pub fn total_timeout(&self) -> Duration {
        self.connect_timeout + self.read_timeout + self.write_timeout
    }

    /// Builds the tag of a call, filling what the call left unset from the
    /// configured defaults.
    pub fn tag(&self, policy: Option<CachePolicy>, retention_secs: Option<i64>) -> CachePolicyTag {
        CachePolicyTag::new(
            policy.unwrap_or(self.default_policy),
            retention_secs.or(self.default_retention_secs),
        )
    }
}
