//! `Cache-Control` directive parsing.
//!
//! Only the directives the policy engine and the store act upon are
//! recognized; everything else is ignored.

use std::time::Duration;

use http::HeaderMap;
use http::header::{CACHE_CONTROL, PRAGMA};

/// Parsed view of the caching directives carried by a request or response.
///
/// Multiple `Cache-Control` header lines are merged. A legacy
/// `Pragma: no-cache` counts as `no-cache` when no `Cache-Control` header is
/// present.
///
/// ```
/// use cachecall_core::CacheControl;
/// use http::{HeaderMap, HeaderValue, header::CACHE_CONTROL};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=\"60\""));
///
/// let directives = CacheControl::from_headers(&headers);
/// assert_eq!(directives.max_age, Some(60));
/// assert!(!directives.no_store);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheControl {
    /// `no-cache`: a stored entry must not be used without going to the network.
    pub no_cache: bool,
    /// `no-store`: nothing about this exchange may be persisted.
    pub no_store: bool,
    /// `only-if-cached`: answer from the store or not at all.
    pub only_if_cached: bool,
    /// `max-age=N` in seconds.
    pub max_age: Option<u64>,
}

impl CacheControl {
    /// Parses the directives from a header map.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut directives = Self::default();
        let mut seen_cache_control = false;

        for value in headers.get_all(CACHE_CONTROL) {
            seen_cache_control = true;
            let Ok(value) = value.to_str() else {
                continue;
            };
            for directive in value.split(',') {
                directives.apply(directive.trim());
            }
        }

        if !seen_cache_control {
            directives.no_cache = headers
                .get_all(PRAGMA)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .flat_map(|value| value.split(','))
                .any(|token| token.trim().eq_ignore_ascii_case("no-cache"));
        }

        directives
    }

    fn apply(&mut self, directive: &str) {
        let (name, argument) = match directive.split_once('=') {
            Some((name, argument)) => (name.trim(), Some(argument.trim().trim_matches('"'))),
            None => (directive, None),
        };

        if name.eq_ignore_ascii_case("no-cache") {
            self.no_cache = true;
        } else if name.eq_ignore_ascii_case("no-store") {
            self.no_store = true;
        } else if name.eq_ignore_ascii_case("only-if-cached") {
            self.only_if_cached = true;
        } else if name.eq_ignore_ascii_case("max-age") {
            self.max_age = argument.and_then(|seconds| seconds.parse().ok());
        }
    }

    /// Returns `max-age` as a duration.
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(http::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_empty_headers() {
        assert_eq!(
            CacheControl::from_headers(&HeaderMap::new()),
            CacheControl::default()
        );
    }

    #[test]
    fn test_merges_multiple_lines_case_insensitively() {
        let map = headers(&[
            (CACHE_CONTROL, "No-Cache"),
            (CACHE_CONTROL, "NO-STORE, only-if-cached"),
        ]);
        let directives = CacheControl::from_headers(&map);
        assert!(directives.no_cache);
        assert!(directives.no_store);
        assert!(directives.only_if_cached);
        assert_eq!(directives.max_age, None);
    }

    #[test]
    fn test_max_age_parsing() {
        let directives = CacheControl::from_headers(&headers(&[(CACHE_CONTROL, "max-age = 120")]));
        assert_eq!(directives.max_age(), Some(Duration::from_secs(120)));

        let invalid = CacheControl::from_headers(&headers(&[(CACHE_CONTROL, "max-age=soon")]));
        assert_eq!(invalid.max_age, None);
    }

    #[test]
    fn test_pragma_only_without_cache_control() {
        let pragma = CacheControl::from_headers(&headers(&[(PRAGMA, "no-cache")]));
        assert!(pragma.no_cache);

        let overridden = CacheControl::from_headers(&headers(&[
            (PRAGMA, "no-cache"),
            (CACHE_CONTROL, "max-age=10"),
        ]));
        assert!(!overridden.no_cache);
        assert_eq!(overridden.max_age, Some(10));
    }
}
