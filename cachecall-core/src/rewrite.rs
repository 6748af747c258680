//! Request and response header rewriters.
//!
//! All functions here are pure: they touch only `Cache-Control`, `Pragma` and
//! `Date`, and never look at bodies.
//!
//! ## Requests
//!
//! - [`to_network_request`] forces revalidation with the server
//! - [`to_cache_request`] forces an answer from the local store
//!
//! ## Responses
//!
//! [`rewrite_response`] stamps network responses so the store persists or
//! evicts them according to the tag's retention.

use chrono::{DateTime, Utc};
use http::HeaderMap;
use http::header::{CACHE_CONTROL, DATE, HeaderValue, PRAGMA};

use crate::policy::CachePolicyTag;

/// IMF-fixdate layout used by the `Date` header.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Marker placed in response extensions once [`rewrite_response`] has been
/// applied, so later stages can tell a stamped response apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseStamp;

fn strip_caching_headers(headers: &mut HeaderMap) {
    headers.remove(PRAGMA);
    headers.remove(CACHE_CONTROL);
}

/// Reshapes request headers so the call always revalidates with the server.
///
/// Without a positive retention the request also carries `no-store`, so the
/// store keeps nothing from the exchange.
///
/// ```
/// use cachecall_core::{CachePolicy, CachePolicyTag, to_network_request};
/// use http::{HeaderMap, HeaderValue, header::{CACHE_CONTROL, PRAGMA}};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
///
/// to_network_request(&mut headers, &CachePolicyTag::new(CachePolicy::OnlyNetwork, Some(60)));
/// assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "no-cache");
/// assert!(headers.get(PRAGMA).is_none());
/// ```
pub fn to_network_request(headers: &mut HeaderMap, tag: &CachePolicyTag) {
    strip_caching_headers(headers);
    let value = if tag.persists() {
        HeaderValue::from_static("no-cache")
    } else {
        HeaderValue::from_static("no-cache, no-store")
    };
    headers.insert(CACHE_CONTROL, value);
}

/// Reshapes request headers so the call is answered strictly from the store.
pub fn to_cache_request(headers: &mut HeaderMap) {
    strip_caching_headers(headers);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("only-if-cached"));
}

/// Stamps response headers according to the tag's retention.
///
/// Applies only to [`OnlyNetwork`](crate::CachePolicy::OnlyNetwork) and
/// [`NetworkThenCache`](crate::CachePolicy::NetworkThenCache); returns
/// `false` and leaves the headers untouched for every other policy.
///
/// - no retention: `Cache-Control: no-store`
/// - retention `N`: `Cache-Control: max-age=N` and `Date: <now>`
///
/// `now` is taken as an argument so the same input always yields the same
/// headers.
pub fn rewrite_response(headers: &mut HeaderMap, tag: &CachePolicyTag, now: DateTime<Utc>) -> bool {
    if !tag.policy().rewrites_response() {
        return false;
    }

    strip_caching_headers(headers);
    match tag.retention_secs() {
        None => {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        }
        Some(secs) => {
            if let Ok(value) = HeaderValue::try_from(format!("max-age={secs}")) {
                headers.insert(CACHE_CONTROL, value);
            }
            if let Ok(value) = HeaderValue::try_from(format_http_date(now)) {
                headers.insert(DATE, value);
            }
        }
    }
    true
}

/// Formats a timestamp as an HTTP date.
///
/// ```
/// use cachecall_core::format_http_date;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
/// assert_eq!(format_http_date(at), "Sun, 06 Nov 1994 08:49:37 GMT");
/// ```
pub fn format_http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

/// Parses an HTTP date header value, returning `None` when malformed.
pub fn parse_http_date(value: &HeaderValue) -> Option<DateTime<Utc>> {
    let value = value.to_str().ok()?;
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::CachePolicy;

    fn client_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=5"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        headers
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_network_request_without_retention_forbids_storing() {
        let mut headers = client_headers();
        to_network_request(&mut headers, &CachePolicyTag::new(CachePolicy::OnlyNetwork, Some(0)));
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "no-cache, no-store");
        assert_eq!(headers.get_all(CACHE_CONTROL).iter().count(), 1);
        assert!(headers.get(PRAGMA).is_none());
        assert_eq!(headers.get("x-request-id").unwrap(), "abc");
    }

    #[test]
    fn test_network_request_with_retention_allows_storing() {
        let mut headers = client_headers();
        to_network_request(
            &mut headers,
            &CachePolicyTag::new(CachePolicy::NetworkThenCache, Some(60)),
        );
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "no-cache");
    }

    #[test]
    fn test_cache_request() {
        let mut headers = client_headers();
        to_cache_request(&mut headers);
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "only-if-cached");
        assert!(headers.get(PRAGMA).is_none());
    }

    #[test]
    fn test_response_without_retention_is_no_store() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600"));
        let tag = CachePolicyTag::new(CachePolicy::OnlyNetwork, None);

        assert!(rewrite_response(&mut headers, &tag, fixed_now()));
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "no-store");
        assert!(headers.get(DATE).is_none());
    }

    #[test]
    fn test_response_with_retention_gets_max_age_and_date() {
        let mut headers = HeaderMap::new();
        headers.insert(DATE, HeaderValue::from_static("Mon, 01 Jan 2001 00:00:00 GMT"));
        let tag = CachePolicyTag::new(CachePolicy::NetworkThenCache, Some(60));

        assert!(rewrite_response(&mut headers, &tag, fixed_now()));
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "max-age=60");
        assert_eq!(headers.get(DATE).unwrap(), "Fri, 01 Mar 2024 12:00:00 GMT");
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let tag = CachePolicyTag::new(CachePolicy::OnlyNetwork, Some(300));
        let mut once = HeaderMap::new();
        rewrite_response(&mut once, &tag, fixed_now());
        let mut twice = once.clone();
        rewrite_response(&mut twice, &tag, fixed_now());

        assert_eq!(once.get(CACHE_CONTROL), twice.get(CACHE_CONTROL));
        assert_eq!(once.get(DATE), twice.get(DATE));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_other_policies_pass_through() {
        for policy in [
            CachePolicy::OnlyCache,
            CachePolicy::CacheThenNetwork,
            CachePolicy::Server,
        ] {
            let mut headers = HeaderMap::new();
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=1"));
            let original = headers.clone();

            assert!(!rewrite_response(
                &mut headers,
                &CachePolicyTag::new(policy, Some(60)),
                fixed_now()
            ));
            assert_eq!(headers, original, "{policy} must not rewrite");
        }
    }

    #[test]
    fn test_http_date_round_trip() {
        let formatted = HeaderValue::try_from(format_http_date(fixed_now())).unwrap();
        assert_eq!(parse_http_date(&formatted), Some(fixed_now()));
        assert_eq!(parse_http_date(&HeaderValue::from_static("yesterday")), None);
    }
}
