use std::time::Duration;

use bytes::Bytes;
use cachecall_core::{CacheControl, parse_http_date};
use chrono::{DateTime, Utc};
use http::header::DATE;
use http::{HeaderMap, Response, StatusCode, Version};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// A response as persisted by a [`Store`](crate::Store).
///
/// Headers are kept exactly as they were when the response was stored, so a
/// response served from the store carries the store-owned `Cache-Control`
/// and `Date` it was written with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoredResponse {
    #[serde(with = "http_serde::status_code")]
    status: StatusCode,
    #[serde(with = "http_serde::version")]
    version: Version,
    #[serde(with = "header_pairs")]
    headers: HeaderMap,
    body: Bytes,
    stored_at: DateTime<Utc>,
}

impl StoredResponse {
    /// Creates a stored response from its parts.
    pub fn new(
        status: StatusCode,
        version: Version,
        headers: HeaderMap,
        body: Bytes,
        stored_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status,
            version,
            headers,
            body,
            stored_at,
        }
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// When the response was written to the store.
    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    /// Age of the response at `now`.
    ///
    /// Measured from the `Date` header, falling back to the store time when
    /// the header is missing or malformed. Never negative.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        let origin = self
            .headers
            .get(DATE)
            .and_then(parse_http_date)
            .unwrap_or(self.stored_at);
        (now - origin).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the response may still be served at `now`.
    ///
    /// A response is fresh while its age is below its `max-age`. Responses
    /// without `max-age`, or marked `no-store`, are never fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let directives = CacheControl::from_headers(&self.headers);
        if directives.no_store {
            return false;
        }
        directives
            .max_age()
            .is_some_and(|max_age| self.age(now) < max_age)
    }

    /// Converts into an `http::Response`.
    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.version_mut() = self.version;
        *response.headers_mut() = self.headers;
        response
    }

    /// Encodes into the on-disk representation.
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        Ok(bincode::serde::encode_to_vec(
            self,
            bincode::config::standard(),
        )?)
    }

    /// Decodes from the on-disk representation.
    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(value)
    }
}

mod header_pairs {
    use http::{HeaderMap, HeaderName, HeaderValue};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_bytes::ByteBuf;

    pub fn serialize<S>(headers: &HeaderMap, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let pairs: Vec<(&str, &serde_bytes::Bytes)> = headers
            .iter()
            .map(|(name, value)| (name.as_str(), serde_bytes::Bytes::new(value.as_bytes())))
            .collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HeaderMap, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs: Vec<(String, ByteBuf)> = Vec::deserialize(deserializer)?;
        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(D::Error::custom)?;
            let value = HeaderValue::from_bytes(&value).map_err(D::Error::custom)?;
            headers.append(name, value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use http::HeaderValue;
    use http::header::{CACHE_CONTROL, CONTENT_TYPE};

    use super::*;

    fn stored(cache_control: &'static str, date: Option<DateTime<Utc>>) -> StoredResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(cache_control));
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        if let Some(date) = date {
            headers.insert(
                DATE,
                HeaderValue::try_from(cachecall_core::format_http_date(date)).unwrap(),
            );
        }
        StoredResponse::new(
            StatusCode::OK,
            Version::HTTP_11,
            headers,
            Bytes::from_static(b"{\"id\":1}"),
            Utc::now(),
        )
    }

    #[test]
    fn test_encoding_preserves_everything() {
        let response = stored("max-age=60", Some(Utc::now()));
        let decoded = StoredResponse::decode(&response.encode().unwrap()).unwrap();

        assert_eq!(decoded.status(), StatusCode::OK);
        assert_eq!(decoded.body().as_ref(), b"{\"id\":1}");
        assert_eq!(decoded.headers().get_all("set-cookie").iter().count(), 2);
        assert_eq!(decoded.headers(), response.headers());
        assert_eq!(decoded.stored_at(), response.stored_at());
    }

    #[test]
    fn test_freshness_follows_max_age_and_date() {
        let now = Utc::now();
        let response = stored("max-age=60", Some(now - TimeDelta::seconds(30)));
        assert!(response.is_fresh(now));
        assert!(!response.is_fresh(now + TimeDelta::seconds(31)));
    }

    #[test]
    fn test_missing_date_falls_back_to_store_time() {
        let response = stored("max-age=60", None);
        assert!(response.is_fresh(response.stored_at()));
        assert!(!response.is_fresh(response.stored_at() + TimeDelta::seconds(61)));
    }

    #[test]
    fn test_no_max_age_or_no_store_is_never_fresh() {
        let now = Utc::now();
        assert!(!stored("public", Some(now)).is_fresh(now));
        assert!(!stored("no-store", Some(now)).is_fresh(now));
    }

    #[test]
    fn test_future_date_has_zero_age() {
        let now = Utc::now();
        let response = stored("max-age=1", Some(now + TimeDelta::seconds(300)));
        assert_eq!(response.age(now), Duration::ZERO);
    }

    #[test]
    fn test_into_response() {
        let mut response = stored("max-age=60", None);
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http_response = response.into_response();

        assert_eq!(http_response.status(), StatusCode::OK);
        assert_eq!(http_response.version(), Version::HTTP_11);
        assert_eq!(
            http_response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(http_response.body().as_ref(), b"{\"id\":1}");
    }
}
