//! Conversions between `reqwest::Response` and buffered `http::Response`s.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::BodyExt;
use reqwest::{Response, ResponseBuilderExt, Url};

/// Reads the whole body of `response`, keeping status, headers and
/// extensions.
pub(crate) async fn buffer(response: Response) -> Result<http::Response<Bytes>, reqwest::Error> {
    let http_response: http::Response<reqwest::Body> = response.into();
    let (parts, body) = http_response.into_parts();
    let bytes = body.collect().await?.to_bytes();
    Ok(http::Response::from_parts(parts, bytes))
}

/// Turns a buffered response back into a `reqwest::Response` reporting `url`.
pub(crate) fn from_buffered(response: http::Response<Bytes>, url: &Url) -> Response {
    let (mut parts, bytes) = response.into_parts();
    // reqwest reads the response URL from an extension only its builder sets
    if let Ok(marker) = http::Response::builder().url(url.clone()).body(()) {
        parts.extensions.extend(marker.into_parts().0.extensions);
    }
    http::Response::from_parts(parts, reqwest::Body::from(bytes)).into()
}

/// The sentinel answer to an `only-if-cached` request the store cannot
/// satisfy.
pub(crate) fn unsatisfiable(url: &Url) -> Response {
    let mut response = http::Response::new(Bytes::new());
    *response.status_mut() = StatusCode::GATEWAY_TIMEOUT;
    from_buffered(response, url)
}
