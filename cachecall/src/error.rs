//! Error types for calls and caller construction.

use std::error::Error as StdError;
use std::fmt;

use bytes::Bytes;
use cachecall_store::StoreError;
use http::StatusCode;
use thiserror::Error;

/// Terminal failure of a call.
///
/// Errors raised inside the middleware pipeline travel as
/// [`reqwest_middleware::Error::Middleware`] and are turned back into this
/// type by the `From` conversion, so callers always see the typed variant.
#[derive(Debug, Error)]
pub enum CallError {
    /// A request reached the policy engine without a cache-policy tag.
    ///
    /// This is a programming error: every call built through
    /// [`WebServiceCaller`](crate::WebServiceCaller) is tagged.
    #[error("request reached the cache-policy engine without a cache-policy tag")]
    MissingPolicyTag,

    /// The network was required but the connectivity flag is down.
    #[error("unable to resolve host \"{host}\": no network connectivity")]
    Connectivity {
        /// Host the call was addressed to.
        host: String,
    },

    /// The local store holds no usable entry for a cache-only call.
    #[error("no cached response available for {url}")]
    CacheUnsatisfiable {
        /// URL of the call.
        url: String,
    },

    /// The call completed without a response or with a non-2xx status.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// The response body could not be mapped to the requested type.
    #[error(transparent)]
    Parsing(#[from] ParsingError),

    /// The request could not be built or its body could not be read.
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// Any other failure reported by the middleware chain.
    #[error(transparent)]
    Transport(reqwest_middleware::Error),
}

impl CallError {
    pub(crate) fn connectivity(url: &reqwest::Url) -> Self {
        CallError::Connectivity {
            host: url.host_str().unwrap_or_default().to_owned(),
        }
    }

    pub(crate) fn cache_unsatisfiable(url: &reqwest::Url) -> Self {
        CallError::CacheUnsatisfiable {
            url: url.to_string(),
        }
    }

    /// Status code of the final response, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CallError::Status(error) => error.status(),
            CallError::Request(error) => error.status(),
            _ => None,
        }
    }
}

impl From<reqwest_middleware::Error> for CallError {
    fn from(error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Middleware(inner) => match inner.downcast::<CallError>() {
                Ok(call_error) => call_error,
                Err(other) => CallError::Transport(reqwest_middleware::Error::Middleware(other)),
            },
            reqwest_middleware::Error::Reqwest(error) => CallError::Request(error),
        }
    }
}

/// The final response was absent or unsuccessful.
///
/// When a response existed it is kept, body included, so callers can inspect
/// error payloads.
#[derive(Debug)]
pub struct StatusError {
    response: Option<http::Response<Bytes>>,
}

impl StatusError {
    pub(crate) fn absent() -> Self {
        Self { response: None }
    }

    pub(crate) fn new(response: http::Response<Bytes>) -> Self {
        Self {
            response: Some(response),
        }
    }

    /// Status code of the response, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(http::Response::status)
    }

    /// Canonical reason phrase of the status, if any.
    pub fn message(&self) -> Option<&'static str> {
        self.status().and_then(|status| status.canonical_reason())
    }

    /// The buffered response, if any.
    pub fn response(&self) -> Option<&http::Response<Bytes>> {
        self.response.as_ref()
    }

    /// Takes the buffered response, if any.
    pub fn into_response(self) -> Option<http::Response<Bytes>> {
        self.response
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status(), self.message()) {
            (Some(status), Some(message)) => {
                write!(f, "call failed with status {}: {}", status.as_u16(), message)
            }
            (Some(status), None) => write!(f, "call failed with status {}", status.as_u16()),
            (None, _) => f.write_str("call failed without a response"),
        }
    }
}

impl StdError for StatusError {}

/// A response body could not be mapped to the requested type.
#[derive(Debug, Error)]
#[error("failed to map response body to `{target}`: {source}")]
pub struct ParsingError {
    target: &'static str,
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl ParsingError {
    /// Creates a parsing error for target type `T`.
    pub fn new<T>(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            target: std::any::type_name::<T>(),
            source: source.into(),
        }
    }

    /// Name of the type the body was mapped to.
    pub fn target(&self) -> &'static str {
        self.target
    }
}

/// Failure to construct a [`WebServiceCaller`](crate::WebServiceCaller).
#[derive(Debug, Error)]
pub enum BuildError {
    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The disk cache could not be opened.
    #[error("failed to open disk cache: {0}")]
    Store(#[from] StoreError),

    /// The configuration document is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_saphyr::Error),
}
