#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
//!
//! ## Modules
//!
//! - [`policy`] - [`CachePolicy`] and the per-call [`CachePolicyTag`]
//! - [`connectivity`] - the shared [`Connectivity`] flag
//! - [`directive`] - [`CacheControl`] header parsing
//! - [`rewrite`] - request and response header rewriters

pub mod connectivity;
pub mod directive;
pub mod policy;
pub mod rewrite;

pub use connectivity::Connectivity;
pub use directive::CacheControl;
pub use policy::{CachePolicy, CachePolicyTag};
pub use rewrite::{
    ResponseStamp, format_http_date, parse_http_date, rewrite_response, to_cache_request,
    to_network_request,
};
