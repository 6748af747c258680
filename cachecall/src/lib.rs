#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod auth;
mod caller;
mod config;
pub mod engine;
mod error;
mod http_cache;
mod mapper;
mod network;
mod response;

pub use auth::{Authenticator, AuthenticatorMiddleware};
pub use caller::{Call, WebServiceCaller, WebServiceCallerBuilder};
pub use config::CallerConfig;
pub use engine::PolicyMiddleware;
pub use error::{BuildError, CallError, ParsingError, StatusError};
pub use http_cache::CacheStoreMiddleware;
pub use mapper::{JsonMapper, ResponseMapper};
pub use network::NetworkStageMiddleware;

// Re-export the policy types and stores for convenience
pub use cachecall_core::{CachePolicy, CachePolicyTag, Connectivity};
pub use cachecall_store::{DiskStore, Store, StoreError};
