//! The call executor.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use cachecall_core::{CachePolicy, Connectivity};
use cachecall_store::{DiskStore, Store, StoreError};
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::{Authenticator, AuthenticatorMiddleware};
use crate::config::CallerConfig;
use crate::engine::PolicyMiddleware;
use crate::error::{BuildError, CallError, StatusError};
use crate::http_cache::CacheStoreMiddleware;
use crate::mapper::{JsonMapper, ResponseMapper};
use crate::network::NetworkStageMiddleware;
use crate::response::from_buffered;

/// Executes HTTP calls under a cache policy.
///
/// Cloning is cheap: clones share the client, the store and the
/// connectivity flag.
///
/// ```no_run
/// use cachecall::{CachePolicy, WebServiceCaller};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let caller = WebServiceCaller::builder()
///     .cache_dir("/var/cache/myapp/http")
///     .build()?;
///
/// let request = caller.client().get("https://api.example.com/users").build()?;
/// let users = caller
///     .call(request)
///     .policy(CachePolicy::NetworkThenCache)
///     .retention_secs(300)
///     .text()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WebServiceCaller<M = JsonMapper> {
    client: ClientWithMiddleware,
    config: CallerConfig,
    connectivity: Connectivity,
    mapper: Arc<M>,
}

impl<M> Clone for WebServiceCaller<M> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
            connectivity: self.connectivity.clone(),
            mapper: self.mapper.clone(),
        }
    }
}

impl WebServiceCaller {
    /// Starts building a caller with the JSON mapper.
    pub fn builder() -> WebServiceCallerBuilder<JsonMapper> {
        WebServiceCallerBuilder::new()
    }

    /// Builds a caller from `config` alone.
    pub fn new(config: CallerConfig) -> Result<Self, BuildError> {
        Self::builder().config(config).build()
    }
}

impl<M> WebServiceCaller<M>
where
    M: ResponseMapper,
{
    /// The middleware client. Use it to build requests for [`call`](Self::call).
    pub fn client(&self) -> &ClientWithMiddleware {
        &self.client
    }

    /// The shared connectivity flag.
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// The configuration the caller was built with.
    pub fn config(&self) -> &CallerConfig {
        &self.config
    }

    /// Prepares `request` for execution. Policy and retention default to the
    /// configured ones.
    pub fn call(&self, request: Request) -> Call<'_, M> {
        Call {
            caller: self,
            request,
            policy: None,
            retention_secs: None,
            return_error_responses: false,
        }
    }
}

/// One pending call. Nothing is sent until a terminal method is awaited.
#[must_use = "a call does nothing until `send`, `text`, `bytes` or `object` is awaited"]
#[derive(Debug)]
pub struct Call<'a, M> {
    caller: &'a WebServiceCaller<M>,
    request: Request,
    policy: Option<CachePolicy>,
    retention_secs: Option<i64>,
    return_error_responses: bool,
}

impl<M> Call<'_, M>
where
    M: ResponseMapper,
{
    /// Overrides the policy of this call.
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Overrides the retention of this call. Non-positive means none.
    pub fn retention_secs(mut self, retention_secs: i64) -> Self {
        self.retention_secs = Some(retention_secs);
        self
    }

    /// Returns non-2xx responses instead of failing with
    /// [`CallError::Status`]. A call without any response still fails.
    pub fn return_error_responses(mut self, enabled: bool) -> Self {
        self.return_error_responses = enabled;
        self
    }

    /// Runs the call and returns the raw response.
    pub async fn send(self) -> Result<Response, CallError> {
        let Call {
            caller,
            request,
            policy,
            retention_secs,
            return_error_responses,
        } = self;

        let url = request.url().clone();
        let tag = caller.config.tag(policy, retention_secs);
        let mut extensions = Extensions::new();
        extensions.insert(tag);

        let result = caller
            .client
            .execute_with_extensions(request, &mut extensions)
            .await
            .map_err(CallError::from);

        match result {
            Err(CallError::Status(error)) if return_error_responses => {
                match error.into_response() {
                    Some(response) => {
                        debug!(status = %response.status(), "returning error response");
                        Ok(from_buffered(response, &url))
                    }
                    None => Err(CallError::Status(StatusError::absent())),
                }
            }
            other => other,
        }
    }

    /// Runs the call and returns the body as text.
    pub async fn text(self) -> Result<String, CallError> {
        Ok(self.send().await?.text().await?)
    }

    /// Runs the call and returns the raw body.
    pub async fn bytes(self) -> Result<Bytes, CallError> {
        Ok(self.send().await?.bytes().await?)
    }

    /// Runs the call and maps the body to `T` with the caller's mapper.
    pub async fn object<T>(self) -> Result<T, CallError>
    where
        T: DeserializeOwned,
    {
        let mapper = self.caller.mapper.clone();
        let body = self.bytes().await?;
        Ok(mapper.map_response_to_object(&body)?)
    }
}

/// Builder for [`WebServiceCaller`].
pub struct WebServiceCallerBuilder<M> {
    config: CallerConfig,
    mapper: M,
    authenticator: Option<Arc<dyn Authenticator>>,
    middlewares: Vec<Arc<dyn Middleware>>,
    connectivity: Option<Connectivity>,
    store: Option<Arc<dyn Store>>,
}

impl WebServiceCallerBuilder<JsonMapper> {
    fn new() -> Self {
        Self {
            config: CallerConfig::default(),
            mapper: JsonMapper,
            authenticator: None,
            middlewares: Vec::new(),
            connectivity: None,
            store: None,
        }
    }
}

impl<M> WebServiceCallerBuilder<M>
where
    M: ResponseMapper,
{
    /// Replaces the whole configuration.
    pub fn config(mut self, config: CallerConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables the disk cache in `dir`. The directory is created on build.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = Some(dir.into());
        self
    }

    /// Uses `store` instead of the disk cache.
    pub fn store(mut self, store: impl Store + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Replaces the body mapper.
    pub fn mapper<N>(self, mapper: N) -> WebServiceCallerBuilder<N>
    where
        N: ResponseMapper,
    {
        WebServiceCallerBuilder {
            config: self.config,
            mapper,
            authenticator: self.authenticator,
            middlewares: self.middlewares,
            connectivity: self.connectivity,
            store: self.store,
        }
    }

    /// Installs an authenticator, consulted on `401` responses.
    pub fn authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// Adds a middleware running before the cache-policy engine. Middlewares
    /// run in the order they were added.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Shares an existing connectivity flag instead of creating one.
    pub fn connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Builds the caller, opening the disk cache if a directory is set.
    pub fn build(self) -> Result<WebServiceCaller<M>, BuildError> {
        let config = self.config;
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .timeout(config.total_timeout())
            .build()?;

        let store = match (self.store, &config.cache_dir) {
            (Some(store), _) => Some(store),
            (None, Some(dir)) => {
                std::fs::create_dir_all(dir).map_err(StoreError::from)?;
                let store = DiskStore::builder()
                    .path(dir)
                    .max_file_size(config.cache_size.as_u64())
                    .build()?;
                Some(Arc::new(store) as Arc<dyn Store>)
            }
            (None, None) => None,
        };
        let cache_stage = match store {
            Some(store) => CacheStoreMiddleware::new(store),
            None => CacheStoreMiddleware::disabled(),
        };

        let connectivity = self.connectivity.unwrap_or_default();

        let mut builder = ClientBuilder::new(http_client);
        for middleware in self.middlewares {
            builder = builder.with_arc(middleware);
        }
        builder = builder.with(PolicyMiddleware::new(connectivity.clone()));
        if let Some(authenticator) = self.authenticator {
            builder = builder.with(AuthenticatorMiddleware::new(authenticator));
        }
        let client = builder
            .with(cache_stage)
            .with(NetworkStageMiddleware)
            .build();

        Ok(WebServiceCaller {
            client,
            config,
            connectivity,
            mapper: Arc::new(self.mapper),
        })
    }
}

impl<M> std::fmt::Debug for WebServiceCallerBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebServiceCallerBuilder")
            .field("config", &self.config)
            .field("middlewares", &self.middlewares.len())
            .field("authenticator", &self.authenticator.is_some())
            .finish_non_exhaustive()
    }
}
