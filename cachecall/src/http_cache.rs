//! HTTP cache stage backed by a [`Store`].

use std::sync::Arc;

use async_trait::async_trait;
use cachecall_core::CacheControl;
use cachecall_store::{Store, StoreKey, StoredResponse};
use chrono::Utc;
use http::{Extensions, Method};
use reqwest::{Request, Response, Url};
use reqwest_middleware::{Middleware, Next};
use tracing::{debug, trace, warn};

use crate::response::{buffer, from_buffered, unsatisfiable};

/// Serves and persists `GET` responses according to their `Cache-Control`
/// directives.
///
/// - `only-if-cached` requests never leave this stage: they get the fresh
///   stored entry or a `504 Gateway Timeout`
/// - `no-cache` requests skip the lookup
/// - successful responses with a positive `max-age` are persisted, with the
///   `max-age` as TTL
/// - a successful exchange with `no-store` on either side evicts the entry
/// - successful unsafe methods evict the `GET` entry of the same URL
///
/// Store failures are logged and handled as misses.
#[derive(Clone)]
pub struct CacheStoreMiddleware {
    store: Option<Arc<dyn Store>>,
}

impl CacheStoreMiddleware {
    /// Creates the stage over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store: Some(store) }
    }

    /// Creates a stage without a store: every `only-if-cached` request gets
    /// the `504` sentinel and nothing is persisted.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    async fn lookup(&self, key: &StoreKey) -> Option<StoredResponse> {
        let store = self.store.as_ref()?;
        match store.read(key).await {
            Ok(Some(entry)) if entry.is_fresh(Utc::now()) => {
                trace!(store = store.label(), key = %key, "fresh entry");
                Some(entry)
            }
            Ok(Some(_)) => {
                trace!(store = store.label(), key = %key, "stale entry");
                None
            }
            Ok(None) => None,
            Err(error) => {
                warn!(store = store.label(), key = %key, error = %error, "store read failed");
                None
            }
        }
    }

    async fn evict(&self, store: &dyn Store, key: &StoreKey) {
        if let Err(error) = store.remove(key).await {
            warn!(store = store.label(), key = %key, error = %error, "store eviction failed");
        }
    }

    async fn persist(
        &self,
        store: &dyn Store,
        key: &StoreKey,
        url: &Url,
        response: Response,
        directives: CacheControl,
    ) -> reqwest_middleware::Result<Response> {
        let buffered = buffer(response).await?;
        let entry = StoredResponse::new(
            buffered.status(),
            buffered.version(),
            buffered.headers().clone(),
            buffered.body().clone(),
            Utc::now(),
        );
        match store.write(key, entry, directives.max_age()).await {
            Ok(()) => debug!(store = store.label(), key = %key, "response stored"),
            Err(error) => {
                warn!(store = store.label(), key = %key, error = %error, "store write failed")
            }
        }
        Ok(from_buffered(buffered, url))
    }
}

impl std::fmt::Debug for CacheStoreMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStoreMiddleware")
            .field("store", &self.store.as_ref().map(|store| store.label()))
            .finish()
    }
}

fn is_unsafe(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

#[async_trait]
impl Middleware for CacheStoreMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let request_directives = CacheControl::from_headers(req.headers());
        let method = req.method().clone();
        let cacheable = method == Method::GET;
        let url = req.url().clone();
        let key = StoreKey::get(url.as_str());

        if request_directives.only_if_cached {
            let entry = if cacheable {
                self.lookup(&key).await
            } else {
                None
            };
            return Ok(match entry {
                Some(entry) => from_buffered(entry.into_response(), &url),
                None => {
                    debug!(key = %key, "only-if-cached request unsatisfied");
                    unsatisfiable(&url)
                }
            });
        }

        if cacheable
            && !request_directives.no_cache
            && !request_directives.no_store
            && let Some(entry) = self.lookup(&key).await
        {
            return Ok(from_buffered(entry.into_response(), &url));
        }

        let response = next.run(req, extensions).await?;
        let Some(store) = self.store.as_deref() else {
            return Ok(response);
        };

        if !cacheable {
            if is_unsafe(&method) && response.status().is_success() {
                self.evict(store, &key).await;
            }
            return Ok(response);
        }

        let response_directives = CacheControl::from_headers(response.headers());
        if request_directives.no_store || response_directives.no_store {
            // a failed exchange leaves the previous entry for cache fallbacks
            if response.status().is_success() {
                self.evict(store, &key).await;
            }
            return Ok(response);
        }

        if response.status().is_success()
            && response_directives
                .max_age()
                .is_some_and(|max_age| !max_age.is_zero())
        {
            return self
                .persist(store, &key, &url, response, response_directives)
                .await;
        }

        Ok(response)
    }
}
