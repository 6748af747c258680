//! The cache-policy resolution engine.
//!
//! [`PolicyMiddleware`] is the application stage of the pipeline. For every
//! tagged request it:
//!
//! 1. picks the shape of the first attempt (network, cache or unmodified)
//! 2. fails fast when the network is required but unreachable
//! 3. dispatches the first attempt, turning transport errors into an absent
//!    response
//! 4. consults [`transitions::decide`] and either returns, fails, or runs a
//!    single fallback attempt resolved by [`transitions::decide_fallback`]

pub mod transitions;

use async_trait::async_trait;
use cachecall_core::{
    CachePolicy, CachePolicyTag, Connectivity, ResponseStamp, rewrite_response, to_cache_request,
    to_network_request,
};
use chrono::Utc;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use tracing::{debug, warn};

use crate::error::{CallError, StatusError};
use crate::response::buffer;

use self::transitions::{Decision, decide, decide_fallback};

/// Shape given to a request before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Network,
    Cache,
    Unmodified,
}

impl Route {
    fn first(policy: CachePolicy) -> Self {
        match policy {
            CachePolicy::OnlyCache | CachePolicy::CacheThenNetwork => Route::Cache,
            CachePolicy::OnlyNetwork | CachePolicy::NetworkThenCache => Route::Network,
            CachePolicy::Server => Route::Unmodified,
        }
    }

    fn shape(self, mut request: Request, tag: &CachePolicyTag) -> Request {
        match self {
            Route::Network => to_network_request(request.headers_mut(), tag),
            Route::Cache => to_cache_request(request.headers_mut()),
            Route::Unmodified => {}
        }
        request
    }
}

fn has_fallback(policy: CachePolicy) -> bool {
    matches!(
        policy,
        CachePolicy::CacheThenNetwork | CachePolicy::NetworkThenCache
    )
}

fn fail(error: CallError) -> reqwest_middleware::Error {
    reqwest_middleware::Error::middleware(error)
}

/// Application stage: resolves each call against its [`CachePolicyTag`].
///
/// The tag is read from the request extensions; a request without one is a
/// configuration error and fails with [`CallError::MissingPolicyTag`].
#[derive(Debug, Clone)]
pub struct PolicyMiddleware {
    connectivity: Connectivity,
}

impl PolicyMiddleware {
    /// Creates the stage reading the given connectivity flag.
    pub fn new(connectivity: Connectivity) -> Self {
        Self { connectivity }
    }

    async fn dispatch(
        &self,
        next: &Next<'_>,
        request: Request,
        extensions: &mut Extensions,
        attempt: &'static str,
    ) -> Option<Response> {
        let url = request.url().clone();
        match next.clone().run(request, extensions).await {
            Ok(response) => {
                debug!(attempt, url = %url, status = %response.status(), "attempt completed");
                Some(response)
            }
            Err(error) => {
                warn!(attempt, url = %url, error = %error, "attempt failed, treating as no response");
                None
            }
        }
    }

    async fn status_failure(response: Option<Response>) -> reqwest_middleware::Error {
        match response {
            None => fail(StatusError::absent().into()),
            Some(response) => match buffer(response).await {
                Ok(buffered) => fail(StatusError::new(buffered).into()),
                Err(error) => reqwest_middleware::Error::Reqwest(error),
            },
        }
    }
}

#[async_trait]
impl Middleware for PolicyMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let tag = *extensions
            .get::<CachePolicyTag>()
            .ok_or_else(|| fail(CallError::MissingPolicyTag))?;
        let policy = tag.policy();
        let url = req.url().clone();
        debug!(%tag, method = %req.method(), url = %url, "resolving call");

        if policy == CachePolicy::OnlyNetwork && !self.connectivity.is_connected() {
            debug!(url = %url, "offline, network-only call not attempted");
            return Err(fail(CallError::connectivity(&url)));
        }

        let template = if has_fallback(policy) {
            let template = req.try_clone();
            if template.is_none() {
                warn!(url = %url, "request body can't be replayed, fallback disabled");
            }
            template
        } else {
            None
        };

        let first = Route::first(policy).shape(req, &tag);
        let response = self.dispatch(&next, first, extensions, "first").await;

        let route = match decide(policy, response.as_ref().map(Response::status)) {
            Decision::Success => {
                let mut response = response.ok_or_else(|| fail(StatusError::absent().into()))?;
                if response.extensions().get::<ResponseStamp>().is_none()
                    && rewrite_response(response.headers_mut(), &tag, Utc::now())
                {
                    response.extensions_mut().insert(ResponseStamp);
                }
                return Ok(response);
            }
            Decision::CacheUnsatisfiable => {
                return Err(fail(CallError::cache_unsatisfiable(&url)));
            }
            Decision::StatusFailure => return Err(Self::status_failure(response).await),
            Decision::NetworkFallback => {
                if !self.connectivity.is_connected() {
                    debug!(url = %url, "cache miss while offline");
                    return Err(fail(CallError::connectivity(&url)));
                }
                Route::Network
            }
            Decision::CacheFallback => Route::Cache,
        };

        let Some(template) = template else {
            return Err(Self::status_failure(response).await);
        };
        drop(response);

        debug!(url = %url, ?route, "falling back");
        let second = route.shape(template, &tag);
        let response = self.dispatch(&next, second, extensions, "fallback").await;

        match decide_fallback(policy, response.as_ref().map(Response::status)) {
            Decision::Success => response.ok_or_else(|| fail(StatusError::absent().into())),
            _ => Err(Self::status_failure(response).await),
        }
    }
}
