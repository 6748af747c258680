//! Pluggable authentication on `401 Unauthorized`.

use std::sync::Arc;

use async_trait::async_trait;
use http::{Extensions, StatusCode};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use tracing::debug;

/// Answers authentication challenges.
///
/// ```
/// use async_trait::async_trait;
/// use cachecall::Authenticator;
/// use reqwest::{Request, Response};
///
/// struct StaticToken(&'static str);
///
/// #[async_trait]
/// impl Authenticator for StaticToken {
///     async fn authenticate(&self, request: &Request, _: &Response) -> Option<Request> {
///         let mut retry = request.try_clone()?;
///         retry.headers_mut().insert(
///             reqwest::header::AUTHORIZATION,
///             format!("Bearer {}", self.0).parse().ok()?,
///         );
///         Some(retry)
///     }
/// }
/// ```
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the request to replay after `response` was a `401`, or `None`
    /// to give up and return the `401`.
    async fn authenticate(&self, request: &Request, response: &Response) -> Option<Request>;
}

/// Replays a request once through its [`Authenticator`] on `401`.
///
/// Requests whose body can't be cloned are never replayed.
#[derive(Clone)]
pub struct AuthenticatorMiddleware {
    authenticator: Arc<dyn Authenticator>,
}

impl AuthenticatorMiddleware {
    /// Creates the stage around `authenticator`.
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self { authenticator }
    }
}

impl std::fmt::Debug for AuthenticatorMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatorMiddleware").finish_non_exhaustive()
    }
}

#[async_trait]
impl Middleware for AuthenticatorMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let original = req.try_clone();
        let response = next.clone().run(req, extensions).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Some(original) = original else {
            return Ok(response);
        };

        match self.authenticator.authenticate(&original, &response).await {
            Some(retry) => {
                debug!(url = %retry.url(), "replaying request after authentication");
                next.run(retry, extensions).await
            }
            None => Ok(response),
        }
    }
}
