//! Transport stage: stamps responses coming off the network.

use async_trait::async_trait;
use cachecall_core::{CachePolicyTag, ResponseStamp, rewrite_response};
use chrono::Utc;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use tracing::trace;

/// Innermost stage of the pipeline.
///
/// Every request reaching it goes to the network, so successful responses
/// are rewritten here, before the cache stage decides whether to persist
/// them. Stamped responses carry a [`ResponseStamp`] so the application
/// stage doesn't rewrite them again.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkStageMiddleware;

#[async_trait]
impl Middleware for NetworkStageMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let tag = extensions.get::<CachePolicyTag>().copied();
        let mut response = next.run(req, extensions).await?;

        if let Some(tag) = tag
            && response.status().is_success()
            && rewrite_response(response.headers_mut(), &tag, Utc::now())
        {
            trace!(%tag, url = %response.url(), "network response stamped");
            response.extensions_mut().insert(ResponseStamp);
        }
        Ok(response)
    }
}
