// src/server/handler.rs
use hyper::{Body, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;

use crate::proxy::DevProxy;

#[derive(Clone)]
pub struct RequestHandler {
    proxy: Arc<DevProxy>,
}

impl RequestHandler {
    pub fn new(proxy: Arc<DevProxy>) -> Self {
        Self { proxy }
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let proxy = self.proxy.clone();
        Box::pin(async move {
            // Errors become responses; the connection stays up.
            Ok(proxy.handle(req).await.unwrap_or_else(|e| {
                tracing::debug!(%e, status = %e.status(), "request failed");
                e.into()
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::ProxyRule;
    use hyper::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_errors_become_responses() {
        let proxy = DevProxy::new(ProxyRule::new("/api", "http://127.0.0.1:8000", true).unwrap());
        let handler = RequestHandler::new(Arc::new(proxy));

        let req = Request::get("/missing").body(Body::empty()).unwrap();
        let response = handler.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
