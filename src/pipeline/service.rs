//! Adapters between the pipeline and axum/tower

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::IntoResponse;
use axum::Router;
use tower::{Service, ServiceExt};

use super::{Handler, Pipeline, Request, Response};
use crate::error::{GatewayError, GatewayResult};
use crate::security::SecurityHeaders;

/// Marker a failing route leaves on its response so the pipeline can surface
/// the failure instead of treating the 5xx as an ordinary response
#[derive(Debug, Clone)]
pub struct HandlerFailure(pub String);

/// Terminal handler that dispatches into an axum route table.
///
/// A route that outlives the timeout is dropped and reported as a handler
/// failure, so it still flows back through every stage.
#[derive(Clone)]
pub struct RouterHandler {
    router: Router,
    timeout: Option<Duration>,
}

impl RouterHandler {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Handler for RouterHandler {
    async fn call(&self, request: Request) -> GatewayResult<Response> {
        let dispatch = self.router.clone().oneshot(request);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, dispatch).await.map_err(|_| {
                GatewayError::Handler(format!("request timed out after {}ms", limit.as_millis()))
            })?,
            None => dispatch.await,
        };
        let mut response = match result {
            Ok(response) => response,
            Err(never) => match never {},
        };

        if let Some(HandlerFailure(message)) = response.extensions_mut().remove::<HandlerFailure>() {
            return Err(GatewayError::Handler(message));
        }

        Ok(response)
    }
}

/// Tower service running every request through a [`Pipeline`].
///
/// This is the outer collaborator for failures: an error that escapes the
/// pipeline becomes a JSON error response, and still gets the security headers.
#[derive(Clone)]
pub struct PipelineService {
    pipeline: Arc<Pipeline>,
    error_headers: Option<Arc<SecurityHeaders>>,
}

impl PipelineService {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            error_headers: None,
        }
    }

    pub fn with_error_headers(mut self, headers: Arc<SecurityHeaders>) -> Self {
        self.error_headers = Some(headers);
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl Service<Request> for PipelineService {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let pipeline = self.pipeline.clone();
        let error_headers = self.error_headers.clone();

        Box::pin(async move {
            match pipeline.execute(request).await {
                Ok(response) => Ok(response),
                Err(err) => {
                    let mut response = err.into_response();
                    response.extensions_mut().remove::<HandlerFailure>();
                    if let Some(headers) = &error_headers {
                        headers.apply(response.headers_mut());
                    }
                    Ok(response)
                }
            }
        })
    }
}
