//! Request processing pipeline
//!
//! Every inbound request runs through an ordered list of [`Stage`]s before it
//! reaches the terminal [`Handler`]:
//!
//! ```text
//! request  → stage[0] → stage[1] → ... → stage[n-1] → handler
//! response ← stage[0] ← stage[1] ← ... ← stage[n-1] ← handler
//! ```
//!
//! A stage either forwards through [`Next::run`] (at most once, since `run`
//! consumes the continuation) or short-circuits by returning its own response.
//! Errors raised downstream travel back up as `Err(GatewayError)` and must be
//! returned unchanged by every stage that does not own them.

mod service;

pub use service::{HandlerFailure, PipelineService, RouterHandler};

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ConnectInfo;

use crate::error::GatewayResult;

pub type Request = axum::extract::Request;
pub type Response = axum::response::Response;

/// Identity used to partition rate-limit accounting.
///
/// Derived from the peer address of the connection. Behind a reverse proxy
/// every client shares the proxy's address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the key for a request: an explicit `ClientKey` extension wins,
    /// then the connection's peer IP.
    pub fn from_request(request: &Request) -> Self {
        if let Some(key) = request.extensions().get::<ClientKey>() {
            return key.clone();
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Self(addr.ip().to_string()))
            .unwrap_or_else(Self::unknown)
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marker attached to responses produced by a short-circuiting stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    OriginNotAllowed,
    RateLimited,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OriginNotAllowed => "origin_not_allowed",
            Self::RateLimited => "rate_limited",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business logic at the end of the chain
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, request: Request) -> GatewayResult<Response>;
}

/// One interceptor in the pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable name, used for introspection and logs
    fn name(&self) -> &'static str;

    async fn process(&self, request: Request, next: Next<'_>) -> GatewayResult<Response>;
}

/// Continuation handed to a stage: all later stages plus the handler
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    handler: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Run the rest of the chain
    pub async fn run(self, request: Request) -> GatewayResult<Response> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    handler: self.handler,
                };
                stage.process(request, next).await
            }
            None => self.handler.call(request).await,
        }
    }

    /// Number of stages still ahead of the handler
    pub fn remaining_stages(&self) -> usize {
        self.stages.len()
    }
}

/// Ordered, immutable composition of stages and a terminal handler
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    handler: Arc<dyn Handler>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Execute the full chain for one request
    pub async fn execute(&self, mut request: Request) -> GatewayResult<Response> {
        if request.extensions().get::<ClientKey>().is_none() {
            let key = ClientKey::from_request(&request);
            request.extensions_mut().insert(key);
        }

        Next {
            stages: &self.stages,
            handler: self.handler.as_ref(),
        }
        .run(request)
        .await
    }

    /// Stage names in registration (outer → inner) order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

/// Builder collecting stages outer-first
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Stage>>,
}

impl PipelineBuilder {
    /// Append a stage; earlier stages wrap later ones
    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn shared_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build<H: Handler + 'static>(self, handler: H) -> Pipeline {
        self.build_shared(Arc::new(handler))
    }

    pub fn build_shared(self, handler: Arc<dyn Handler>) -> Pipeline {
        Pipeline {
            stages: self.stages,
            handler,
        }
    }
}
