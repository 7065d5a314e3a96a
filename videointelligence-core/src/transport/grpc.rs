//! gRPC transport over a tonic channel.
//!
//! The channel is connected on first use and wrapped in [`LoggingLayer`], a
//! tower middleware that traces the method, status and latency of every call.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::OnceCell;
use tonic::body::Body;
use tonic::codegen::http::{Request, Response};
use tonic::metadata::{AsciiMetadataValue, MetadataMap};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tower::{Layer, Service, ServiceExt};
use tracing::*;

use super::{base_uri, CallHeaders, Transport};
use crate::proto::{
    longrunning::{
        operations_client::OperationsClient, CancelOperationRequest, DeleteOperationRequest,
        GetOperationRequest,
    },
    videointelligence::{
        self as pb, video_intelligence_service_client::VideoIntelligenceServiceClient,
    },
    RawOperation,
};
use crate::{config::ClientConfig, types::AnnotateVideoRequest, Error, Result};

/// Tower Layer that adds logging to gRPC services.
#[derive(Clone, Default)]
pub struct LoggingLayer;

impl LoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService { inner }
    }
}

/// Tower Service that wraps gRPC calls with logging.
#[derive(Clone)]
pub struct LoggingService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for LoggingService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Error: std::fmt::Debug + Send,
    S::Future: Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Swap so this instance keeps the ready state
        let mut inner = self.inner.clone();
        std::mem::swap(&mut self.inner, &mut inner);

        Box::pin(async move {
            let start = Instant::now();
            let method = req.uri().path().to_string();

            let ready_svc = inner.ready().await.map_err(|e| {
                error!("gRPC service not ready: {:?}", e);
                e
            })?;

            let response = match ready_svc.call(req).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(%method, elapsed = ?start.elapsed(), "gRPC call failed: {:?}", e);
                    return Err(e);
                }
            };

            let (code, message) = extract_grpc_status(response.headers());
            debug!(
                %method,
                status = ?code,
                message = %message,
                elapsed = ?start.elapsed(),
                "gRPC call finished"
            );

            Ok(response)
        })
    }
}

/// Type alias for a channel with logging applied.
pub type LoggingChannel = LoggingService<Channel>;

/// Extract gRPC status code and message from response headers.
///
/// Only trailers-only responses carry the status in headers; everything else
/// reports `Ok` here and the real status surfaces from the decoded response.
fn extract_grpc_status(headers: &http::HeaderMap) -> (tonic::Code, String) {
    let code = headers
        .get("grpc-status")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i32>().ok())
        .map(tonic::Code::from)
        .unwrap_or(tonic::Code::Ok);

    let message = headers
        .get("grpc-message")
        .and_then(|v| v.to_str().ok())
        .map(|s| urlencoding::decode(s).unwrap_or_default().into_owned())
        .unwrap_or_default();

    (code, message)
}

/// Extension trait for adding logging to a gRPC channel.
pub trait ChannelExt: Sized {
    fn with_logging(self) -> LoggingChannel;
}

impl ChannelExt for Channel {
    fn with_logging(self) -> LoggingChannel {
        LoggingLayer::new().layer(self)
    }
}

/// [`Transport`] speaking gRPC to the service and its `google.longrunning.Operations` mixin.
pub struct GrpcTransport {
    uri: String,
    tls: bool,
    metadata: MetadataMap,
    channel: OnceCell<LoggingChannel>,
}

impl GrpcTransport {
    /// Create the transport. No connection is made until the first call.
    pub fn new(config: &ClientConfig) -> Self {
        let mut metadata = MetadataMap::new();
        for (key, value) in CallHeaders::from_config(config).iter() {
            match value.parse::<AsciiMetadataValue>() {
                Ok(value) => {
                    metadata.insert(key, value);
                }
                Err(e) => warn!("dropping metadata {key}: {e}"),
            }
        }

        GrpcTransport {
            uri: base_uri(config),
            tls: !config.insecure,
            metadata,
            channel: OnceCell::new(),
        }
    }

    async fn channel(&self) -> Result<LoggingChannel> {
        let channel = self
            .channel
            .get_or_try_init(|| async {
                let mut endpoint = Endpoint::from_shared(self.uri.clone())
                    .map_err(|e| Error::InvalidUri(e.to_string()))?;
                if self.tls {
                    endpoint = endpoint.tls_config(ClientTlsConfig::new().with_native_roots())?;
                }
                debug!("connecting to {}", self.uri);
                let channel = endpoint.connect().await?;
                Ok::<_, Error>(channel.with_logging())
            })
            .await?;
        Ok(channel.clone())
    }

    fn request<T>(&self, message: T) -> tonic::Request<T> {
        tonic::Request::from_parts(self.metadata.clone(), tonic::Extensions::default(), message)
    }
}

#[async_trait::async_trait]
impl Transport for GrpcTransport {
    async fn annotate_video(&self, request: AnnotateVideoRequest) -> Result<RawOperation> {
        let mut client = VideoIntelligenceServiceClient::new(self.channel().await?);
        let response = client
            .annotate_video(self.request(pb::AnnotateVideoRequest::from(&request)))
            .await?;
        Ok(response.into_inner())
    }

    async fn get_operation(&self, name: &str) -> Result<RawOperation> {
        let mut client = OperationsClient::new(self.channel().await?);
        let response = client
            .get_operation(self.request(GetOperationRequest {
                name: name.to_string(),
            }))
            .await?;
        Ok(response.into_inner())
    }

    async fn cancel_operation(&self, name: &str) -> Result<()> {
        let mut client = OperationsClient::new(self.channel().await?);
        client
            .cancel_operation(self.request(CancelOperationRequest {
                name: name.to_string(),
            }))
            .await?;
        Ok(())
    }

    async fn delete_operation(&self, name: &str) -> Result<()> {
        let mut client = OperationsClient::new(self.channel().await?);
        client
            .delete_operation(self.request(DeleteOperationRequest {
                name: name.to_string(),
            }))
            .await?;
        Ok(())
    }
}
