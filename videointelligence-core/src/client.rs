//! # Video Intelligence Service Client
//!
//! ```rust,ignore
//! use videointelligence_core::{AnnotateVideoRequest, Feature, VideoIntelligenceServiceClient};
//!
//! let client = VideoIntelligenceServiceClient::new();
//! let request = AnnotateVideoRequest::new(
//!     "gs://cloud-samples-data/video/cat.mp4",
//!     [Feature::LabelDetection],
//! );
//!
//! // First stage: the service accepted the work.
//! let operation = client.annotate_video(request).await?;
//! // Second stage: the work finished.
//! let response = operation.wait().await?;
//! ```

use std::sync::Arc;
use tracing::*;

use crate::config::ClientConfig;
use crate::descriptor::Descriptors;
use crate::operation::{AnnotateVideoOperation, Operation};
use crate::proto::RawOperation;
use crate::transport::{FallbackTransport, GrpcTransport, Transport};
use crate::types::AnnotateVideoRequest;
use crate::Result;

pub(crate) const DEFAULT_API_ENDPOINT: &str = "videointelligence.googleapis.com";
pub(crate) const DEFAULT_PORT: u16 = 443;

/// Client for `google.cloud.videointelligence.v1.VideoIntelligenceService`.
pub struct VideoIntelligenceServiceClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    descriptors: Descriptors,
}

impl std::fmt::Debug for VideoIntelligenceServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoIntelligenceServiceClient")
            .field("config", &self.config)
            .field("descriptors", &self.descriptors)
            .finish_non_exhaustive()
    }
}

impl Default for VideoIntelligenceServiceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoIntelligenceServiceClient {
    /// DNS name of the service.
    pub const SERVICE_PATH: &'static str = DEFAULT_API_ENDPOINT;
    /// Default API endpoint.
    pub const API_ENDPOINT: &'static str = DEFAULT_API_ENDPOINT;
    /// Default port.
    pub const PORT: u16 = DEFAULT_PORT;

    pub fn service_path() -> &'static str {
        Self::SERVICE_PATH
    }

    pub fn api_endpoint() -> &'static str {
        Self::API_ENDPOINT
    }

    pub fn port() -> u16 {
        Self::PORT
    }

    /// Client with default options and ambient credentials.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Client for `config`. Never fails: problems resolving ambient credentials
    /// are logged, and the connection is only made by the first call.
    pub fn with_config(config: ClientConfig) -> Self {
        let (config, key_error) = config.resolve_ambient_partial();
        if let Some(e) = key_error {
            warn!("ignoring ambient credentials: {e}");
        }

        let transport: Arc<dyn Transport> = if config.fallback {
            debug!("using HTTP/1.1 fallback transport");
            Arc::new(FallbackTransport::new(&config))
        } else {
            Arc::new(GrpcTransport::new(&config))
        };

        Self::with_transport(config, transport)
    }

    /// Client configured from `videointelligence.toml` and the environment.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::load()?.resolve_ambient()?;
        Ok(Self::with_config(config))
    }

    /// Client sending every call through `transport`.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        VideoIntelligenceServiceClient {
            config,
            transport,
            descriptors: Descriptors::default(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn project_id(&self) -> Option<&str> {
        self.config.project_id.as_deref()
    }

    /// Descriptors of the long-running methods, with their decoders.
    pub fn descriptors(&self) -> &Descriptors {
        &self.descriptors
    }

    /// Start video annotation.
    ///
    /// Resolves once the service has accepted the request. Results are obtained by
    /// waiting on the returned operation.
    pub async fn annotate_video(
        &self,
        request: AnnotateVideoRequest,
    ) -> Result<AnnotateVideoOperation> {
        request.validate()?;
        debug!(input_uri = %request.input_uri, features = ?request.features, "annotateVideo");

        let raw = self.transport.annotate_video(request).await?;
        info!(name = %raw.name, done = raw.done, "annotation started");
        Ok(self.annotate_video_operation(raw))
    }

    /// Re-attach to an `AnnotateVideo` operation started earlier, by name.
    pub async fn check_annotate_video_progress(
        &self,
        name: &str,
    ) -> Result<AnnotateVideoOperation> {
        let raw = self.transport.get_operation(name).await?;
        Ok(self.annotate_video_operation(raw))
    }

    pub async fn get_operation(&self, name: &str) -> Result<RawOperation> {
        self.transport.get_operation(name).await
    }

    pub async fn cancel_operation(&self, name: &str) -> Result<()> {
        self.transport.cancel_operation(name).await
    }

    pub async fn delete_operation(&self, name: &str) -> Result<()> {
        self.transport.delete_operation(name).await
    }

    fn annotate_video_operation(&self, raw: RawOperation) -> AnnotateVideoOperation {
        Operation::new(
            raw,
            self.transport.clone(),
            self.descriptors.longrunning.annotate_video,
            self.config.poll_interval,
            self.config.total_timeout,
        )
    }
}
