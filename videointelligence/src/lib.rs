//! # Video Intelligence
//!
//! Client for the Video Intelligence `AnnotateVideo` long-running operation, and
//! the `videointelligence` command-line tool built on it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use videointelligence::{AnnotateVideoRequest, Feature, VideoIntelligenceServiceClient};
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let client = VideoIntelligenceServiceClient::from_env()?;
//!     let request = AnnotateVideoRequest::new(
//!         "gs://cloud-samples-data/video/cat.mp4",
//!         [Feature::LabelDetection],
//!     );
//!
//!     let operation = client.annotate_video(request).await?;
//!     let response = operation.wait().await?;
//!     for results in &response.annotation_results {
//!         for label in &results.segment_label_annotations {
//!             println!("{:?}", label.entity);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Testing code that uses the client
//!
//! Inject a [`MockTransport`] instead of talking to the network:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use videointelligence::{
//!     AnnotateVideoRequest, AnnotateVideoResponse, ClientConfig, Feature, MockTransport,
//!     VideoIntelligenceServiceClient,
//! };
//!
//! # async fn demo() -> eyre::Result<()> {
//! let request = AnnotateVideoRequest::new("gs://bucket/video.mp4", [Feature::LabelDetection]);
//! let transport = Arc::new(MockTransport::long_running(
//!     request.clone(),
//!     AnnotateVideoResponse::default(),
//! ));
//! let client = VideoIntelligenceServiceClient::with_transport(ClientConfig::default(), transport);
//! let response = client.annotate_video(request).await?.wait().await?;
//! assert_eq!(response, AnnotateVideoResponse::default());
//! # Ok(())
//! # }
//! ```

mod app;

// Re-export error handling crates for user convenience
pub use eyre;

pub use app::App;

pub use videointelligence_core::{
    client, config, descriptor, error, operation, proto, transport, types,
    AnnotateVideoOperation, AnnotateVideoProgress, AnnotateVideoRequest, AnnotateVideoResponse,
    ClientConfig, Credentials, Descriptors, Error, Feature, FallbackTransport, GrpcTransport,
    MockTransport, Operation, RawOperation, Result, Transport, VideoIntelligenceServiceClient,
};
