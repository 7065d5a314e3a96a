//! # Video Intelligence Core
//!
//! Typed client for the Video Intelligence `AnnotateVideo` long-running operation.
//!
//! ## Architecture (block diagram)
//!
//! ```text
//! +---------------------+      +---------------------+      +---------------------+
//! | ClientConfig        | ---> | VideoIntelligence   | ---> | dyn Transport       |
//! | file/env/ambient    |      | ServiceClient       |      | gRPC/fallback/mock  |
//! +---------------------+      +---------------------+      +---------------------+
//!                                        |                            |
//!                                        v                            v
//!                              +---------------------+      +---------------------+
//!                              | Operation<R, M>     | <--- | google.longrunning  |
//!                              | wait / refresh      |      | Operation (wire)    |
//!                              +---------------------+      +---------------------+
//!                                        |
//!                                        v
//!                              +---------------------+
//!                              | Descriptors         |
//!                              | response/metadata   |
//!                              | decoders            |
//!                              +---------------------+
//! ```
//!
//! Most users should use the `videointelligence` crate, which re-exports this one.

pub mod client;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod operation;
pub mod proto;
pub mod transport;
pub mod types;

// Re-export error handling crates
pub use eyre;

pub use client::VideoIntelligenceServiceClient;
pub use config::{ClientConfig, Credentials};
pub use descriptor::{Decoder, Descriptors, LongRunningDescriptor, LongRunningMethod};
pub use error::{Error, Result};
pub use operation::{AnnotateVideoOperation, Operation};
pub use proto::RawOperation;
pub use transport::{FallbackTransport, GrpcTransport, MockTransport, Transport};
pub use types::{
    AnnotateVideoProgress, AnnotateVideoRequest, AnnotateVideoResponse, Feature,
    VideoAnnotationProgress, VideoAnnotationResults,
};
