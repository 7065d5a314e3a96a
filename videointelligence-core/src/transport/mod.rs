//! # Transport Module
//!
//! The client never talks to the network directly. Every RPC goes through a
//! [`Transport`], which is chosen at construction time and can be replaced by
//! any implementation, including [`MockTransport`] in tests.
//!
//! ```text
//! +---------------------------+        +----------------------+
//! | VideoIntelligenceService  | -----> | dyn Transport        |
//! | Client / Operation        |        +----------------------+
//! +---------------------------+          |        |        |
//!                                        v        v        v
//!                               GrpcTransport  Fallback  MockTransport
//!                               (tonic, h2)    (hyper,   (in-process)
//!                                              HTTP/1.1)
//! ```

mod fallback;
mod grpc;
mod mock;

pub use fallback::FallbackTransport;
pub use grpc::{ChannelExt, GrpcTransport, LoggingChannel, LoggingLayer, LoggingService};
pub use mock::MockTransport;

use crate::{config::ClientConfig, proto::RawOperation, types::AnnotateVideoRequest, Result};

/// The set of calls a `VideoIntelligenceServiceClient` needs from the wire.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Start an annotation. Resolves to the operation as first reported by the service.
    async fn annotate_video(&self, request: AnnotateVideoRequest) -> Result<RawOperation>;

    async fn get_operation(&self, name: &str) -> Result<RawOperation>;

    async fn cancel_operation(&self, name: &str) -> Result<()>;

    async fn delete_operation(&self, name: &str) -> Result<()>;
}

/// Headers sent with every call, regardless of transport.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallHeaders {
    entries: Vec<(&'static str, String)>,
}

impl CallHeaders {
    pub(crate) fn from_config(config: &ClientConfig) -> Self {
        let mut entries = vec![(
            "x-goog-api-client",
            format!("gl-rust gccl/{}", env!("CARGO_PKG_VERSION")),
        )];
        if let Some(token) = &config.access_token {
            entries.push(("authorization", format!("Bearer {token}")));
        }
        if let Some(project) = &config.project_id {
            entries.push(("x-goog-user-project", project.clone()));
        }
        CallHeaders { entries }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// `scheme://host:port` for the configured endpoint.
pub(crate) fn base_uri(config: &ClientConfig) -> String {
    let scheme = if config.insecure { "http" } else { "https" };
    let host = config
        .api_endpoint
        .as_deref()
        .unwrap_or(crate::client::DEFAULT_API_ENDPOINT);
    let port = config.port.unwrap_or(crate::client::DEFAULT_PORT);
    format!("{scheme}://{host}:{port}")
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_base_uri() {
        assert_eq!(
            base_uri(&ClientConfig::default()),
            "https://videointelligence.googleapis.com:443"
        );
    }

    #[test]
    fn insecure_base_uri() {
        let config = ClientConfig::default()
            .with_endpoint("127.0.0.1", 8080)
            .with_insecure(true);
        assert_eq!(base_uri(&config), "http://127.0.0.1:8080");
    }

    #[test]
    fn headers_carry_token_and_project() {
        let config = ClientConfig {
            access_token: Some("ya29.token".to_string()),
            ..ClientConfig::default().with_project_id("bogus")
        };
        let headers: Vec<_> = CallHeaders::from_config(&config)
            .iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        assert_eq!(headers[0].0, "x-goog-api-client");
        assert!(headers.contains(&("authorization", "Bearer ya29.token".to_string())));
        assert!(headers.contains(&("x-goog-user-project", "bogus".to_string())));
    }
}
