//! HTTP/1.1 fallback transport.
//!
//! For environments where HTTP/2 gRPC is unavailable. Each call is a
//! `POST {base}/$rpc/{service}/{Method}` with a binary protobuf body; failures
//! come back as a non-2xx response whose body is a `google.rpc.Status`.

use bytes::Bytes;
use http::{header::CONTENT_TYPE, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use prost::Message;
use std::time::Instant;
use tracing::*;

use super::{base_uri, CallHeaders, Transport};
use crate::proto::{
    self,
    longrunning::{CancelOperationRequest, DeleteOperationRequest, GetOperationRequest},
    rpc, videointelligence as pb, RawOperation,
};
use crate::{config::ClientConfig, types::AnnotateVideoRequest, Error, Result};

const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// [`Transport`] posting binary protobuf over plain HTTP/1.1.
pub struct FallbackTransport {
    base: String,
    headers: CallHeaders,
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl FallbackTransport {
    pub fn new(config: &ClientConfig) -> Self {
        FallbackTransport {
            base: base_uri(config),
            headers: CallHeaders::from_config(config),
            client: Client::builder(TokioExecutor::new()).build(HttpsConnector::new()),
        }
    }

    async fn call<Req, Resp>(&self, service: &str, method: &str, message: &Req) -> Result<Resp>
    where
        Req: Message,
        Resp: Message + Default,
    {
        let uri = format!("{}/$rpc/{service}/{method}", self.base);

        let mut builder = hyper::Request::builder()
            .method(Method::POST)
            .uri(&uri)
            .header(CONTENT_TYPE, PROTOBUF_CONTENT_TYPE);
        for (key, value) in self.headers.iter() {
            builder = builder.header(key, value);
        }
        let req = builder
            .body(Full::new(Bytes::from(message.encode_to_vec())))
            .map_err(|e| Error::Http(e.to_string()))?;

        let start = Instant::now();
        let res = self
            .client
            .request(req)
            .await
            .map_err(|e| Error::Http(format!("{uri}: {e}")))?;

        let status = res.status();
        let is_protobuf = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(PROTOBUF_CONTENT_TYPE));
        let body = res
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::Http(e.to_string()))?
            .to_bytes();

        debug!(%uri, %status, bytes = body.len(), elapsed = ?start.elapsed(), "fallback call finished");

        if status.is_success() {
            return Ok(Resp::decode(body)?);
        }
        Err(Error::Rpc(error_status(status, is_protobuf, &body)))
    }
}

/// Turn a failed HTTP response into the status the service meant to report.
fn error_status(status: StatusCode, is_protobuf: bool, body: &Bytes) -> tonic::Status {
    if is_protobuf {
        match rpc::Status::decode(body.clone()) {
            Ok(decoded) if decoded.code != 0 => return decoded.into(),
            Ok(_) => {}
            Err(e) => warn!("undecodable error body for HTTP {status}: {e}"),
        }
    }

    let message = if body.is_empty() {
        status.to_string()
    } else {
        String::from_utf8_lossy(body).into_owned()
    };
    tonic::Status::new(code_for_http_status(status), message)
}

fn code_for_http_status(status: StatusCode) -> tonic::Code {
    match status.as_u16() {
        400 => tonic::Code::InvalidArgument,
        401 => tonic::Code::Unauthenticated,
        403 => tonic::Code::PermissionDenied,
        404 => tonic::Code::NotFound,
        409 => tonic::Code::Aborted,
        412 => tonic::Code::FailedPrecondition,
        416 => tonic::Code::OutOfRange,
        429 => tonic::Code::ResourceExhausted,
        499 => tonic::Code::Cancelled,
        501 => tonic::Code::Unimplemented,
        503 => tonic::Code::Unavailable,
        504 => tonic::Code::DeadlineExceeded,
        500..=599 => tonic::Code::Internal,
        _ => tonic::Code::Unknown,
    }
}

#[async_trait::async_trait]
impl Transport for FallbackTransport {
    async fn annotate_video(&self, request: AnnotateVideoRequest) -> Result<RawOperation> {
        self.call(
            proto::VIDEO_INTELLIGENCE_SERVICE,
            "AnnotateVideo",
            &pb::AnnotateVideoRequest::from(&request),
        )
        .await
    }

    async fn get_operation(&self, name: &str) -> Result<RawOperation> {
        self.call(
            proto::OPERATIONS_SERVICE,
            "GetOperation",
            &GetOperationRequest {
                name: name.to_string(),
            },
        )
        .await
    }

    async fn cancel_operation(&self, name: &str) -> Result<()> {
        self.call(
            proto::OPERATIONS_SERVICE,
            "CancelOperation",
            &CancelOperationRequest {
                name: name.to_string(),
            },
        )
        .await
    }

    async fn delete_operation(&self, name: &str) -> Result<()> {
        self.call(
            proto::OPERATIONS_SERVICE,
            "DeleteOperation",
            &DeleteOperationRequest {
                name: name.to_string(),
            },
        )
        .await
    }
}
