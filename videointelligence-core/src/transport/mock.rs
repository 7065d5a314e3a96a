//! In-process [`Transport`] test double.
//!
//! ```rust,ignore
//! let transport = Arc::new(MockTransport::long_running(request.clone(), AnnotateVideoResponse::default()));
//! let client = VideoIntelligenceServiceClient::with_transport(ClientConfig::default(), transport.clone());
//! let response = client.annotate_video(request.clone()).await?.wait().await?;
//! assert_eq!(transport.requests(), vec![request]);
//! ```

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};
use tracing::*;

use super::Transport;
use crate::proto::{self, longrunning::operation, rpc, videointelligence as pb, RawOperation};
use crate::types::{AnnotateVideoProgress, AnnotateVideoRequest, AnnotateVideoResponse};
use crate::{Error, Result};

static OPERATION_SEQ: AtomicUsize = AtomicUsize::new(1);

#[derive(Debug, Clone)]
enum Outcome {
    Response(prost_types::Any),
    OperationError(rpc::Status),
    CallError(rpc::Status),
}

/// Scripted transport: every `annotate_video` starts an operation that settles
/// with the configured outcome, optionally after a number of polls.
#[derive(Debug)]
pub struct MockTransport {
    expected_request: Option<AnnotateVideoRequest>,
    outcome: Outcome,
    progress: Option<prost_types::Any>,
    pending_polls: usize,
    requests: Mutex<Vec<AnnotateVideoRequest>>,
    polls: AtomicUsize,
    cancelled: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl MockTransport {
    fn with_outcome(expected_request: Option<AnnotateVideoRequest>, outcome: Outcome) -> Self {
        MockTransport {
            expected_request,
            outcome,
            progress: None,
            pending_polls: 0,
            requests: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
            cancelled: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    /// Operation that succeeds with `response`. Calls carrying any request other than
    /// `expected_request` fail with `INVALID_ARGUMENT`.
    pub fn long_running(
        expected_request: AnnotateVideoRequest,
        response: AnnotateVideoResponse,
    ) -> Self {
        let any = proto::pack(
            proto::ANNOTATE_VIDEO_RESPONSE,
            &pb::AnnotateVideoResponse::from(&response),
        );
        Self::with_outcome(Some(expected_request), Outcome::Response(any))
    }

    /// Operation that is accepted and then fails with `status`.
    pub fn long_running_error(expected_request: AnnotateVideoRequest, status: tonic::Status) -> Self {
        Self::with_outcome(
            Some(expected_request),
            Outcome::OperationError(rpc::Status::from(&status)),
        )
    }

    /// The initial call itself fails with `status`; no operation is created.
    pub fn call_error(status: tonic::Status) -> Self {
        Self::with_outcome(None, Outcome::CallError(rpc::Status::from(&status)))
    }

    /// Settle with an arbitrary `Any` payload, e.g. one with a foreign type URL.
    pub fn long_running_any(expected_request: AnnotateVideoRequest, any: prost_types::Any) -> Self {
        Self::with_outcome(Some(expected_request), Outcome::Response(any))
    }

    /// Report the operation as running for `polls` `GetOperation` calls before settling.
    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Attach progress metadata to every reported state of the operation.
    pub fn with_progress(mut self, progress: &AnnotateVideoProgress) -> Self {
        self.progress = Some(proto::pack(
            proto::ANNOTATE_VIDEO_PROGRESS,
            &pb::AnnotateVideoProgress::from(progress),
        ));
        self
    }

    /// Requests received by `annotate_video`, in call order.
    pub fn requests(&self) -> Vec<AnnotateVideoRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of `GetOperation` calls served.
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn operation(&self, name: String, done: bool) -> RawOperation {
        let result = match (&self.outcome, done) {
            (_, false) => None,
            (Outcome::Response(any), true) => Some(operation::Result::Response(any.clone())),
            (Outcome::OperationError(status), true) => {
                Some(operation::Result::Error(status.clone()))
            }
            (Outcome::CallError(_), true) => None,
        };
        RawOperation {
            name,
            metadata: self.progress.clone(),
            done,
            result,
        }
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn annotate_video(&self, request: AnnotateVideoRequest) -> Result<RawOperation> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Outcome::CallError(status) = &self.outcome {
            return Err(Error::Rpc(status.clone().into()));
        }
        if let Some(expected) = &self.expected_request {
            if *expected != request {
                warn!("mock received unexpected request: {request:?}");
                return Err(Error::Rpc(tonic::Status::invalid_argument(format!(
                    "expected {expected:?}, got {request:?}"
                ))));
            }
        }

        let name = format!("operations/mock-{}", OPERATION_SEQ.fetch_add(1, Ordering::SeqCst));
        Ok(self.operation(name, self.pending_polls == 0))
    }

    async fn get_operation(&self, name: &str) -> Result<RawOperation> {
        let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self.operation(name.to_string(), polls >= self.pending_polls))
    }

    async fn cancel_operation(&self, name: &str) -> Result<()> {
        if let Ok(mut cancelled) = self.cancelled.lock() {
            cancelled.push(name.to_string());
        }
        Ok(())
    }

    async fn delete_operation(&self, name: &str) -> Result<()> {
        if let Ok(mut deleted) = self.deleted.lock() {
            deleted.push(name.to_string());
        }
        Ok(())
    }
}
