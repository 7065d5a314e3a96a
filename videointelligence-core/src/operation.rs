//! # Operation Handle
//!
//! `annotate_video` does not return annotations. It returns an [`Operation`]:
//! a handle on work the service is still doing. Awaiting [`Operation::wait`]
//! is the second stage that yields the final decoded response or the
//! operation's original error.
//!
//! ```text
//! annotate_video(req) --await--> Operation { done: false } --wait()--> GetOperation ... --> R
//!                                Operation { done: true  } --wait()--------------------> R | Error
//! ```
//!
//! A handle settles exactly once. After the service reports `done`, no further
//! polls are made and the stored state never changes.

use std::{fmt, sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::*;

use crate::descriptor::LongRunningDescriptor;
use crate::proto::{longrunning::operation, RawOperation};
use crate::transport::Transport;
use crate::types::{AnnotateVideoProgress, AnnotateVideoResponse};
use crate::{Error, Result};

/// Handle on a running `AnnotateVideo`.
pub type AnnotateVideoOperation = Operation<AnnotateVideoResponse, AnnotateVideoProgress>;

/// A pending long-running operation with response type `R` and metadata type `M`.
pub struct Operation<R, M> {
    raw: RawOperation,
    transport: Arc<dyn Transport>,
    descriptor: LongRunningDescriptor<R, M>,
    poll_interval: Duration,
    total_timeout: Duration,
}

impl<R, M> fmt::Debug for Operation<R, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.raw.name)
            .field("done", &self.raw.done)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl<R, M> Operation<R, M> {
    pub(crate) fn new(
        raw: RawOperation,
        transport: Arc<dyn Transport>,
        descriptor: LongRunningDescriptor<R, M>,
        poll_interval: Duration,
        total_timeout: Duration,
    ) -> Self {
        Operation {
            raw,
            transport,
            descriptor,
            poll_interval,
            total_timeout,
        }
    }

    /// Server-assigned name, usable with `check_annotate_video_progress` later.
    pub fn name(&self) -> &str {
        &self.raw.name
    }

    pub fn done(&self) -> bool {
        self.raw.done
    }

    /// Latest wire state of the operation.
    pub fn raw(&self) -> &RawOperation {
        &self.raw
    }

    /// Decoded progress metadata of the latest known state.
    pub fn metadata(&self) -> Result<Option<M>> {
        self.raw
            .metadata
            .as_ref()
            .map(|any| self.descriptor.unpack_metadata(any))
            .transpose()
    }

    /// Outcome of a settled operation, `None` while it is still running.
    pub fn result(&self) -> Option<Result<R>> {
        if !self.raw.done {
            return None;
        }
        Some(match &self.raw.result {
            Some(operation::Result::Response(any)) => self.descriptor.unpack_response(any),
            Some(operation::Result::Error(status)) => Err(Error::OperationFailed {
                name: self.raw.name.clone(),
                status: status.clone().into(),
            }),
            None => Err(Error::MissingResult(self.raw.name.clone())),
        })
    }

    /// Fetch the latest state from the service. A settled operation is left untouched.
    pub async fn refresh(&mut self) -> Result<()> {
        if self.raw.done {
            return Ok(());
        }
        let latest = self.transport.get_operation(&self.raw.name).await?;
        trace!(name = %latest.name, done = latest.done, "polled operation");
        self.raw = latest;
        Ok(())
    }

    /// Wait for the operation to finish and return its final response.
    ///
    /// A failed operation yields [`Error::OperationFailed`] carrying the status the
    /// service reported, code unchanged.
    pub async fn wait(self) -> Result<R> {
        self.wait_with_metadata().await.map(|(response, _)| response)
    }

    /// Like [`Operation::wait`], also returning the last reported metadata.
    pub async fn wait_with_metadata(mut self) -> Result<(R, Option<M>)> {
        // A timeout too large to represent means no deadline.
        let deadline = Instant::now().checked_add(self.total_timeout);
        loop {
            if let Some(result) = self.result() {
                let response = result?;
                let metadata = self.metadata()?;
                debug!(name = %self.raw.name, "operation completed");
                return Ok((response, metadata));
            }

            let delay = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(Error::Timeout(self.raw.name.clone()));
                    }
                    self.poll_interval.min(deadline - now)
                }
                None => self.poll_interval,
            };
            tokio::time::sleep(delay).await;
            self.refresh().await?;
        }
    }

    /// Ask the service to cancel the operation. Cancellation is best-effort; poll to observe it.
    pub async fn cancel(&self) -> Result<()> {
        info!(name = %self.raw.name, "cancelling operation");
        self.transport.cancel_operation(&self.raw.name).await
    }

    /// Tell the service the result is no longer of interest.
    pub async fn delete(&self) -> Result<()> {
        self.transport.delete_operation(&self.raw.name).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::descriptor::Descriptors;
    use crate::proto::{self, rpc, videointelligence as pb};
    use crate::transport::MockTransport;
    use crate::types::{AnnotateVideoRequest, Feature, VideoAnnotationProgress};
    use pretty_assertions::assert_eq;

    fn handle(raw: RawOperation, transport: Arc<dyn Transport>) -> AnnotateVideoOperation {
        Operation::new(
            raw,
            transport,
            Descriptors::default().longrunning.annotate_video,
            Duration::from_millis(5),
            Duration::from_secs(5),
        )
    }

    fn idle_transport() -> Arc<dyn Transport> {
        Arc::new(MockTransport::call_error(tonic::Status::internal("unused")))
    }

    #[tokio::test]
    async fn done_operation_settles_without_polling() -> eyre::Result<()> {
        let raw = RawOperation {
            name: "operations/1".to_string(),
            metadata: None,
            done: true,
            result: Some(operation::Result::Response(proto::pack(
                proto::ANNOTATE_VIDEO_RESPONSE,
                &pb::AnnotateVideoResponse::default(),
            ))),
        };
        let op = handle(raw, idle_transport());
        assert!(op.done());
        assert_eq!(op.wait().await?, AnnotateVideoResponse::default());
        Ok(())
    }

    #[tokio::test]
    async fn done_without_result_is_error() {
        let raw = RawOperation {
            name: "operations/2".to_string(),
            done: true,
            ..Default::default()
        };
        let err = handle(raw, idle_transport()).wait().await.unwrap_err();
        assert!(matches!(err, Error::MissingResult(name) if name == "operations/2"));
    }

    #[tokio::test]
    async fn failed_operation_keeps_status() {
        let raw = RawOperation {
            name: "operations/3".to_string(),
            done: true,
            result: Some(operation::Result::Error(rpc::Status {
                code: 7,
                message: "denied".to_string(),
                details: vec![],
            })),
            ..Default::default()
        };
        let err = handle(raw, idle_transport()).wait().await.unwrap_err();
        assert_eq!(err.code(), Some(tonic::Code::PermissionDenied));
    }

    #[tokio::test]
    async fn polls_until_done_and_reports_metadata() -> eyre::Result<()> {
        let request = AnnotateVideoRequest::new("gs://bucket/video.mp4", [Feature::LabelDetection]);
        let progress = AnnotateVideoProgress {
            annotation_progress: vec![VideoAnnotationProgress {
                input_uri: "/bucket/video.mp4".to_string(),
                progress_percent: 100,
                ..Default::default()
            }],
        };
        let mock = Arc::new(
            MockTransport::long_running(request.clone(), AnnotateVideoResponse::default())
                .with_pending_polls(3)
                .with_progress(&progress),
        );

        let raw = mock.annotate_video(request).await?;
        let op = handle(raw, mock.clone());
        assert!(!op.done());
        assert!(op.result().is_none());

        let (response, metadata) = op.wait_with_metadata().await?;
        assert_eq!(response, AnnotateVideoResponse::default());
        assert_eq!(metadata, Some(progress));
        assert_eq!(mock.polls(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_after_settlement_is_noop() -> eyre::Result<()> {
        let request = AnnotateVideoRequest::new("gs://bucket/video.mp4", [Feature::LabelDetection]);
        let mock = Arc::new(MockTransport::long_running(
            request.clone(),
            AnnotateVideoResponse::default(),
        ));
        let raw = mock.annotate_video(request).await?;
        let mut op = handle(raw, mock.clone());
        op.refresh().await?;
        op.refresh().await?;
        assert_eq!(mock.polls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn gives_up_after_total_timeout() -> eyre::Result<()> {
        let request = AnnotateVideoRequest::new("gs://bucket/video.mp4", [Feature::LabelDetection]);
        let mock = Arc::new(
            MockTransport::long_running(request.clone(), AnnotateVideoResponse::default())
                .with_pending_polls(usize::MAX),
        );
        let raw = mock.annotate_video(request).await?;
        let op = Operation::new(
            raw,
            mock.clone() as Arc<dyn Transport>,
            Descriptors::default().longrunning.annotate_video,
            Duration::from_millis(5),
            Duration::from_millis(30),
        );
        let name = op.name().to_string();
        let err = op.wait().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(n) if n == name));
        assert!(mock.polls() >= 1);
        Ok(())
    }

    #[tokio::test]
    async fn unbounded_total_timeout_still_settles() -> eyre::Result<()> {
        let request = AnnotateVideoRequest::new("gs://bucket/video.mp4", [Feature::LabelDetection]);
        let mock = Arc::new(
            MockTransport::long_running(request.clone(), AnnotateVideoResponse::default())
                .with_pending_polls(1),
        );
        let raw = mock.annotate_video(request).await?;
        let op = Operation::new(
            raw,
            mock.clone() as Arc<dyn Transport>,
            Descriptors::default().longrunning.annotate_video,
            Duration::from_millis(5),
            Duration::MAX,
        );
        assert_eq!(op.wait().await?, AnnotateVideoResponse::default());
        assert_eq!(mock.polls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn cancel_and_delete_reach_transport() -> eyre::Result<()> {
        let request = AnnotateVideoRequest::new("gs://bucket/video.mp4", [Feature::LabelDetection]);
        let mock = Arc::new(
            MockTransport::long_running(request.clone(), AnnotateVideoResponse::default())
                .with_pending_polls(1),
        );
        let raw = mock.annotate_video(request).await?;
        let op = handle(raw, mock.clone());
        op.cancel().await?;
        op.delete().await?;
        assert_eq!(mock.cancelled(), vec![op.name().to_string()]);
        assert_eq!(mock.deleted(), vec![op.name().to_string()]);
        Ok(())
    }
}
