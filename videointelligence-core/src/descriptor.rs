//! Long-running method descriptors.
//!
//! Every long-running RPC returns a `google.longrunning.Operation` whose
//! `response` and `metadata` are `Any` values. The descriptor of a method knows
//! the message types hiding inside those `Any`s and how to decode their bytes.

use prost::Message;
use std::fmt;

use crate::proto::{self, videointelligence as pb};
use crate::types::{AnnotateVideoProgress, AnnotateVideoResponse};
use crate::{Error, Result};

/// Turns raw protobuf bytes into a typed value.
pub type Decoder<T> = fn(&[u8]) -> Result<T>;

/// Decoders for the final response and the progress metadata of one method.
pub struct LongRunningDescriptor<R, M> {
    /// Fully qualified protobuf name of the final response.
    pub response_type: &'static str,
    /// Fully qualified protobuf name of the progress metadata.
    pub metadata_type: &'static str,
    pub response_decoder: Decoder<R>,
    pub metadata_decoder: Decoder<M>,
}

impl<R, M> Clone for LongRunningDescriptor<R, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, M> Copy for LongRunningDescriptor<R, M> {}

impl<R, M> fmt::Debug for LongRunningDescriptor<R, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LongRunningDescriptor")
            .field("response_type", &self.response_type)
            .field("metadata_type", &self.metadata_type)
            .finish_non_exhaustive()
    }
}

impl<R, M> LongRunningDescriptor<R, M> {
    /// Decode the operation's final response, checking the `Any` type first.
    pub fn unpack_response(&self, any: &prost_types::Any) -> Result<R> {
        check_type(self.response_type, any)?;
        (self.response_decoder)(&any.value)
    }

    /// Decode the operation's progress metadata, checking the `Any` type first.
    pub fn unpack_metadata(&self, any: &prost_types::Any) -> Result<M> {
        check_type(self.metadata_type, any)?;
        (self.metadata_decoder)(&any.value)
    }
}

fn check_type(expected: &str, any: &prost_types::Any) -> Result<()> {
    let actual = proto::type_name(&any.type_url);
    if actual != expected {
        return Err(Error::UnexpectedType {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Type-erased view of a descriptor, for code that walks every long-running method.
pub trait LongRunningMethod: Send + Sync {
    fn response_type(&self) -> &'static str;
    fn metadata_type(&self) -> &'static str;
    fn decode_response(&self, bytes: &[u8]) -> Result<Box<dyn fmt::Debug + Send>>;
    fn decode_metadata(&self, bytes: &[u8]) -> Result<Box<dyn fmt::Debug + Send>>;
}

impl<R, M> LongRunningMethod for LongRunningDescriptor<R, M>
where
    R: fmt::Debug + Send + 'static,
    M: fmt::Debug + Send + 'static,
{
    fn response_type(&self) -> &'static str {
        self.response_type
    }

    fn metadata_type(&self) -> &'static str {
        self.metadata_type
    }

    fn decode_response(&self, bytes: &[u8]) -> Result<Box<dyn fmt::Debug + Send>> {
        Ok(Box::new((self.response_decoder)(bytes)?))
    }

    fn decode_metadata(&self, bytes: &[u8]) -> Result<Box<dyn fmt::Debug + Send>> {
        Ok(Box::new((self.metadata_decoder)(bytes)?))
    }
}

fn decode_annotate_video_response(bytes: &[u8]) -> Result<AnnotateVideoResponse> {
    Ok(pb::AnnotateVideoResponse::decode(bytes)?.into())
}

fn decode_annotate_video_progress(bytes: &[u8]) -> Result<AnnotateVideoProgress> {
    Ok(pb::AnnotateVideoProgress::decode(bytes)?.into())
}

/// Descriptors of every long-running method of `VideoIntelligenceService`.
#[derive(Debug, Clone, Copy)]
pub struct LongRunningDescriptors {
    pub annotate_video: LongRunningDescriptor<AnnotateVideoResponse, AnnotateVideoProgress>,
}

impl Default for LongRunningDescriptors {
    fn default() -> Self {
        LongRunningDescriptors {
            annotate_video: LongRunningDescriptor {
                response_type: proto::ANNOTATE_VIDEO_RESPONSE,
                metadata_type: proto::ANNOTATE_VIDEO_PROGRESS,
                response_decoder: decode_annotate_video_response,
                metadata_decoder: decode_annotate_video_progress,
            },
        }
    }
}

impl LongRunningDescriptors {
    /// Iterate `(method name, descriptor)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &dyn LongRunningMethod)> {
        [("annotateVideo", &self.annotate_video as &dyn LongRunningMethod)].into_iter()
    }
}

/// All descriptors held by a client.
#[derive(Debug, Clone, Copy, Default)]
pub struct Descriptors {
    pub longrunning: LongRunningDescriptors,
}
