//! # Request and Response Types
//!
//! Typed counterparts of the `google.cloud.videointelligence.v1` messages used by
//! `AnnotateVideo`. Requests are converted into protobuf before they reach a
//! transport; responses and progress metadata are decoded from protobuf by the
//! long-running descriptors in [`crate::descriptor`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::proto::{rpc, videointelligence as pb};
use crate::{Error, Result};

/// Video annotation feature.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Feature {
    LabelDetection,
    ShotChangeDetection,
    ExplicitContentDetection,
    FaceDetection,
    SpeechTranscription,
    TextDetection,
    ObjectTracking,
    LogoRecognition,
    PersonDetection,
}

impl From<Feature> for pb::Feature {
    fn from(feature: Feature) -> Self {
        match feature {
            Feature::LabelDetection => pb::Feature::LabelDetection,
            Feature::ShotChangeDetection => pb::Feature::ShotChangeDetection,
            Feature::ExplicitContentDetection => pb::Feature::ExplicitContentDetection,
            Feature::FaceDetection => pb::Feature::FaceDetection,
            Feature::SpeechTranscription => pb::Feature::SpeechTranscription,
            Feature::TextDetection => pb::Feature::TextDetection,
            Feature::ObjectTracking => pb::Feature::ObjectTracking,
            Feature::LogoRecognition => pb::Feature::LogoRecognition,
            Feature::PersonDetection => pb::Feature::PersonDetection,
        }
    }
}

impl Feature {
    /// Map a wire enum value back to a feature. Unknown and unspecified values yield `None`.
    pub fn from_wire(value: i32) -> Option<Feature> {
        match pb::Feature::try_from(value).ok()? {
            pb::Feature::Unspecified => None,
            pb::Feature::LabelDetection => Some(Feature::LabelDetection),
            pb::Feature::ShotChangeDetection => Some(Feature::ShotChangeDetection),
            pb::Feature::ExplicitContentDetection => Some(Feature::ExplicitContentDetection),
            pb::Feature::FaceDetection => Some(Feature::FaceDetection),
            pb::Feature::SpeechTranscription => Some(Feature::SpeechTranscription),
            pb::Feature::TextDetection => Some(Feature::TextDetection),
            pb::Feature::ObjectTracking => Some(Feature::ObjectTracking),
            pb::Feature::LogoRecognition => Some(Feature::LogoRecognition),
            pb::Feature::PersonDetection => Some(Feature::PersonDetection),
        }
    }
}

/// Input of `AnnotateVideo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateVideoRequest {
    /// Requested annotation features.
    pub features: Vec<Feature>,
    /// Input video location, e.g. `gs://bucket/video.mp4`.
    #[serde(default)]
    pub input_uri: String,
    /// Inline video bytes, mutually exclusive with `input_uri`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_content: Option<Vec<u8>>,
    /// Where the service writes the annotation results as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_uri: Option<String>,
    /// Cloud region where annotation should take place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
}

impl AnnotateVideoRequest {
    pub fn new(input_uri: impl Into<String>, features: impl IntoIterator<Item = Feature>) -> Self {
        AnnotateVideoRequest {
            features: features.into_iter().collect(),
            input_uri: input_uri.into(),
            ..Default::default()
        }
    }

    pub fn from_content(
        content: impl Into<Vec<u8>>,
        features: impl IntoIterator<Item = Feature>,
    ) -> Self {
        AnnotateVideoRequest {
            features: features.into_iter().collect(),
            input_content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn with_output_uri(mut self, output_uri: impl Into<String>) -> Self {
        self.output_uri = Some(output_uri.into());
        self
    }

    pub fn with_location_id(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    /// Check the structural constraints the service would otherwise reject.
    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(Error::InvalidRequest(
                "at least one feature must be requested".to_string(),
            ));
        }
        let has_content = self.input_content.as_ref().is_some_and(|c| !c.is_empty());
        match (self.input_uri.is_empty(), has_content) {
            (true, false) => Err(Error::InvalidRequest(
                "either input_uri or input_content must be set".to_string(),
            )),
            (false, true) => Err(Error::InvalidRequest(
                "input_uri and input_content are mutually exclusive".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl From<&AnnotateVideoRequest> for pb::AnnotateVideoRequest {
    fn from(request: &AnnotateVideoRequest) -> Self {
        pb::AnnotateVideoRequest {
            input_uri: request.input_uri.clone(),
            input_content: request.input_content.clone().unwrap_or_default(),
            features: request
                .features
                .iter()
                .map(|f| pb::Feature::from(*f) as i32)
                .collect(),
            output_uri: request.output_uri.clone().unwrap_or_default(),
            location_id: request.location_id.clone().unwrap_or_default(),
        }
    }
}

impl TryFrom<pb::AnnotateVideoRequest> for AnnotateVideoRequest {
    type Error = Error;

    fn try_from(request: pb::AnnotateVideoRequest) -> Result<Self> {
        let features = request
            .features
            .iter()
            .map(|value| {
                Feature::from_wire(*value)
                    .ok_or_else(|| Error::InvalidRequest(format!("unknown feature {value}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AnnotateVideoRequest {
            features,
            input_uri: request.input_uri,
            input_content: non_empty(request.input_content),
            output_uri: non_empty_str(request.output_uri),
            location_id: non_empty_str(request.location_id),
        })
    }
}

fn non_empty(bytes: Vec<u8>) -> Option<Vec<u8>> {
    (!bytes.is_empty()).then_some(bytes)
}

fn non_empty_str(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Final payload of a finished `AnnotateVideo` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotateVideoResponse {
    pub annotation_results: Vec<VideoAnnotationResults>,
}

/// Annotation results for a single video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoAnnotationResults {
    pub input_uri: String,
    pub segment: Option<VideoSegment>,
    pub segment_label_annotations: Vec<LabelAnnotation>,
    pub shot_label_annotations: Vec<LabelAnnotation>,
    pub shot_annotations: Vec<VideoSegment>,
    /// Set when this particular video failed while others succeeded.
    pub error: Option<ErrorStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorStatus {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelAnnotation {
    pub entity: Option<Entity>,
    pub category_entities: Vec<Entity>,
    pub segments: Vec<LabelSegment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    pub description: String,
    pub language_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelSegment {
    pub segment: Option<VideoSegment>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSegment {
    #[serde(with = "humantime_serde")]
    pub start_time_offset: Duration,
    #[serde(with = "humantime_serde")]
    pub end_time_offset: Duration,
}

/// Progress metadata reported while `AnnotateVideo` runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotateVideoProgress {
    pub annotation_progress: Vec<VideoAnnotationProgress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoAnnotationProgress {
    pub input_uri: String,
    /// Approximate percentage processed thus far, 100 when fully processed.
    pub progress_percent: i32,
    pub start_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    pub feature: Option<Feature>,
    pub segment: Option<VideoSegment>,
}

fn duration_from_wire(d: Option<prost_types::Duration>) -> Duration {
    d.and_then(|d| Duration::try_from(d).ok()).unwrap_or_default()
}

fn duration_to_wire(d: Duration) -> Option<prost_types::Duration> {
    Some(prost_types::Duration {
        seconds: d.as_secs() as i64,
        nanos: d.subsec_nanos() as i32,
    })
}

fn timestamp_from_wire(ts: Option<prost_types::Timestamp>) -> Option<DateTime<Utc>> {
    let ts = ts?;
    DateTime::from_timestamp(ts.seconds, u32::try_from(ts.nanos).ok()?)
}

fn timestamp_to_wire(dt: Option<DateTime<Utc>>) -> Option<prost_types::Timestamp> {
    dt.map(|dt| prost_types::Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    })
}

impl From<pb::VideoSegment> for VideoSegment {
    fn from(segment: pb::VideoSegment) -> Self {
        VideoSegment {
            start_time_offset: duration_from_wire(segment.start_time_offset),
            end_time_offset: duration_from_wire(segment.end_time_offset),
        }
    }
}

impl From<&VideoSegment> for pb::VideoSegment {
    fn from(segment: &VideoSegment) -> Self {
        pb::VideoSegment {
            start_time_offset: duration_to_wire(segment.start_time_offset),
            end_time_offset: duration_to_wire(segment.end_time_offset),
        }
    }
}

impl From<pb::Entity> for Entity {
    fn from(entity: pb::Entity) -> Self {
        Entity {
            entity_id: entity.entity_id,
            description: entity.description,
            language_code: entity.language_code,
        }
    }
}

impl From<&Entity> for pb::Entity {
    fn from(entity: &Entity) -> Self {
        pb::Entity {
            entity_id: entity.entity_id.clone(),
            description: entity.description.clone(),
            language_code: entity.language_code.clone(),
        }
    }
}

impl From<pb::LabelSegment> for LabelSegment {
    fn from(segment: pb::LabelSegment) -> Self {
        LabelSegment {
            segment: segment.segment.map(Into::into),
            confidence: segment.confidence,
        }
    }
}

impl From<&LabelSegment> for pb::LabelSegment {
    fn from(segment: &LabelSegment) -> Self {
        pb::LabelSegment {
            segment: segment.segment.as_ref().map(Into::into),
            confidence: segment.confidence,
        }
    }
}

impl From<pb::LabelAnnotation> for LabelAnnotation {
    fn from(annotation: pb::LabelAnnotation) -> Self {
        LabelAnnotation {
            entity: annotation.entity.map(Into::into),
            category_entities: annotation
                .category_entities
                .into_iter()
                .map(Into::into)
                .collect(),
            segments: annotation.segments.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<&LabelAnnotation> for pb::LabelAnnotation {
    fn from(annotation: &LabelAnnotation) -> Self {
        pb::LabelAnnotation {
            entity: annotation.entity.as_ref().map(Into::into),
            category_entities: annotation.category_entities.iter().map(Into::into).collect(),
            segments: annotation.segments.iter().map(Into::into).collect(),
        }
    }
}

impl From<rpc::Status> for ErrorStatus {
    fn from(status: rpc::Status) -> Self {
        ErrorStatus {
            code: status.code,
            message: status.message,
        }
    }
}

impl From<pb::VideoAnnotationResults> for VideoAnnotationResults {
    fn from(results: pb::VideoAnnotationResults) -> Self {
        VideoAnnotationResults {
            input_uri: results.input_uri,
            segment: results.segment.map(Into::into),
            segment_label_annotations: results
                .segment_label_annotations
                .into_iter()
                .map(Into::into)
                .collect(),
            shot_label_annotations: results
                .shot_label_annotations
                .into_iter()
                .map(Into::into)
                .collect(),
            shot_annotations: results.shot_annotations.into_iter().map(Into::into).collect(),
            error: results.error.map(Into::into),
        }
    }
}

impl From<&VideoAnnotationResults> for pb::VideoAnnotationResults {
    fn from(results: &VideoAnnotationResults) -> Self {
        pb::VideoAnnotationResults {
            input_uri: results.input_uri.clone(),
            segment: results.segment.as_ref().map(Into::into),
            segment_label_annotations: results
                .segment_label_annotations
                .iter()
                .map(Into::into)
                .collect(),
            shot_label_annotations: results
                .shot_label_annotations
                .iter()
                .map(Into::into)
                .collect(),
            shot_annotations: results.shot_annotations.iter().map(Into::into).collect(),
            error: results.error.as_ref().map(|e| rpc::Status {
                code: e.code,
                message: e.message.clone(),
                details: Vec::new(),
            }),
        }
    }
}

impl From<pb::AnnotateVideoResponse> for AnnotateVideoResponse {
    fn from(response: pb::AnnotateVideoResponse) -> Self {
        AnnotateVideoResponse {
            annotation_results: response
                .annotation_results
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

impl From<&AnnotateVideoResponse> for pb::AnnotateVideoResponse {
    fn from(response: &AnnotateVideoResponse) -> Self {
        pb::AnnotateVideoResponse {
            annotation_results: response.annotation_results.iter().map(Into::into).collect(),
        }
    }
}

impl From<pb::VideoAnnotationProgress> for VideoAnnotationProgress {
    fn from(progress: pb::VideoAnnotationProgress) -> Self {
        VideoAnnotationProgress {
            input_uri: progress.input_uri,
            progress_percent: progress.progress_percent,
            start_time: timestamp_from_wire(progress.start_time),
            update_time: timestamp_from_wire(progress.update_time),
            feature: Feature::from_wire(progress.feature),
            segment: progress.segment.map(Into::into),
        }
    }
}

impl From<&VideoAnnotationProgress> for pb::VideoAnnotationProgress {
    fn from(progress: &VideoAnnotationProgress) -> Self {
        pb::VideoAnnotationProgress {
            input_uri: progress.input_uri.clone(),
            progress_percent: progress.progress_percent,
            start_time: timestamp_to_wire(progress.start_time),
            update_time: timestamp_to_wire(progress.update_time),
            feature: progress
                .feature
                .map(|f| pb::Feature::from(f) as i32)
                .unwrap_or_default(),
            segment: progress.segment.as_ref().map(Into::into),
        }
    }
}

impl From<pb::AnnotateVideoProgress> for AnnotateVideoProgress {
    fn from(progress: pb::AnnotateVideoProgress) -> Self {
        AnnotateVideoProgress {
            annotation_progress: progress
                .annotation_progress
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

impl From<&AnnotateVideoProgress> for pb::AnnotateVideoProgress {
    fn from(progress: &AnnotateVideoProgress) -> Self {
        pb::AnnotateVideoProgress {
            annotation_progress: progress.annotation_progress.iter().map(Into::into).collect(),
        }
    }
}
