//! Generated protobuf messages and tonic stubs, plus the small amount of glue
//! needed to move `google.protobuf.Any` and `google.rpc.Status` values around.

#[allow(clippy::all)]
pub mod google {
    pub mod rpc {
        tonic::include_proto!("google.rpc");
    }

    pub mod longrunning {
        tonic::include_proto!("google.longrunning");
    }

    pub mod cloud {
        pub mod videointelligence {
            pub mod v1 {
                tonic::include_proto!("google.cloud.videointelligence.v1");
            }
        }
    }
}

pub use google::cloud::videointelligence::v1 as videointelligence;
pub use google::longrunning;
pub use google::rpc;

/// Wire form of a long-running operation as returned by every transport.
pub type RawOperation = longrunning::Operation;

pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

pub const VIDEO_INTELLIGENCE_SERVICE: &str =
    "google.cloud.videointelligence.v1.VideoIntelligenceService";
pub const OPERATIONS_SERVICE: &str = "google.longrunning.Operations";

pub const ANNOTATE_VIDEO_RESPONSE: &str = "google.cloud.videointelligence.v1.AnnotateVideoResponse";
pub const ANNOTATE_VIDEO_PROGRESS: &str = "google.cloud.videointelligence.v1.AnnotateVideoProgress";

/// Wrap `message` into an `Any` tagged with its fully qualified type name.
pub fn pack<M: prost::Message>(type_name: &str, message: &M) -> prost_types::Any {
    prost_types::Any {
        type_url: format!("{TYPE_URL_PREFIX}{type_name}"),
        value: message.encode_to_vec(),
    }
}

/// Message name part of a type URL (`type.googleapis.com/a.b.C` -> `a.b.C`).
pub fn type_name(type_url: &str) -> &str {
    type_url.rsplit('/').next().unwrap_or(type_url)
}

impl From<rpc::Status> for tonic::Status {
    fn from(status: rpc::Status) -> Self {
        tonic::Status::new(tonic::Code::from(status.code), status.message)
    }
}

impl From<&tonic::Status> for rpc::Status {
    fn from(status: &tonic::Status) -> Self {
        rpc::Status {
            code: status.code() as i32,
            message: status.message().to_string(),
            details: Vec::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("type.googleapis.com/a.b.C", "a.b.C"; "google prefix")]
    #[test_case("example.com/x/y/a.b.C", "a.b.C"; "nested prefix")]
    #[test_case("a.b.C", "a.b.C"; "bare name")]
    fn type_name_strips_prefix(url: &str, expected: &str) {
        assert_eq!(type_name(url), expected);
    }

    #[test]
    fn status_code_survives_conversion() {
        let status: tonic::Status = rpc::Status {
            code: 1,
            message: "cancelled".to_string(),
            details: vec![],
        }
        .into();
        assert_eq!(status.code(), tonic::Code::Cancelled);
        assert_eq!(rpc::Status::from(&status).code, 1);
    }
}
