use pretty_assertions::assert_eq;
use prost::Message;
use std::time::Duration;
use videointelligence_core::{
    proto::{self, longrunning::operation, rpc, videointelligence as pb, RawOperation},
    AnnotateVideoRequest, AnnotateVideoResponse, ClientConfig, Error, Feature,
    VideoIntelligenceServiceClient,
};

const ANNOTATE_PATH: &str =
    "/$rpc/google.cloud.videointelligence.v1.VideoIntelligenceService/AnnotateVideo";
const GET_OPERATION_PATH: &str = "/$rpc/google.longrunning.Operations/GetOperation";
const PROTOBUF: &str = "application/x-protobuf";

fn client_for(server: &mockito::ServerGuard) -> VideoIntelligenceServiceClient {
    let host_with_port = server.host_with_port();
    let (host, port) = host_with_port
        .rsplit_once(':')
        .expect("mockito address has a port");
    VideoIntelligenceServiceClient::with_config(
        ClientConfig::default()
            .with_fallback(true)
            .with_endpoint(host, port.parse().expect("numeric port"))
            .with_insecure(true)
            .with_project_id("bogus")
            .with_poll_interval(Duration::from_millis(5)),
    )
}

fn cat_request() -> AnnotateVideoRequest {
    AnnotateVideoRequest::new(
        "gs://cloud-samples-data/video/cat.mp4",
        [Feature::LabelDetection],
    )
}

fn done_operation(name: &str) -> RawOperation {
    RawOperation {
        name: name.to_string(),
        metadata: None,
        done: true,
        result: Some(operation::Result::Response(proto::pack(
            proto::ANNOTATE_VIDEO_RESPONSE,
            &pb::AnnotateVideoResponse::default(),
        ))),
    }
}

#[tokio::test]
async fn fallback_annotate_video_without_error() -> eyre::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", ANNOTATE_PATH)
        .match_header("content-type", PROTOBUF)
        .match_header("x-goog-user-project", "bogus")
        .with_status(200)
        .with_header("content-type", PROTOBUF)
        .with_body(done_operation("operations/42").encode_to_vec())
        .expect(1)
        .create_async()
        .await;

    let operation = client_for(&server).annotate_video(cat_request()).await?;
    assert_eq!(operation.name(), "operations/42");
    assert_eq!(operation.wait().await?, AnnotateVideoResponse::default());

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn fallback_polls_get_operation() -> eyre::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let pending = RawOperation {
        name: "operations/7".to_string(),
        ..Default::default()
    };
    let annotate = server
        .mock("POST", ANNOTATE_PATH)
        .with_header("content-type", PROTOBUF)
        .with_body(pending.encode_to_vec())
        .create_async()
        .await;
    let get = server
        .mock("POST", GET_OPERATION_PATH)
        .with_header("content-type", PROTOBUF)
        .with_body(done_operation("operations/7").encode_to_vec())
        .expect(1)
        .create_async()
        .await;

    let operation = client_for(&server).annotate_video(cat_request()).await?;
    assert!(!operation.done());
    operation.wait().await?;

    annotate.assert_async().await;
    get.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn fallback_status_body_keeps_code() {
    let mut server = mockito::Server::new_async().await;
    let status = rpc::Status {
        code: 1,
        message: "cancelled".to_string(),
        details: vec![],
    };
    server
        .mock("POST", ANNOTATE_PATH)
        .with_status(499)
        .with_header("content-type", PROTOBUF)
        .with_body(status.encode_to_vec())
        .create_async()
        .await;

    let err = client_for(&server)
        .annotate_video(cat_request())
        .await
        .expect_err("call should fail");

    assert!(matches!(err, Error::Rpc(_)));
    assert_eq!(err.code().map(|c| c as i32), Some(1));
    assert_eq!(err.status().map(|s| s.message()), Some("cancelled"));
}

#[tokio::test]
async fn fallback_plain_http_error_maps_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", GET_OPERATION_PATH)
        .with_status(404)
        .with_header("content-type", "text/plain")
        .with_body("no such operation")
        .create_async()
        .await;

    let err = client_for(&server)
        .get_operation("operations/unknown")
        .await
        .expect_err("missing operation");

    assert_eq!(err.code(), Some(tonic::Code::NotFound));
    assert_eq!(err.status().map(|s| s.message()), Some("no such operation"));
}

#[tokio::test]
async fn fallback_cancel_operation() -> eyre::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/$rpc/google.longrunning.Operations/CancelOperation")
        .with_header("content-type", PROTOBUF)
        .with_body(Vec::<u8>::new())
        .expect(1)
        .create_async()
        .await;

    client_for(&server).cancel_operation("operations/7").await?;

    mock.assert_async().await;
    Ok(())
}
