use clap::{value_parser, Arg, ArgAction, ArgMatches, Command as ClapCommand};
use console::Term;
use eyre::WrapErr;
use itertools::Itertools;
use serde_json::json;
use std::{io::Write, str::FromStr};
use strum::IntoEnumIterator;
use tracing::*;
use tracing_subscriber::EnvFilter;
use videointelligence_core::{
    AnnotateVideoOperation, AnnotateVideoRequest, ClientConfig, Feature,
    VideoIntelligenceServiceClient,
};

/// Build the CLI with clap's builder pattern
fn build_cli() -> ClapCommand {
    let features = Feature::iter().join(", ");
    ClapCommand::new("videointelligence")
        .about("Annotate videos with the Video Intelligence API and manage the resulting operations")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg(Arg::new("fallback")
            .long("fallback")
            .help("Use the HTTP/1.1 protobuf fallback instead of gRPC")
            .global(true)
            .action(ArgAction::SetTrue))
        .arg(Arg::new("project-id")
            .long("project-id")
            .help("Project billed for the request")
            .env("VIDEOINTELLIGENCE_PROJECT_ID")
            .global(true))
        .arg(Arg::new("log-level")
            .long("log-level")
            .help("Log level filter, used when RUST_LOG is unset")
            .global(true)
            .default_value("info"))
        .subcommand(
            ClapCommand::new("annotate")
                .about("Start annotating a video and wait for the result")
                .arg(Arg::new("input-uri")
                    .help("Input video location, e.g. gs://bucket/video.mp4")
                    .required(true))
                .arg(Arg::new("features")
                    .short('f')
                    .long("features")
                    .help(format!("Features to detect in comma-separated string. [possible values: {features}]"))
                    .value_delimiter(',')
                    .default_value("LABEL_DETECTION")
                    .action(ArgAction::Append))
                .arg(Arg::new("output-uri")
                    .long("output-uri")
                    .help("Also write the results as JSON to this Cloud Storage location"))
                .arg(Arg::new("location-id")
                    .long("location-id")
                    .help("Cloud region where annotation should take place"))
                .arg(Arg::new("no-wait")
                    .long("no-wait")
                    .help("Print the operation name and exit without waiting")
                    .action(ArgAction::SetTrue))
        )
        .subcommand(
            ClapCommand::new("operation")
                .about("Inspect or manage an annotation operation")
                .subcommand_required(true)
                .subcommand(ClapCommand::new("get")
                    .about("Show the state of an operation")
                    .arg(Arg::new("name").required(true)))
                .subcommand(ClapCommand::new("wait")
                    .about("Wait for an operation and print its result")
                    .arg(Arg::new("name").required(true))
                    .arg(Arg::new("poll-interval")
                        .long("poll-interval")
                        .help("Seconds between polls")
                        .value_parser(value_parser!(u64))))
                .subcommand(ClapCommand::new("cancel")
                    .about("Request cancellation of an operation")
                    .arg(Arg::new("name").required(true)))
                .subcommand(ClapCommand::new("delete")
                    .about("Delete an operation")
                    .arg(Arg::new("name").required(true)))
        )
        .subcommand(
            ClapCommand::new("info")
                .about("Show the service endpoint and resolved configuration")
        )
}

/// videointelligence CLI.
#[derive(Default)]
pub struct App {
    client: Option<VideoIntelligenceServiceClient>,
}

impl App {
    pub fn new() -> App {
        App { client: None }
    }

    /// Use `client` instead of one built from configuration and flags.
    pub fn with_client(client: VideoIntelligenceServiceClient) -> App {
        App {
            client: Some(client),
        }
    }

    /// Parse command-line args and run the sub command.
    pub async fn run(self) -> eyre::Result<()> {
        color_eyre::install()?;
        let matches = build_cli().get_matches();
        init_tracing(&matches);

        let mut term = Term::stdout();
        self.execute(&matches, &mut term).await
    }

    /// Run the sub command selected by `matches`, writing its output to `out`.
    pub async fn execute(self, matches: &ArgMatches, out: &mut impl Write) -> eyre::Result<()> {
        let client = match self.client {
            Some(client) => client,
            None => build_client(matches)?,
        };
        debug!(config = ?client.config(), "client ready");

        match matches.subcommand() {
            Some(("annotate", annotate_matches)) => {
                let request = annotate_request(annotate_matches)?;
                let operation = client.annotate_video(request).await?;
                info!(name = %operation.name(), "annotation accepted");
                if annotate_matches.get_flag("no-wait") {
                    writeln!(out, "{}", serde_json::to_string_pretty(&summary(&operation))?)?;
                    return Ok(());
                }
                let name = operation.name().to_string();
                let response = operation
                    .wait()
                    .await
                    .wrap_err_with(|| format!("operation {name} failed"))?;
                writeln!(out, "{}", serde_json::to_string_pretty(&response)?)?;
                Ok(())
            }
            Some(("operation", operation_matches)) => match operation_matches.subcommand() {
                Some(("get", m)) => {
                    let operation = client
                        .check_annotate_video_progress(required(m, "name")?)
                        .await?;
                    writeln!(out, "{}", serde_json::to_string_pretty(&summary(&operation))?)?;
                    Ok(())
                }
                Some(("wait", m)) => {
                    let name = required(m, "name")?;
                    let response = client
                        .check_annotate_video_progress(name)
                        .await?
                        .wait()
                        .await
                        .wrap_err_with(|| format!("operation {name} failed"))?;
                    writeln!(out, "{}", serde_json::to_string_pretty(&response)?)?;
                    Ok(())
                }
                Some(("cancel", m)) => {
                    let name = required(m, "name")?;
                    client.cancel_operation(name).await?;
                    writeln!(out, "cancellation requested for {name}")?;
                    Ok(())
                }
                Some(("delete", m)) => {
                    let name = required(m, "name")?;
                    client.delete_operation(name).await?;
                    writeln!(out, "deleted {name}")?;
                    Ok(())
                }
                _ => unreachable!("Subcommand required is set to true"),
            },
            Some(("info", _)) => {
                let config = client.config();
                let info = json!({
                    "servicePath": VideoIntelligenceServiceClient::service_path(),
                    "apiEndpoint": config
                        .api_endpoint
                        .as_deref()
                        .unwrap_or(VideoIntelligenceServiceClient::api_endpoint()),
                    "port": config.port.unwrap_or(VideoIntelligenceServiceClient::port()),
                    "transport": if config.fallback { "http-fallback" } else { "grpc" },
                    "projectId": client.project_id(),
                    "serviceAccount": config.credentials.as_ref().map(|c| c.client_email.as_str()),
                });
                writeln!(out, "{}", serde_json::to_string_pretty(&info)?)?;
                Ok(())
            }
            _ => unreachable!("Subcommand required is set to true"),
        }
    }
}

fn init_tracing(matches: &ArgMatches) {
    let level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_client(matches: &ArgMatches) -> eyre::Result<VideoIntelligenceServiceClient> {
    let mut config = ClientConfig::load()?;
    if matches.get_flag("fallback") {
        config.fallback = true;
    }
    if let Some(project_id) = matches.get_one::<String>("project-id") {
        config.project_id = Some(project_id.clone());
    }
    if let Some(("operation", op)) = matches.subcommand() {
        if let Some(("wait", m)) = op.subcommand() {
            if let Some(secs) = m.get_one::<u64>("poll-interval") {
                config.poll_interval = std::time::Duration::from_secs(*secs);
            }
        }
    }
    Ok(VideoIntelligenceServiceClient::with_config(
        config.resolve_ambient()?,
    ))
}

fn annotate_request(matches: &ArgMatches) -> eyre::Result<AnnotateVideoRequest> {
    let features = matches
        .get_many::<String>("features")
        .into_iter()
        .flatten()
        .map(|f| {
            Feature::from_str(f.trim()).map_err(|_| eyre::eyre!("Unknown feature: {f}"))
        })
        .collect::<eyre::Result<Vec<_>>>()?;

    let mut request = AnnotateVideoRequest::new(required(matches, "input-uri")?, features);
    if let Some(output_uri) = matches.get_one::<String>("output-uri") {
        request = request.with_output_uri(output_uri);
    }
    if let Some(location_id) = matches.get_one::<String>("location-id") {
        request = request.with_location_id(location_id);
    }
    Ok(request)
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> eyre::Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| eyre::eyre!("missing argument <{id}>"))
}

fn summary(operation: &AnnotateVideoOperation) -> serde_json::Value {
    let progress = operation.metadata().ok().flatten();
    let mut value = json!({
        "name": operation.name(),
        "done": operation.done(),
        "progress": progress,
    });
    if let Some(result) = operation.result() {
        value["result"] = match result {
            Ok(response) => json!({ "response": response }),
            Err(e) => json!({
                "error": {
                    "code": e.code().map(|c| c as i32),
                    "message": e.to_string(),
                }
            }),
        };
    }
    value
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use test_case::test_case;
    use videointelligence_core::{AnnotateVideoResponse, MockTransport};

    fn cat_request() -> AnnotateVideoRequest {
        AnnotateVideoRequest::new(
            "gs://cloud-samples-data/video/cat.mp4",
            [Feature::LabelDetection],
        )
    }

    fn mock_app(transport: Arc<MockTransport>) -> App {
        App::with_client(VideoIntelligenceServiceClient::with_transport(
            ClientConfig::default()
                .with_project_id("bogus")
                .with_poll_interval(std::time::Duration::from_millis(5)),
            transport,
        ))
    }

    async fn run(app: App, args: &[&str]) -> eyre::Result<String> {
        let matches = build_cli().try_get_matches_from(args)?;
        let mut out = Vec::new();
        app.execute(&matches, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn cli_is_well_formed() {
        build_cli().debug_assert();
    }

    #[test]
    fn log_level_defaults_to_info() -> eyre::Result<()> {
        let matches = build_cli().try_get_matches_from(["videointelligence", "info"])?;
        assert_eq!(
            matches.get_one::<String>("log-level").map(String::as_str),
            Some("info")
        );
        Ok(())
    }

    #[test_case(&["videointelligence", "annotate", "gs://a/b.mp4"], vec![Feature::LabelDetection]; "default feature")]
    #[test_case(&["videointelligence", "annotate", "gs://a/b.mp4", "-f", "SHOT_CHANGE_DETECTION,TEXT_DETECTION"], vec![Feature::ShotChangeDetection, Feature::TextDetection]; "comma separated")]
    #[test_case(&["videointelligence", "annotate", "gs://a/b.mp4", "-f", "OBJECT_TRACKING", "-f", "LOGO_RECOGNITION"], vec![Feature::ObjectTracking, Feature::LogoRecognition]; "repeated flag")]
    fn parse_features(args: &[&str], expected: Vec<Feature>) -> eyre::Result<()> {
        let matches = build_cli().try_get_matches_from(args)?;
        let (_, annotate) = matches.subcommand().ok_or_else(|| eyre::eyre!("no subcommand"))?;
        assert_eq!(annotate_request(annotate)?.features, expected);
        Ok(())
    }

    #[test]
    fn unknown_feature_is_error() -> eyre::Result<()> {
        let matches =
            build_cli().try_get_matches_from(["videointelligence", "annotate", "gs://a/b.mp4", "-f", "NOPE"])?;
        let (_, annotate) = matches.subcommand().ok_or_else(|| eyre::eyre!("no subcommand"))?;
        let err = annotate_request(annotate).unwrap_err().to_string();
        assert!(err.contains("NOPE"), "{err}");
        Ok(())
    }

    #[tokio::test]
    async fn annotate_prints_response() -> eyre::Result<()> {
        let transport = Arc::new(MockTransport::long_running(
            cat_request(),
            AnnotateVideoResponse::default(),
        ));
        let out = run(
            mock_app(transport.clone()),
            &["videointelligence", "annotate", "gs://cloud-samples-data/video/cat.mp4"],
        )
        .await?;

        let printed: AnnotateVideoResponse = serde_json::from_str(&out)?;
        assert_eq!(printed, AnnotateVideoResponse::default());
        assert_eq!(transport.requests(), vec![cat_request()]);
        Ok(())
    }

    #[tokio::test]
    async fn annotate_no_wait_prints_operation() -> eyre::Result<()> {
        let transport = Arc::new(
            MockTransport::long_running(cat_request(), AnnotateVideoResponse::default())
                .with_pending_polls(1),
        );
        let out = run(
            mock_app(transport.clone()),
            &["videointelligence", "annotate", "gs://cloud-samples-data/video/cat.mp4", "--no-wait"],
        )
        .await?;

        let printed: serde_json::Value = serde_json::from_str(&out)?;
        assert_eq!(printed["done"], json!(false));
        assert!(printed["name"].as_str().is_some_and(|n| n.starts_with("operations/")));
        assert_eq!(transport.polls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn annotate_failure_keeps_code() {
        let transport = Arc::new(MockTransport::long_running_error(
            cat_request(),
            cancelled_status(),
        ));
        let err = run(
            mock_app(transport),
            &["videointelligence", "annotate", "gs://cloud-samples-data/video/cat.mp4"],
        )
        .await
        .unwrap_err();

        let cause = err
            .downcast_ref::<videointelligence_core::Error>()
            .and_then(|e| e.code());
        assert_eq!(cause.map(|c| c as i32), Some(1));
    }

    #[tokio::test]
    async fn operation_get_reports_result() -> eyre::Result<()> {
        let transport = Arc::new(MockTransport::long_running(
            cat_request(),
            AnnotateVideoResponse::default(),
        ));
        let out = run(
            mock_app(transport),
            &["videointelligence", "operation", "get", "operations/mock-1"],
        )
        .await?;

        let printed: serde_json::Value = serde_json::from_str(&out)?;
        assert_eq!(printed["name"], json!("operations/mock-1"));
        assert_eq!(printed["done"], json!(true));
        assert_eq!(
            printed["result"]["response"],
            json!({ "annotation_results": [] })
        );
        Ok(())
    }

    #[tokio::test]
    async fn operation_cancel_and_delete() -> eyre::Result<()> {
        let transport = Arc::new(MockTransport::long_running(
            cat_request(),
            AnnotateVideoResponse::default(),
        ));
        let out = run(
            mock_app(transport.clone()),
            &["videointelligence", "operation", "cancel", "operations/9"],
        )
        .await?;
        assert_eq!(out.trim(), "cancellation requested for operations/9");

        run(
            mock_app(transport.clone()),
            &["videointelligence", "operation", "delete", "operations/9"],
        )
        .await?;
        assert_eq!(transport.cancelled(), vec!["operations/9".to_string()]);
        assert_eq!(transport.deleted(), vec!["operations/9".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn info_prints_defaults() -> eyre::Result<()> {
        let transport = Arc::new(MockTransport::call_error(cancelled_status()));
        let out = run(mock_app(transport), &["videointelligence", "info"]).await?;

        let printed: serde_json::Value = serde_json::from_str(&out)?;
        assert_eq!(printed["servicePath"], json!("videointelligence.googleapis.com"));
        assert_eq!(printed["port"], json!(443));
        assert_eq!(printed["transport"], json!("grpc"));
        assert_eq!(printed["projectId"], json!("bogus"));
        Ok(())
    }

    fn cancelled_status() -> tonic::Status {
        tonic::Status::cancelled("cancelled")
    }
}
