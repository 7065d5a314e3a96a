pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Occurs when `videointelligence.toml` or a credentials file fails to load.
    #[error("failed to load configuration: {0}")]
    LoadError(String),
    /// Occurs when the specified key is not present in the configuration.
    #[error("the specified key \"{0}\" not found in configuration")]
    ValueNotFound(String),
    #[error("invalid configuration value: {0:#}")]
    ValueError(eyre::Error),
    #[error("invalid URI: {0}")]
    InvalidUri(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("HTTP fallback error: {0}")]
    Http(String),
    /// The call itself was rejected before an operation handle existed.
    #[error("rpc failed: {0}")]
    Rpc(#[from] tonic::Status),
    /// The operation was accepted and later finished with an error.
    #[error("operation {name} failed: {status}")]
    OperationFailed { name: String, status: tonic::Status },
    #[error("failed to decode protobuf payload: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("expected payload of type {expected}, got {actual}")]
    UnexpectedType { expected: String, actual: String },
    #[error("operation {0} is done but carries neither a response nor an error")]
    MissingResult(String),
    #[error("operation {0} did not complete within the configured timeout")]
    Timeout(String),
}

impl Error {
    /// Status code carried by this error, if it came from the service.
    ///
    /// The code is passed through untouched from the transport, so a failed
    /// operation reporting `code = 1` yields `Some(tonic::Code::Cancelled)`.
    pub fn code(&self) -> Option<tonic::Code> {
        match self {
            Error::Rpc(status) | Error::OperationFailed { status, .. } => Some(status.code()),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<&tonic::Status> {
        match self {
            Error::Rpc(status) | Error::OperationFailed { status, .. } => Some(status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn operation_failure_keeps_code() {
        let err = Error::OperationFailed {
            name: "operations/1".to_string(),
            status: tonic::Status::new(tonic::Code::from(1), "boom"),
        };
        assert_eq!(err.code(), Some(tonic::Code::Cancelled));
        assert_eq!(err.status().map(|s| s.message()), Some("boom"));
    }

    #[test]
    fn local_errors_have_no_code() {
        assert_eq!(Error::InvalidRequest("x".into()).code(), None);
        assert_eq!(Error::MissingResult("operations/1".into()).code(), None);
        assert_eq!(Error::Timeout("operations/1".into()).code(), None);
    }
}
