use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// HTTP result type, T is typically a hyper::Response
/// HttpError is used to generate a synthetic error response
pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// Describes things that can go wrong in the forwarder
#[derive(Debug, Error, Clone)]
pub enum HttpError {
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Failed to get response from backend: {0}")]
    FailedToGetResponseFromBackend(String),

    #[error("Backend did not answer within {0:?}")]
    UpstreamTimeout(Duration),
}

impl HttpError {
    /// Label used for the `error_type` metric attribute
    pub fn error_type(&self) -> &'static str {
        match self {
            HttpError::InvalidUri(_) => "invalid_uri",
            HttpError::FailedToGetResponseFromBackend(_) => "backend_unreachable",
            HttpError::UpstreamTimeout(_) => "upstream_timeout",
        }
    }
}

impl From<HttpError> for StatusCode {
    fn from(e: HttpError) -> StatusCode {
        match e {
            HttpError::InvalidUri(_) => StatusCode::BAD_REQUEST,
            HttpError::FailedToGetResponseFromBackend(_) => StatusCode::BAD_GATEWAY,
            HttpError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}
