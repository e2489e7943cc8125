use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("The catalog answered {status} for {url}")]
    Status { status: StatusCode, url: String },
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("The catalog payload is inconsistent: {0}")]
    MalformedPayload(String),
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Invalid price domain: {0}")]
    InvalidDomain(String),
    #[error("Sweep can't advance past {price}: the catalog truncated the page and returned nothing")]
    Stalled { price: f64 },

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The fetch of a window could not be completed. Aborts the whole enumeration.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Reqwest(_) | Error::Status { .. } | Error::Json(_) | Error::MalformedPayload(_)
        )
    }

    /// Transient failures the HTTP client is allowed to retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Reqwest(e) => e.is_timeout() || e.is_connect(),
            Error::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
