use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
    /// Credentials rejected by the auth endpoint.
    AuthRejected(String),
    /// Connection-level failure talking to the cloud service.
    Transport(String),
    /// Body was not JSON or not envelope-shaped. Second field carries the
    /// offending body for diagnosis.
    Protocol(String, String),
    /// Well-formed envelope with a non-success status.
    Upstream { status: String, message: String },
    /// Client-side failure (HTTP client construction, malformed identifier).
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AuthRejected(msg) => write!(f, "authentication rejected: {}", msg),
            Error::Transport(msg) => write!(f, "transport failure: {}", msg),
            Error::Protocol(msg, _body) => write!(f, "protocol failure: {}", msg),
            Error::Upstream { status, message } => {
                write!(f, "upstream rejected request: {} - {}", status, message)
            }
            Error::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
