// Error taxonomy: every failure a link-service call can end in maps onto
// exactly one `ApiError` variant. The `Display` text of each variant is the
// message shown to the user, so commands never have to build their own.

use thiserror::Error;

/// Classified outcome of a failed operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The operation needs a bearer token and none is stored.
    #[error("Authentication token is missing. Please log in using 'lnkshrt login' to generate a token.")]
    MissingToken,

    #[error("URL scheme is missing. Please include 'http://' or 'https://' at the beginning of the URL.")]
    MissingScheme,

    #[error("Invalid URL scheme '{0}'. Only 'http://' and 'https://' schemes are allowed.")]
    UnsupportedScheme(String),

    /// The URL has an allowed scheme but is otherwise malformed.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// DNS failure, refused connection or timeout.
    #[error("Unable to establish a connection to the API at {base_url}. Please ensure that the URL is correct and the API is accessible.")]
    Connection { base_url: String },

    /// 422 response; carries the first field error's message.
    #[error("{0}")]
    Validation(String),

    /// 401 from the token endpoint: wrong username or password.
    #[error("{0}")]
    InvalidCredentials(String),

    /// 401 from any other endpoint: the stored token was rejected.
    #[error("Invalid API token provided. Please use 'lnkshrt login' to generate a token.")]
    InvalidToken,

    /// Any other non-2xx response, with the service's `detail` verbatim.
    #[error("{detail}")]
    Service { status: u16, detail: String },

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// Unexpected errors point at a defect or protocol drift and abort the
    /// current command; everything else is a reportable failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Unexpected(_))
    }

    /// Process exit code for a command that ended in this error.
    pub fn exit_code(&self) -> u8 {
        if self.is_fatal() {
            2
        } else {
            1
        }
    }
}
