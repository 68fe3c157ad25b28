//! Error types for the chat completions client.

/// Errors that can occur when requesting a completion.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request could not be built or sent, or the body could not be read.
    #[error("Request failed")]
    RequestFailed,
    /// The base URL plus endpoint path is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// The API returned a non-success status with a body snippet.
    #[error("Request failed with status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    /// The body was not a chat completion.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Rate limits and server-side failures, worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
