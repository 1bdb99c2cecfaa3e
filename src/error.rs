use reqwest::StatusCode;
use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;

/// Messages the server uses for well-known rejections, mapped to copy fit for players.
const HUMANIZED_ERRORS: &[(&str, &str)] = &[
    ("errors.vote_for_self", "Unable to vote for yourself"),
    (
        "errors.games.not_enough_members",
        "Not enough members, share the lobby code!",
    ),
    ("errors.round_entries.duplicate", "You already submitted an entry"),
    ("errors.round_entry_votes.duplicate", "You already voted this round"),
];

/// Failures raised while talking to the krumnet API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build krumnet client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request never reached the server.
    #[error("failed to send krumnet request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with an unexpected status code.
    #[error("unexpected krumnet response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// The server refused the request with a structured message (HTTP 400 + plain body).
    #[error("krumnet rejected `{path}`: {message}")]
    Rejected { path: String, message: String },
    /// Response payload could not be parsed into the expected model.
    #[error("failed to decode krumnet response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// A provisioning job never produced a result.
    #[error("job `{id}` not finished after {attempts} attempts")]
    JobIncomplete { id: String, attempts: u32 },
}

/// Errors surfaced by the client services.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport layer failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Durable token storage could not be read or written.
    #[error("token storage unavailable")]
    Storage(#[from] StorageError),
    /// Input rejected before any request was dispatched.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed from the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<ValidationErrors> for ClientError {
    fn from(err: ValidationErrors) -> Self {
        ClientError::InvalidInput(format!("validation failed: {}", err))
    }
}

/// Domain error reported by the server, optionally paired with a readable explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub message: String,
    pub humanized: Option<String>,
}

/// Pull the structured server message out of an error, if the server produced one.
pub fn extract_server_error(err: &ClientError) -> Option<ServerError> {
    match err {
        ClientError::Api(ApiError::Rejected { message, .. }) => Some(ServerError {
            message: message.clone(),
            humanized: humanize(message).map(str::to_string),
        }),
        _ => None,
    }
}

/// Look up the player-facing copy for a server message.
pub fn humanize(message: &str) -> Option<&'static str> {
    HUMANIZED_ERRORS
        .iter()
        .find(|(key, _)| *key == message)
        .map(|(_, copy)| *copy)
}
