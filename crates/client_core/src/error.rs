use shared::{
    domain::SpeakerId,
    error::{ApiError, ErrorCode},
    protocol::GraphQLError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("graphql endpoint is invalid: {0}")]
    InvalidEndpoint(String),
    #[error("graphql request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("graphql endpoint returned HTTP {status}")]
    Status { status: u16 },
    #[error("graphql errors: {}", join_messages(.0))]
    GraphQL(Vec<GraphQLError>),
    #[error("graphql response for {operation} carried no data")]
    MissingData { operation: String },
    #[error("speaker {0} not found")]
    NotFound(SpeakerId),
    #[error("failed to decode graphql payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{operation} is not cached")]
    CacheMiss { operation: &'static str },
}

fn join_messages(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ClientError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::InvalidEndpoint(_) | ClientError::Transport(_) => ErrorCode::Transport,
            ClientError::Status { .. } | ClientError::GraphQL(_) => ErrorCode::Server,
            ClientError::MissingData { .. } | ClientError::Decode(_) => ErrorCode::Decode,
            ClientError::NotFound(_) => ErrorCode::NotFound,
            ClientError::CacheMiss { .. } => ErrorCode::CacheMiss,
        }
    }
}

impl From<&ClientError> for ApiError {
    fn from(value: &ClientError) -> Self {
        ApiError::new(value.code(), value.to_string())
    }
}

impl From<ClientError> for ApiError {
    fn from(value: ClientError) -> Self {
        ApiError::from(&value)
    }
}
