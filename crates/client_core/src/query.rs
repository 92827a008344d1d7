use shared::error::ApiError;

use crate::error::ClientError;

/// Observable state of one query instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState<T> {
    Loading,
    Failed(ApiError),
    Ready(T),
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, QueryState::Ready(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            QueryState::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        match self {
            QueryState::Loading => QueryState::Loading,
            QueryState::Failed(error) => QueryState::Failed(error),
            QueryState::Ready(data) => QueryState::Ready(f(data)),
        }
    }
}

impl<T> From<Result<T, ClientError>> for QueryState<T> {
    fn from(value: Result<T, ClientError>) -> Self {
        match value {
            Ok(data) => QueryState::Ready(data),
            Err(err) => QueryState::Failed(ApiError::from(err)),
        }
    }
}
