use axum::{http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error categories surfaced to presentation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Unknown,
    InvalidTimePeriod,
}

impl ErrorKind {
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::Unknown => "Something went wrong. Please try again.",
            ErrorKind::InvalidTimePeriod => "The end of the period must not be before its start.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("invalid time period: end {end} is before start {start}")]
    InvalidTimePeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("task {0} not found")]
    TaskNotFound(String),
    #[error("item {item_uid} not found in task {task_uid}")]
    ItemNotFound { task_uid: String, item_uid: String },
    #[error("task {0} already exists")]
    DuplicateTask(String),
    #[error("item {item_uid} already exists in task {task_uid}")]
    DuplicateItem { task_uid: String, item_uid: String },
    #[error("item {item_uid} references metric {metric_uid} not defined on task {task_uid}")]
    UnknownMetric {
        task_uid: String,
        item_uid: String,
        metric_uid: String,
    },
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("record uid {found} does not match {expected}")]
    UidMismatch { expected: String, found: String },
    #[error("task list not written: {0}")]
    Storage(String),
}

impl TaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::InvalidTimePeriod { .. } => ErrorKind::InvalidTimePeriod,
            _ => ErrorKind::Unknown,
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorKind,
    message: &'a str,
}

impl AppError {
    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: ErrorKind::Unknown,
            message: err.to_string(),
        }
    }
}

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        let status = match &err {
            TaskError::TaskNotFound(_) | TaskError::ItemNotFound { .. } => StatusCode::NOT_FOUND,
            TaskError::DuplicateTask(_) | TaskError::DuplicateItem { .. } => StatusCode::CONFLICT,
            TaskError::InvalidTimePeriod { .. }
            | TaskError::UnknownMetric { .. }
            | TaskError::Malformed(_)
            | TaskError::UidMismatch { .. } => StatusCode::BAD_REQUEST,
            TaskError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            error: self.kind,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
