use std::time::Duration;

use thiserror::Error;

use crate::api::{JobId, REPORT_NOT_READY};

/// Failure reported by a [`ReportApi`](crate::ReportApi) call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a service answer (connection, IO, decoding).
    #[error("transport error: {0}")]
    Transport(String),
    /// The service answered with an error code.
    #[error("service error {code}: {description}")]
    Service { code: String, description: String },
}

impl ApiError {
    pub fn service(code: impl Into<String>, description: impl Into<String>) -> Self {
        ApiError::Service {
            code: code.into(),
            description: description.into(),
        }
    }

    /// True for the only error code that is retried.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, ApiError::Service { code, .. } if code == REPORT_NOT_READY)
    }
}

/// Terminal failure of a report fetch.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("report submission failed: {0}")]
    Submission(ApiError),
    #[error("report job {job} failed with {code}: {description}")]
    Api {
        job: JobId,
        code: String,
        description: String,
    },
    #[error("transport error while polling report job {job}: {message}")]
    Transport { job: JobId, message: String },
    #[error("report fetch cancelled")]
    Cancelled,
    #[error("report fetch exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}
