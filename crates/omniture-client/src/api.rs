use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use omniture_core::{Report, ReportDescriptor};

use crate::error::ApiError;

/// Error code the service returns while a queued report is still running.
pub const REPORT_NOT_READY: &str = "report_not_ready";

/// Identifier of a queued report job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote reporting protocol, one request per call.
#[async_trait]
pub trait ReportApi: Send + Sync {
    /// Queue a report and return its job id.
    async fn queue(&self, descriptor: &ReportDescriptor) -> Result<JobId, ApiError>;

    /// Fetch a queued report; fails with `report_not_ready` until it is done.
    async fn get(&self, job: JobId) -> Result<Report, ApiError>;
}

#[async_trait]
impl<T: ReportApi + ?Sized> ReportApi for std::sync::Arc<T> {
    async fn queue(&self, descriptor: &ReportDescriptor) -> Result<JobId, ApiError> {
        (**self).queue(descriptor).await
    }

    async fn get(&self, job: JobId) -> Result<Report, ApiError> {
        (**self).get(job).await
    }
}
