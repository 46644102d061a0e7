//! JSON bodies exchanged with the reporting REST surface.

use serde::{Deserialize, Serialize};

use omniture_core::{DATE_FORMAT, Report, ReportDescriptor};

use crate::api::JobId;

#[derive(Debug, Serialize)]
pub(crate) struct QueueRequest {
    #[serde(rename = "reportDescription")]
    pub report_description: WireDescription,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDescription {
    #[serde(rename = "reportSuiteID")]
    pub report_suite_id: String,
    pub date_from: String,
    pub date_to: String,
    pub date_granularity: String,
    pub metrics: Vec<IdRef>,
    pub elements: Vec<IdRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<IdRef>,
}

#[derive(Debug, Serialize)]
pub(crate) struct IdRef {
    pub id: String,
}

impl IdRef {
    fn list<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<IdRef> {
        ids.into_iter()
            .map(|id| IdRef { id: id.to_string() })
            .collect()
    }
}

impl From<&ReportDescriptor> for WireDescription {
    fn from(descriptor: &ReportDescriptor) -> Self {
        Self {
            report_suite_id: descriptor.report_suite_id().to_string(),
            date_from: descriptor.start_date().format(DATE_FORMAT).to_string(),
            date_to: descriptor.end_date().format(DATE_FORMAT).to_string(),
            date_granularity: descriptor.granularity().as_str().to_string(),
            metrics: IdRef::list(descriptor.metrics().iter().map(String::as_str)),
            elements: IdRef::list(descriptor.elements().iter().map(String::as_str)),
            segments: IdRef::list(descriptor.segment()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueResponse {
    #[serde(rename = "reportID")]
    pub report_id: JobId,
}

#[derive(Debug, Serialize)]
pub(crate) struct GetRequest {
    #[serde(rename = "reportID")]
    pub report_id: JobId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetResponse {
    pub report: Report,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}
