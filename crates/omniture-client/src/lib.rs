//! Remote half of the omniture report input.
//!
//! Submits report descriptors to the reporting service, polls the queued job
//! until the report is ready, and hands the finished [`Report`] back to the
//! caller for flattening.
//!
//! [`Report`]: omniture_core::Report

pub mod api;
pub mod client;
pub mod delay;
pub mod error;
pub mod http;
mod wire;

pub use api::{JobId, REPORT_NOT_READY, ReportApi};
pub use client::{FetchOptions, PollOutcome, ReportClient};
pub use delay::{Delay, TokioDelay};
pub use error::{ApiError, ClientError};
pub use http::{Authenticator, BasicAuth, HttpReportApi};
