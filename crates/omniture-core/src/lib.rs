//! Core contracts for the omniture report input.
//!
//! This crate holds the pure, synchronous half of the step: the report
//! request descriptor, the report tree returned by the service, the
//! breakdown flattener, header derivation, and the row emitter boundary.
//! Network access lives in `omniture-client`.

pub mod config;
pub mod descriptor;
pub mod emit;
pub mod error;
pub mod flatten;
pub mod header;
pub mod report;

pub use config::{Credentials, ResolvedStep, StepConfig, Variables, substitute_variables};
pub use descriptor::{
    DATE_FORMAT, DateGranularity, ReportDescriptor, ReportDescriptorBuilder, parse_date,
    parse_id_list,
};
pub use emit::{EmitSummary, MemorySink, RowEmitter, RowSink};
pub use error::{Error, Result};
pub use flatten::{BranchPath, FlatReport, RecordLayout, count_leaves, flatten, flatten_report};
pub use header::{NAME_COLUMN, expected_headers, headers};
pub use report::{
    FieldValue, FlatRecord, Report, ReportDataNode, ReportElement, ReportMetric, TemporalField,
};
