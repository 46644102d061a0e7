use crate::descriptor::ReportDescriptor;
use crate::flatten::RecordLayout;
use crate::report::{Report, TemporalField};

/// Leading column: the date label of the row, or its innermost element label
/// when the report has no date nodes.
pub const NAME_COLUMN: &str = "name";

/// Ordered output columns of a fetched report.
///
/// `name`, then the temporal fields found along the first root-to-leaf path,
/// then element ids and metric ids in report order. Records produced by
/// [`flatten_report`](crate::flatten::flatten_report) follow the same layout.
pub fn headers(report: &Report) -> Vec<String> {
    let layout = RecordLayout::from_report(report);
    let mut columns = Vec::with_capacity(layout.width());
    columns.push(NAME_COLUMN.to_string());
    columns.extend(
        layout
            .temporal()
            .iter()
            .map(|field| field.label().to_string()),
    );
    columns.extend(report.elements.iter().map(|element| element.id.clone()));
    columns.extend(report.metrics.iter().map(|metric| metric.id.clone()));

    columns
}

/// Columns a descriptor is expected to produce, derived before any fetch.
pub fn expected_headers(descriptor: &ReportDescriptor) -> Vec<String> {
    let mut columns = vec![NAME_COLUMN.to_string()];
    columns.extend(
        descriptor
            .granularity()
            .temporal_fields()
            .iter()
            .map(TemporalField::label)
            .map(str::to_string),
    );
    columns.extend(descriptor.elements().iter().cloned());
    columns.extend(descriptor.metrics().iter().cloned());
    columns
}
