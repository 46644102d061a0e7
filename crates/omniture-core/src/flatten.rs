use tracing::{debug, warn};

use crate::header::headers;
use crate::report::{FieldValue, FlatRecord, Report, ReportDataNode, TemporalField};

/// Column layout shared by the header and every emitted record: `name`, the
/// temporal columns, one column per element, one column per metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    temporal: Vec<TemporalField>,
    elements: usize,
    metrics: usize,
}

impl RecordLayout {
    pub fn new(temporal: Vec<TemporalField>, elements: usize, metrics: usize) -> Self {
        Self {
            temporal,
            elements,
            metrics,
        }
    }

    /// Layout of a fetched report.
    ///
    /// Temporal columns are sampled along the first root-to-leaf path only;
    /// the tree is assumed to be homogeneous.
    pub fn from_report(report: &Report) -> Self {
        let mut present = [false; TemporalField::ALL.len()];
        let mut level = report.data.as_slice();
        while let Some(first) = level.first() {
            for (field, _) in first.temporal_values() {
                present[field.index()] = true;
            }
            level = first.children();
        }

        let temporal = TemporalField::ALL
            .into_iter()
            .filter(|field| present[field.index()])
            .collect();
        Self::new(temporal, report.elements.len(), report.metrics.len())
    }

    pub fn temporal(&self) -> &[TemporalField] {
        &self.temporal
    }

    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn metrics(&self) -> usize {
        self.metrics
    }

    /// Number of values in every record and every header.
    pub fn width(&self) -> usize {
        1 + self.temporal.len() + self.elements + self.metrics
    }
}

/// Labels and date parts collected by one branch on its way down the tree.
///
/// A node carrying temporal fields is a date node: its label fills the `name`
/// column and its fields fill the temporal columns. Every other node fills the
/// next element column. Without a date node on the path, `name` repeats the
/// innermost element label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchPath {
    date_label: Option<String>,
    temporal: [Option<i64>; TemporalField::ALL.len()],
    element_labels: Vec<String>,
}

impl BranchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this path extended with the node's own contribution.
    pub fn descend(&self, node: &ReportDataNode) -> Self {
        let mut next = self.clone();
        let mut dated = false;
        for (field, value) in node.temporal_values() {
            next.temporal[field.index()] = Some(value);
            dated = true;
        }

        if dated {
            next.date_label = Some(node.name.clone());
        } else {
            next.element_labels.push(node.name.clone());
        }
        next
    }

    pub fn element_labels(&self) -> &[String] {
        &self.element_labels
    }

    /// Record for a leaf ending this path, or `None` when the path and the
    /// leaf's metric values do not fill `layout` exactly.
    pub fn complete(&self, counts: &[f64], layout: &RecordLayout) -> Option<FlatRecord> {
        if counts.len() != layout.metrics || self.element_labels.len() != layout.elements {
            return None;
        }
        let fills_temporal = TemporalField::ALL.iter().all(|field| {
            self.temporal[field.index()].is_some() == layout.temporal.contains(field)
        });
        if !fills_temporal {
            return None;
        }

        let name = self
            .date_label
            .as_ref()
            .or_else(|| self.element_labels.last())?;

        let mut values = Vec::with_capacity(layout.width());
        values.push(FieldValue::Text(name.clone()));
        values.extend(
            layout
                .temporal
                .iter()
                .filter_map(|field| self.temporal[field.index()])
                .map(FieldValue::Integer),
        );
        values.extend(self.element_labels.iter().cloned().map(FieldValue::Text));
        values.extend(counts.iter().copied().map(FieldValue::Number));
        Some(FlatRecord::from(values))
    }
}

/// Flatten a report tree into one record per complete leaf.
///
/// Traversal is depth-first and pre-order, left to right at every level.
/// Each node extends its own copy of `path`, so sibling branches never observe
/// each other's values. A leaf is emitted only when it carries exactly one
/// value per metric and its path fills every column of `layout`; anything
/// else is dropped.
pub fn flatten(
    nodes: &[ReportDataNode],
    path: &BranchPath,
    layout: &RecordLayout,
) -> Vec<FlatRecord> {
    let mut records = Vec::new();

    for node in nodes {
        let branch = path.descend(node);

        let children = node.children();
        if children.is_empty() {
            records.extend(branch.complete(&node.counts, layout));
        } else {
            records.extend(flatten(children, &branch, layout));
        }
    }

    records
}

/// Flatten the whole report starting from an empty path.
pub fn flatten_report(report: &Report) -> Vec<FlatRecord> {
    flatten(
        &report.data,
        &BranchPath::new(),
        &RecordLayout::from_report(report),
    )
}

/// Number of leaves below `nodes`, complete or not.
pub fn count_leaves(nodes: &[ReportDataNode]) -> usize {
    nodes
        .iter()
        .map(|node| match node.children() {
            [] => 1,
            children => count_leaves(children),
        })
        .sum()
}

/// Header and records of one report, ready for emission.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatReport {
    pub header: Vec<String>,
    pub records: Vec<FlatRecord>,
    /// Leaves discarded because they did not fill the header.
    pub dropped: usize,
}

impl FlatReport {
    pub fn from_report(report: &Report) -> Self {
        let header = headers(report);
        let records = flatten_report(report);
        let dropped = count_leaves(&report.data).saturating_sub(records.len());

        if dropped > 0 {
            warn!(dropped, "discarded incomplete report leaves");
        }
        debug!(
            columns = header.len(),
            records = records.len(),
            "flattened report"
        );

        Self {
            header,
            records,
            dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportElement, ReportMetric};

    fn text(value: &str) -> FieldValue {
        FieldValue::from(value)
    }

    fn num(value: f64) -> FieldValue {
        FieldValue::Number(value)
    }

    fn ranked(elements: usize, metrics: usize) -> RecordLayout {
        RecordLayout::new(Vec::new(), elements, metrics)
    }

    #[test]
    fn flat_list_emits_one_record_per_leaf() {
        let nodes = vec![
            ReportDataNode::leaf("A", vec![1.0, 2.0]),
            ReportDataNode::leaf("B", vec![3.0, 4.0]),
        ];
        let records = flatten(&nodes, &BranchPath::new(), &ranked(1, 2));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].values(), [text("B"), text("B"), num(3.0), num(4.0)]);
    }

    #[test]
    fn descend_leaves_the_parent_path_untouched() {
        let root = BranchPath::new().descend(&ReportDataNode::leaf("root", Vec::new()));
        let child = root.descend(&ReportDataNode::leaf("A", vec![1.0]));

        assert_eq!(root.element_labels(), ["root"]);
        assert_eq!(child.element_labels(), ["root", "A"]);
        assert_eq!(
            child.complete(&[1.0], &ranked(2, 1)).expect("complete").values(),
            [text("A"), text("root"), text("A"), num(1.0)]
        );
    }

    #[test]
    fn date_node_fills_name_and_temporal_columns() {
        let day = ReportDataNode {
            name: "Thu. 1 Jan. 2015".to_string(),
            year: Some(2015),
            day: Some(1),
            ..ReportDataNode::default()
        };
        let path = BranchPath::new()
            .descend(&day)
            .descend(&ReportDataNode::leaf("A", vec![4.0]));
        let layout = RecordLayout::new(vec![TemporalField::Year, TemporalField::Day], 1, 1);

        let record = path.complete(&[4.0], &layout).expect("complete");
        assert_eq!(
            record.values(),
            [
                text("Thu. 1 Jan. 2015"),
                FieldValue::Integer(2015),
                FieldValue::Integer(1),
                text("A"),
                num(4.0)
            ]
        );
        assert_eq!(record.len(), layout.width());
    }

    #[test]
    fn missing_temporal_column_is_incomplete() {
        let path = BranchPath::new().descend(&ReportDataNode::leaf("A", vec![1.0]));
        let layout = RecordLayout::new(vec![TemporalField::Day], 1, 1);
        assert_eq!(path.complete(&[1.0], &layout), None);
    }

    #[test]
    fn surplus_metric_values_are_dropped() {
        let nodes = vec![ReportDataNode::leaf("A", vec![1.0, 2.0, 3.0])];
        assert!(flatten(&nodes, &BranchPath::new(), &ranked(1, 2)).is_empty());
    }

    #[test]
    fn counts_on_internal_nodes_are_ignored() {
        let mut parent = ReportDataNode::branch("A", vec![ReportDataNode::leaf("x", vec![1.0])]);
        parent.counts = vec![99.0];
        let records = flatten(&[parent], &BranchPath::new(), &ranked(2, 1));
        assert_eq!(
            records,
            vec![FlatRecord::from(vec![text("x"), text("A"), text("x"), num(1.0)])]
        );
    }

    #[test]
    fn counts_every_leaf() {
        let nodes = vec![
            ReportDataNode::branch(
                "A",
                vec![
                    ReportDataNode::leaf("x", vec![1.0]),
                    ReportDataNode::leaf("y", Vec::new()),
                ],
            ),
            ReportDataNode::leaf("B", vec![2.0]),
        ];
        assert_eq!(count_leaves(&nodes), 3);
    }

    #[test]
    fn samples_temporal_columns_along_the_first_path() {
        let report = Report {
            elements: vec![ReportElement::new("eVar2")],
            metrics: vec![ReportMetric::new("pageviews")],
            data: vec![ReportDataNode::branch(
                "A",
                vec![ReportDataNode {
                    name: "Jan 2015".to_string(),
                    year: Some(2015),
                    month: Some(1),
                    counts: vec![1.0],
                    ..ReportDataNode::default()
                }],
            )],
            ..Report::default()
        };
        let layout = RecordLayout::from_report(&report);
        assert_eq!(layout.temporal(), [TemporalField::Year, TemporalField::Month]);
        assert_eq!(layout.width(), 5);
    }

    #[test]
    fn flat_report_tracks_dropped_leaves() {
        let report = Report {
            elements: vec![ReportElement::new("eVar2")],
            metrics: vec![ReportMetric::new("pageviews")],
            data: vec![
                ReportDataNode::leaf("A", vec![1.0]),
                ReportDataNode::leaf("B", Vec::new()),
            ],
            ..Report::default()
        };
        let flat = FlatReport::from_report(&report);
        assert_eq!(flat.records.len(), 1);
        assert_eq!(flat.dropped, 1);
        assert_eq!(flat.header, ["name", "eVar2", "pageviews"]);
        assert_eq!(flat.records[0].len(), flat.header.len());
    }
}
