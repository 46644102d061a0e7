use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Completed report as returned by the reporting service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Report {
    /// Report flavour reported by the service (`ranked`, `trended`, `overtime`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub elements: Vec<ReportElement>,
    #[serde(default)]
    pub metrics: Vec<ReportMetric>,
    /// Root data nodes, one per value of the outermost dimension.
    #[serde(default)]
    pub data: Vec<ReportDataNode>,
    #[serde(default, deserialize_with = "deserialize_counts")]
    pub totals: Vec<f64>,
}

/// A dimension of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportElement {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ReportElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// A numeric measure of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetric {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ReportMetric {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind: None,
        }
    }
}

/// One dimension value at one depth of the report tree.
///
/// Leaves carry `counts` (one per report metric, in report order); internal
/// nodes carry a `breakdown`. When both are present the breakdown wins.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportDataNode {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_counts")]
    pub counts: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Vec<ReportDataNode>>,
}

impl ReportDataNode {
    /// Leaf node with the given label and metric values.
    pub fn leaf(name: impl Into<String>, counts: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            counts,
            ..Self::default()
        }
    }

    /// Internal node with the given label and children.
    pub fn branch(name: impl Into<String>, breakdown: Vec<ReportDataNode>) -> Self {
        Self {
            name: name.into(),
            breakdown: Some(breakdown),
            ..Self::default()
        }
    }

    /// Children of this node; empty for leaves.
    pub fn children(&self) -> &[ReportDataNode] {
        self.breakdown.as_deref().unwrap_or_default()
    }

    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    pub fn temporal(&self, field: TemporalField) -> Option<i64> {
        match field {
            TemporalField::Year => self.year.map(i64::from),
            TemporalField::Month => self.month.map(i64::from),
            TemporalField::Day => self.day.map(i64::from),
            TemporalField::Hour => self.hour.map(i64::from),
            TemporalField::Minute => self.minute.map(i64::from),
        }
    }

    /// Temporal fields present on this node, in year→minute order.
    pub fn temporal_values(&self) -> impl Iterator<Item = (TemporalField, i64)> + '_ {
        TemporalField::ALL
            .iter()
            .filter_map(|field| self.temporal(*field).map(|value| (*field, value)))
    }
}

/// Date/time component a report node may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

impl TemporalField {
    /// Fixed column order for temporal fields.
    pub const ALL: [TemporalField; 5] = [
        TemporalField::Year,
        TemporalField::Month,
        TemporalField::Day,
        TemporalField::Hour,
        TemporalField::Minute,
    ];

    /// Position of the field in [`TemporalField::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            TemporalField::Year => "year",
            TemporalField::Month => "month",
            TemporalField::Day => "day",
            TemporalField::Hour => "hour",
            TemporalField::Minute => "minute",
        }
    }
}

/// Scalar cell of a flattened record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(value) => f.write_str(value),
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Number(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

/// One output row, laid out column for column like the report header.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct FlatRecord(Vec<FieldValue>);

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.0
    }

    pub fn into_values(self) -> Vec<FieldValue> {
        self.0
    }

    pub fn push(&mut self, value: impl Into<FieldValue>) {
        self.0.push(value.into());
    }
}

impl From<Vec<FieldValue>> for FlatRecord {
    fn from(values: Vec<FieldValue>) -> Self {
        Self(values)
    }
}

impl Extend<FieldValue> for FlatRecord {
    fn extend<T: IntoIterator<Item = FieldValue>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl fmt::Display for FlatRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, value) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

/// The service sends metric values as decimal strings; numbers and `null` are tolerated.
fn deserialize_counts<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCount {
        Number(f64),
        Text(String),
    }

    let raw: Option<Vec<RawCount>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|count| match count {
            RawCount::Number(value) => Ok(value),
            RawCount::Text(text) => text.trim().parse::<f64>().map_err(|err| {
                serde::de::Error::custom(format!("invalid metric value `{text}`: {err}"))
            }),
        })
        .collect()
}
