use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::report::TemporalField;

/// Date format accepted for report ranges (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time bucket the service uses for trended reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateGranularity {
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl DateGranularity {
    /// Wire identifier of the granularity.
    pub fn as_str(&self) -> &'static str {
        match self {
            DateGranularity::Hour => "hour",
            DateGranularity::Day => "day",
            DateGranularity::Week => "week",
            DateGranularity::Month => "month",
            DateGranularity::Quarter => "quarter",
            DateGranularity::Year => "year",
        }
    }

    /// Temporal fields the service fills on date nodes of this granularity.
    ///
    /// Weeks are keyed by their first day, quarters by their first month.
    pub fn temporal_fields(&self) -> &'static [TemporalField] {
        use TemporalField::*;
        match self {
            DateGranularity::Hour => &[Year, Month, Day, Hour],
            DateGranularity::Day | DateGranularity::Week => &[Year, Month, Day],
            DateGranularity::Month | DateGranularity::Quarter => &[Year, Month],
            DateGranularity::Year => &[Year],
        }
    }
}

impl fmt::Display for DateGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateGranularity {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(DateGranularity::Hour),
            "day" => Ok(DateGranularity::Day),
            "week" => Ok(DateGranularity::Week),
            "month" => Ok(DateGranularity::Month),
            "quarter" => Ok(DateGranularity::Quarter),
            "year" => Ok(DateGranularity::Year),
            other => Err(Error::Configuration(format!(
                "unknown date granularity `{other}`"
            ))),
        }
    }
}

/// Immutable request for one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDescriptor {
    report_suite_id: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    granularity: DateGranularity,
    metrics: Vec<String>,
    elements: Vec<String>,
    segment: Option<String>,
}

impl ReportDescriptor {
    pub fn builder() -> ReportDescriptorBuilder {
        ReportDescriptorBuilder::default()
    }

    pub fn report_suite_id(&self) -> &str {
        &self.report_suite_id
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn granularity(&self) -> DateGranularity {
        self.granularity
    }

    /// Metric ids in request order.
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Element ids in request order.
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    pub fn segment(&self) -> Option<&str> {
        self.segment.as_deref()
    }
}

/// Assembles a [`ReportDescriptor`] from already-validated pieces.
#[derive(Debug, Clone, Default)]
pub struct ReportDescriptorBuilder {
    report_suite_id: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    granularity: Option<DateGranularity>,
    metrics: Vec<String>,
    elements: Vec<String>,
    segment: Option<String>,
}

impl ReportDescriptorBuilder {
    pub fn report_suite_id(mut self, id: impl Into<String>) -> Self {
        self.report_suite_id = Some(id.into());
        self
    }

    pub fn date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn granularity(mut self, granularity: DateGranularity) -> Self {
        self.granularity = Some(granularity);
        self
    }

    pub fn metric(mut self, id: impl Into<String>) -> Self {
        self.metrics.push(id.into());
        self
    }

    pub fn metrics<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn element(mut self, id: impl Into<String>) -> Self {
        self.elements.push(id.into());
        self
    }

    pub fn elements<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.elements.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn segment(mut self, id: impl Into<String>) -> Self {
        self.segment = Some(id.into());
        self
    }

    /// Finish the descriptor, failing on the first absent mandatory field.
    pub fn build(self) -> Result<ReportDescriptor> {
        let report_suite_id = self
            .report_suite_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::missing("report_suite_id"))?;
        let start_date = self.start_date.ok_or_else(|| Error::missing("start_date"))?;
        let end_date = self.end_date.ok_or_else(|| Error::missing("end_date"))?;
        let granularity = self
            .granularity
            .ok_or_else(|| Error::missing("granularity"))?;

        if self.metrics.is_empty() {
            return Err(Error::Configuration(
                "at least one metric is required".to_string(),
            ));
        }
        if self.elements.is_empty() {
            return Err(Error::Configuration(
                "at least one element is required".to_string(),
            ));
        }
        if start_date > end_date {
            return Err(Error::Configuration(format!(
                "start date {start_date} is after end date {end_date}"
            )));
        }

        Ok(ReportDescriptor {
            report_suite_id,
            start_date,
            end_date,
            granularity,
            metrics: self.metrics,
            elements: self.elements,
            segment: self.segment.filter(|id| !id.trim().is_empty()),
        })
    }
}

/// Parse a `YYYY-MM-DD` date, naming the offending field on failure.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|err| {
        Error::Configuration(format!(
            "`{field}` must be a YYYY-MM-DD date, got `{value}`: {err}"
        ))
    })
}

/// Split a comma-separated id list, trimming blanks and dropping empty entries.
pub fn parse_id_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
