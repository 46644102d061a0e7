//! Statically typed step configuration.
//!
//! Settings arrive as plain strings (possibly holding `${NAME}` variables)
//! and are checked here before any network activity takes place.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::{DateGranularity, ReportDescriptor, parse_date, parse_id_list};
use crate::error::{Error, Result};

/// Default reporting endpoint host.
pub const DEFAULT_ENDPOINT: &str = "api2.omniture.com";

/// Default pause between two status polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Variables available to `${NAME}` substitution.
pub type Variables = BTreeMap<String, String>;

/// Step settings as entered by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub report_suite_id: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default = "StepConfig::default_granularity")]
    pub granularity: DateGranularity,
    /// Comma-separated metric ids, e.g. `pageviews,visits`.
    #[serde(default)]
    pub metrics: String,
    /// Comma-separated element ids, e.g. `eVar2`.
    #[serde(default)]
    pub elements: String,
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default = "StepConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "StepConfig::default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            secret: String::new(),
            report_suite_id: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            granularity: Self::default_granularity(),
            metrics: String::new(),
            elements: String::new(),
            segment: None,
            endpoint: Self::default_endpoint(),
            poll_interval_secs: Self::default_poll_interval_secs(),
            deadline_secs: None,
        }
    }
}

impl StepConfig {
    fn default_granularity() -> DateGranularity {
        DateGranularity::Day
    }

    fn default_endpoint() -> String {
        DEFAULT_ENDPOINT.to_string()
    }

    fn default_poll_interval_secs() -> u64 {
        DEFAULT_POLL_INTERVAL_SECS
    }

    /// Substitute variables, check mandatory settings and build the request.
    pub fn resolve(&self, vars: &Variables) -> Result<ResolvedStep> {
        let user = required("user", &self.user, vars)?;
        let secret = required("secret", &self.secret, vars)?;
        let report_suite_id = required("report_suite_id", &self.report_suite_id, vars)?;
        let start_date = parse_date("start_date", &required("start_date", &self.start_date, vars)?)?;
        let end_date = parse_date("end_date", &required("end_date", &self.end_date, vars)?)?;

        let metrics = parse_id_list(&substitute_variables(&self.metrics, vars)?);
        if metrics.is_empty() {
            return Err(Error::missing("metrics"));
        }
        let elements = parse_id_list(&substitute_variables(&self.elements, vars)?);
        if elements.is_empty() {
            return Err(Error::missing("elements"));
        }

        let endpoint = required("endpoint", &self.endpoint, vars)?;
        if self.poll_interval_secs == 0 {
            return Err(Error::Configuration(
                "`poll_interval_secs` must be greater than zero".to_string(),
            ));
        }

        let mut builder = ReportDescriptor::builder()
            .report_suite_id(report_suite_id)
            .date_range(start_date, end_date)
            .granularity(self.granularity)
            .metrics(metrics)
            .elements(elements);
        if let Some(segment) = &self.segment {
            builder = builder.segment(substitute_variables(segment, vars)?);
        }
        let descriptor = builder.build()?;

        debug!(
            report_suite = descriptor.report_suite_id(),
            granularity = %descriptor.granularity(),
            metrics = descriptor.metrics().len(),
            elements = descriptor.elements().len(),
            "resolved step configuration"
        );

        Ok(ResolvedStep {
            credentials: Credentials::new(user, secret),
            endpoint,
            descriptor,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            deadline: self.deadline_secs.map(Duration::from_secs),
        })
    }
}

/// Validated settings, ready to drive a fetch.
#[derive(Debug, Clone)]
pub struct ResolvedStep {
    pub credentials: Credentials,
    pub endpoint: String,
    pub descriptor: ReportDescriptor,
    pub poll_interval: Duration,
    pub deadline: Option<Duration>,
}

/// Account credentials for the reporting service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    secret: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            secret: secret.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &"***")
            .finish()
    }
}

/// Replace every `${NAME}` in `input` with its value from `vars`.
pub fn substitute_variables(input: &str, vars: &Variables) -> Result<String> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(Error::Configuration(format!(
                "unterminated variable reference in `{input}`"
            )));
        };

        let name = after[..end].trim();
        let value = vars.get(name).ok_or_else(|| {
            Error::Configuration(format!("undefined variable `{name}` in `{input}`"))
        })?;
        output.push_str(value);
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn required(field: &str, raw: &str, vars: &Variables) -> Result<String> {
    let value = substitute_variables(raw, vars)?;
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::missing(field));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StepConfig {
        StepConfig {
            user: "analyst:Company".to_string(),
            secret: "${OMNITURE_SECRET}".to_string(),
            report_suite_id: "suite".to_string(),
            start_date: "2015-01-01".to_string(),
            end_date: "2015-01-30".to_string(),
            granularity: DateGranularity::Week,
            metrics: "pageviews, visits".to_string(),
            elements: "eVar2".to_string(),
            ..StepConfig::default()
        }
    }

    fn vars() -> Variables {
        Variables::from([("OMNITURE_SECRET".to_string(), "s3cret".to_string())])
    }

    #[test]
    fn resolves_complete_configuration() {
        let step = sample().resolve(&vars()).expect("resolve");
        assert_eq!(step.credentials.user(), "analyst:Company");
        assert_eq!(step.credentials.secret(), "s3cret");
        assert_eq!(step.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(step.poll_interval, Duration::from_secs(3));
        assert_eq!(step.deadline, None);
        assert_eq!(step.descriptor.metrics(), ["pageviews", "visits"]);
    }

    #[test]
    fn reports_missing_user_first() {
        let mut config = sample();
        config.user = " ".to_string();
        config.report_suite_id.clear();
        let err = config.resolve(&vars()).unwrap_err();
        assert_eq!(err, Error::missing("user"));
    }

    #[test]
    fn reports_missing_secret_and_suite() {
        let mut config = sample();
        config.secret.clear();
        assert_eq!(config.resolve(&vars()).unwrap_err(), Error::missing("secret"));

        let mut config = sample();
        config.report_suite_id.clear();
        assert_eq!(
            config.resolve(&vars()).unwrap_err(),
            Error::missing("report_suite_id")
        );
    }

    #[test]
    fn reports_empty_metric_list() {
        let mut config = sample();
        config.metrics = " , ".to_string();
        assert_eq!(config.resolve(&vars()).unwrap_err(), Error::missing("metrics"));
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let mut config = sample();
        config.poll_interval_secs = 0;
        assert!(config.resolve(&vars()).is_err());
    }

    #[test]
    fn substitutes_variables() {
        let vars = Variables::from([
            ("A".to_string(), "one".to_string()),
            ("B".to_string(), "two".to_string()),
        ]);
        assert_eq!(
            substitute_variables("${A}-${ B }-$x", &vars).expect("substitute"),
            "one-two-$x"
        );
    }

    #[test]
    fn undefined_and_unterminated_variables_fail() {
        let vars = Variables::new();
        assert!(substitute_variables("${MISSING}", &vars).is_err());
        assert!(substitute_variables("${OPEN", &vars).is_err());
    }

    #[test]
    fn debug_output_hides_secret() {
        let credentials = Credentials::new("user", "hunter2");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }
}
