use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use omniture_core::{Credentials, Report, ReportDescriptor};

use crate::api::{JobId, ReportApi};
use crate::error::ApiError;
use crate::wire::{ErrorBody, GetRequest, GetResponse, QueueRequest, QueueResponse};

const REST_PATH: &str = "/admin/1.4/rest/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Attaches credentials to outgoing requests.
///
/// Signing schemes are owned by the caller; this crate only ships
/// [`BasicAuth`].
pub trait Authenticator: Send + Sync {
    fn authorize(&self, request: RequestBuilder, credentials: &Credentials) -> RequestBuilder;
}

/// Sends the credentials as HTTP basic auth.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAuth;

impl Authenticator for BasicAuth {
    fn authorize(&self, request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        request.basic_auth(credentials.user(), Some(credentials.secret()))
    }
}

/// [`ReportApi`] over the service's JSON REST interface.
#[derive(Clone)]
pub struct HttpReportApi {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    auth: Arc<dyn Authenticator>,
}

impl fmt::Debug for HttpReportApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpReportApi")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl HttpReportApi {
    /// Client for `https://{endpoint}/admin/1.4/rest/`.
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("omniture-input/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url(endpoint),
            credentials,
            auth: Arc::new(BasicAuth),
        })
    }

    pub fn with_authenticator(mut self, auth: impl Authenticator + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// Override the full REST base URL (proxies, test doubles).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self
            .http
            .post(&self.base_url)
            .query(&[("method", method)])
            .json(body);
        let response = self
            .auth
            .authorize(request, &self.credentials)
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        debug!(method, status = status.as_u16(), bytes = bytes.len(), "report api response");

        decode_response(status, &bytes)
    }
}

#[async_trait]
impl ReportApi for HttpReportApi {
    async fn queue(&self, descriptor: &ReportDescriptor) -> Result<JobId, ApiError> {
        let body = QueueRequest {
            report_description: descriptor.into(),
        };
        let response: QueueResponse = self.call("Report.Queue", &body).await?;
        Ok(response.report_id)
    }

    async fn get(&self, job: JobId) -> Result<Report, ApiError> {
        let response: GetResponse = self.call("Report.Get", &GetRequest { report_id: job }).await?;
        Ok(response.report)
    }
}

fn base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        format!("{endpoint}{REST_PATH}")
    } else {
        format!("https://{endpoint}{REST_PATH}")
    }
}

/// Map a raw response to the expected payload or an [`ApiError`].
///
/// Error bodies win over the status code: the service reports
/// `report_not_ready` with a 400.
fn decode_response<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, ApiError> {
    if let Ok(error) = serde_json::from_slice::<ErrorBody>(body) {
        let description = error.error_description.unwrap_or_default();
        return Err(ApiError::Service {
            code: error.error,
            description,
        });
    }

    if !status.is_success() {
        return Err(ApiError::Transport(format!("unexpected http status {status}")));
    }

    serde_json::from_slice(body)
        .map_err(|err| ApiError::Transport(format!("malformed response body: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_rest_url_from_host() {
        assert_eq!(
            base_url("api2.omniture.com"),
            "https://api2.omniture.com/admin/1.4/rest/"
        );
        assert_eq!(
            base_url("http://localhost:8080/"),
            "http://localhost:8080/admin/1.4/rest/"
        );
    }

    #[test]
    fn not_ready_body_maps_to_retryable_error() {
        let body = br#"{"error":"report_not_ready","error_description":"Report not ready","error_uri":null}"#;
        let err = decode_response::<QueueResponse>(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(err.is_not_ready());
    }

    #[test]
    fn other_error_codes_are_not_retryable() {
        let body = br#"{"error":"metric_id_invalid","error_description":"Metric \"pv\" not valid"}"#;
        let err = decode_response::<QueueResponse>(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert_eq!(
            err,
            ApiError::service("metric_id_invalid", "Metric \"pv\" not valid")
        );
        assert!(!err.is_not_ready());
    }

    #[test]
    fn decodes_queue_and_get_payloads() {
        let queued: QueueResponse =
            decode_response(StatusCode::OK, br#"{"reportID": 123456}"#).expect("queue response");
        assert_eq!(queued.report_id, JobId(123456));

        let body = br#"{"report": {"metrics": [{"id": "visits"}], "data": [{"name": "A", "counts": ["4"]}]}}"#;
        let fetched: GetResponse = decode_response(StatusCode::OK, body).expect("get response");
        assert_eq!(fetched.report.data[0].counts, vec![4.0]);
    }

    #[test]
    fn failed_status_without_error_body_is_transport_error() {
        let err =
            decode_response::<QueueResponse>(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>")
                .unwrap_err();
        assert!(matches!(err, ApiError::Transport(msg) if msg.contains("502")));
    }

    #[test]
    fn debug_output_hides_secret() {
        let api = HttpReportApi::new("api2.omniture.com", Credentials::new("user", "hunter2"))
            .expect("client");
        assert!(!format!("{api:?}").contains("hunter2"));
    }
}
