use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use omniture_core::config::DEFAULT_POLL_INTERVAL_SECS;
use omniture_core::{Report, ReportDescriptor, ResolvedStep};

use crate::api::{JobId, ReportApi};
use crate::delay::{Delay, TokioDelay};
use crate::error::{ApiError, ClientError};

/// Knobs for the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Pause after each `report_not_ready` answer.
    pub poll_interval: Duration,
    /// Upper bound for the whole fetch; `None` polls until the report is ready.
    pub deadline: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            deadline: None,
        }
    }
}

impl From<&ResolvedStep> for FetchOptions {
    fn from(step: &ResolvedStep) -> Self {
        Self {
            poll_interval: step.poll_interval,
            deadline: step.deadline,
        }
    }
}

/// Result of a single status poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Ready(Report),
    NotReady,
}

/// Drives one report job from submission to a finished report.
///
/// `Submitted → Polling → {Ready, Failed}`: `report_not_ready` keeps the job
/// polling after the configured delay, any other error fails the fetch.
#[derive(Debug)]
pub struct ReportClient<A, D = TokioDelay> {
    api: A,
    delay: D,
    options: FetchOptions,
}

impl<A: ReportApi> ReportClient<A> {
    pub fn new(api: A) -> Self {
        Self::with_delay(api, TokioDelay)
    }
}

impl<A: ReportApi, D: Delay> ReportClient<A, D> {
    pub fn with_delay(api: A, delay: D) -> Self {
        Self {
            api,
            delay,
            options: FetchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Queue the report. Any failure here is fatal for the fetch.
    pub async fn submit(&self, descriptor: &ReportDescriptor) -> Result<JobId, ClientError> {
        self.api.queue(descriptor).await.map_err(|err| {
            warn!(
                report_suite = descriptor.report_suite_id(),
                error = %err,
                "report queueing failed"
            );
            ClientError::Submission(err)
        })
    }

    /// Ask once whether the job has finished.
    pub async fn poll(&self, job: JobId) -> Result<PollOutcome, ClientError> {
        match self.api.get(job).await {
            Ok(report) => Ok(PollOutcome::Ready(report)),
            Err(err) if err.is_not_ready() => Ok(PollOutcome::NotReady),
            Err(ApiError::Service { code, description }) => Err(ClientError::Api {
                job,
                code,
                description,
            }),
            Err(ApiError::Transport(message)) => Err(ClientError::Transport { job, message }),
        }
    }

    /// Submit the descriptor and poll until the report is ready, the token is
    /// cancelled, or the deadline passes.
    pub async fn fetch(
        &self,
        descriptor: &ReportDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Report, ClientError> {
        let result = match self.options.deadline {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.fetch_until_ready(descriptor, cancel))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ClientError::DeadlineExceeded(deadline)),
                }
            }
            None => self.fetch_until_ready(descriptor, cancel).await,
        };

        if let Err(err) = &result {
            warn!(
                report_suite = descriptor.report_suite_id(),
                error = %err,
                "report fetch failed"
            );
        }
        result
    }

    async fn fetch_until_ready(
        &self,
        descriptor: &ReportDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Report, ClientError> {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            job = self.submit(descriptor) => job?,
        };
        info!(%job, report_suite = descriptor.report_suite_id(), "report queued");

        let mut attempt: u64 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                outcome = self.poll(job) => outcome?,
            };

            match outcome {
                PollOutcome::Ready(report) => {
                    info!(%job, attempts = attempt, "report ready");
                    return Ok(report);
                }
                PollOutcome::NotReady => {
                    debug!(
                        %job,
                        attempt,
                        wait_ms = whole_millis(self.options.poll_interval),
                        "report not ready"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                        _ = self.delay.wait(self.options.poll_interval) => {}
                    }
                }
            }
        }
    }
}

/// Milliseconds in `duration`, saturating at `u64::MAX`.
fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_saturate_for_huge_intervals() {
        assert_eq!(whole_millis(Duration::from_millis(250)), 250);
        assert_eq!(whole_millis(Duration::MAX), u64::MAX);
    }
}
