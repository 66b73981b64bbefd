pub mod config;
pub mod db;
pub mod domain;
pub mod utilities;

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::{ConfigError, ReplayConfig, SuccessRange};
use crate::domain::{
    request::{descriptor_label, RawDescriptor, RequestDescriptor},
    response::{Outcome, RequestFailure, RequestOutcome},
    summary::RunSummary,
};
use crate::utilities::{request::build_target_url, response::build_outcome};

/// A request file that cannot be used at all. Nothing is sent when loading
/// fails.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Progress notifications emitted by [`ReplayApi::run`], in order.
#[derive(Debug)]
pub enum RunEvent<'a> {
    Started {
        total: usize,
    },
    Sending {
        index: usize,
        total: usize,
        descriptor: &'a RequestDescriptor,
    },
    /// Exactly one per processed descriptor, including rejected ones.
    Completed {
        total: usize,
        outcome: &'a RequestOutcome,
    },
    Finished(&'a RunSummary),
}

pub struct ReplayApi {
    pub client: reqwest::Client,
    pub url: Url,
    pub request_delay: Duration,
    pub timeout: Duration,
    pub success_range: SuccessRange,
}

impl ReplayApi {
    pub fn new(config: &ReplayConfig) -> Result<Self, ConfigError> {
        let url = config.url()?;
        let request_delay = config.request_delay()?;
        let timeout = config.timeout()?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("replay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(ReplayApi {
            client,
            url,
            request_delay,
            timeout,
            success_range: config.success_range,
        })
    }

    pub fn parse_descriptors(requests_json: &str) -> Result<Vec<RawDescriptor>, serde_json::Error> {
        serde_json::from_str(requests_json)
    }

    pub fn load_descriptors(path: &Path) -> Result<Vec<RawDescriptor>, LoadError> {
        debug!(path = %path.display(), "reading request file");
        let requests_json = fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let descriptors =
            Self::parse_descriptors(&requests_json).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(count = descriptors.len(), "loaded test requests");
        Ok(descriptors)
    }

    /// Sends one descriptor and waits for it to resolve. Never returns an
    /// error: transport problems and rejected statuses become failures.
    pub async fn send_descriptor(&self, index: usize, descriptor: &RequestDescriptor) -> RequestOutcome {
        let label = descriptor_label(index, descriptor.date.as_deref());
        let url = build_target_url(&self.url, descriptor.date.as_deref());
        debug!(%url, index, "submitting request");

        let res = match self.client.post(url).json(&descriptor.body).send().await {
            Ok(res) => res,
            Err(e) => {
                let message = self.describe_transport_error(&e);
                warn!(index, %label, error = %message, "request failed");
                return RequestOutcome {
                    index,
                    label,
                    http_status: None,
                    outcome: Outcome::Failure(RequestFailure::Network(message)),
                };
            }
        };

        let res_status = res.status();
        let res_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let outcome = match res.text().await {
            Ok(res_text) => build_outcome(&res_type, res_status, &res_text, self.success_range),
            Err(e) => Outcome::Failure(RequestFailure::Network(self.describe_transport_error(&e))),
        };
        match &outcome {
            Outcome::Success { .. } => debug!(index, status = res_status.as_u16(), "request succeeded"),
            Outcome::Failure(failure) => {
                warn!(index, %label, status = res_status.as_u16(), error = %failure, "request failed")
            }
        }

        RequestOutcome {
            index,
            label,
            http_status: Some(res_status.as_u16()),
            outcome,
        }
    }

    fn describe_transport_error(&self, e: &reqwest::Error) -> String {
        if e.is_timeout() {
            format!("request timed out after {} seconds", self.timeout.as_secs())
        } else if e.is_connect() {
            format!("could not connect to {}", self.url)
        } else {
            e.to_string()
        }
    }

    /// Replays every descriptor in order, one at a time.
    ///
    /// A descriptor without a usable body is recorded as a failure and not
    /// sent. The delay is only waited before a request when an earlier one was
    /// sent, so nothing is waited after the last request or around skipped
    /// descriptors. Cancelling `cancel` never interrupts a request in flight:
    /// the run stops before the next descriptor, or cuts the delay short.
    #[tracing::instrument(skip_all, fields(run_id = %Uuid::new_v4(), total = descriptors.len()))]
    pub async fn run<F>(
        &self,
        descriptors: Vec<RawDescriptor>,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> RunSummary
    where
        F: FnMut(RunEvent<'_>),
    {
        let started = Instant::now();
        let total = descriptors.len();
        on_event(RunEvent::Started { total });
        info!(url = %self.url, "starting run");

        let mut outcomes: Vec<RequestOutcome> = Vec::with_capacity(total);
        let mut interrupted = false;
        let mut sent_any = false;

        for (position, raw) in descriptors.into_iter().enumerate() {
            let index = position + 1;
            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            let label = descriptor_label(index, raw.date.as_deref());
            let descriptor = match RequestDescriptor::try_from(raw) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!(index, %label, error = %e, "skipping descriptor");
                    let outcome = RequestOutcome {
                        index,
                        label,
                        http_status: None,
                        outcome: Outcome::Failure(RequestFailure::InvalidDescriptor(e.0)),
                    };
                    on_event(RunEvent::Completed {
                        total,
                        outcome: &outcome,
                    });
                    outcomes.push(outcome);
                    continue;
                }
            };
            if !descriptor.has_iso_date() {
                warn!(index, %label, "date is not ISO-8601, sending it as-is");
            }

            // Pacing applies between requests that actually go out.
            if sent_any && !self.request_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.request_delay) => {}
                    _ = cancel.cancelled() => {
                        interrupted = true;
                        break;
                    }
                }
            }

            on_event(RunEvent::Sending {
                index,
                total,
                descriptor: &descriptor,
            });
            let outcome = self.send_descriptor(index, &descriptor).await;
            on_event(RunEvent::Completed {
                total,
                outcome: &outcome,
            });
            outcomes.push(outcome);
            sent_any = true;
        }

        if interrupted {
            warn!(processed = outcomes.len(), "run interrupted");
        }
        let summary = RunSummary::from_outcomes(total, &outcomes, interrupted, started.elapsed());
        info!(
            successful = summary.successful,
            failed = summary.failed,
            "run finished"
        );
        on_event(RunEvent::Finished(&summary));
        summary
    }
}
