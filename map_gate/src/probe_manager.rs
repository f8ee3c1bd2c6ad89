// MapGate - probe_manager.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::metadata::{truncate_error, ProbeInput, ProbeOutcome};
use crate::transport::{ProbeTransport, SizeResponse, TransportError};

pub const DEFAULT_CHECK_BASE_URL: &str = "https://maps.nyase.ru/d";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub base_url: String,
    /// Number of HEAD attempts in the size lookup.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub backoff_multiplier: u32,
    /// Percent-encode `mapGroup` and the file name as path segments of the check URL.
    pub encode_segments: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CHECK_BASE_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            encode_segments: true,
        }
    }
}

/// Waits between size lookup attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// How a single HEAD attempt turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeAttempt {
    Found(u64),
    MissingLength,
    UnreadableLength(String),
    Rejected(u16),
    Failed(String),
}

impl SizeAttempt {
    pub fn classify(result: Result<SizeResponse, TransportError>) -> Self {
        match result {
            Ok(response) if response.is_success() => match response.content_length {
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(size) => SizeAttempt::Found(size),
                    Err(_) => SizeAttempt::UnreadableLength(raw),
                },
                None => SizeAttempt::MissingLength,
            },
            Ok(response) => SizeAttempt::Rejected(response.status),
            Err(e) => SizeAttempt::Failed(truncate_error(&e.to_string())),
        }
    }

    /// Sentence appended to `details` for this attempt.
    pub fn note(&self, attempt: u32) -> String {
        match self {
            SizeAttempt::Found(_) => {
                format!("File size obtained via HEAD request on attempt {attempt}.")
            }
            SizeAttempt::MissingLength => {
                format!("File exists, but HEAD request (attempt {attempt}) returned no Content-Length.")
            }
            SizeAttempt::UnreadableLength(raw) => format!(
                "File exists, but HEAD request (attempt {attempt}) returned an unreadable Content-Length '{}'.",
                truncate_error(raw)
            ),
            SizeAttempt::Rejected(status) => {
                format!("File exists, but HEAD request (attempt {attempt}) returned status {status}.")
            }
            SizeAttempt::Failed(err) => format!(
                "HEAD request failed (attempt {attempt}): {}.",
                err.trim_end_matches('.')
            ),
        }
    }
}

/// Checks whether a map archive is published and, if so, how large it is.
///
/// Phase one is a redirect-following GET against the check URL. Phase two,
/// run only when the file exists, is a bounded series of HEAD requests
/// against the terminal URL with exponential backoff between attempts.
/// Nothing escapes `probe`: every failure ends up in the returned outcome.
#[derive(Clone)]
pub struct FileAvailabilityProbe {
    config: ProbeConfig,
    transport: Arc<dyn ProbeTransport>,
    sleeper: Arc<dyn Sleeper>,
}

impl FileAvailabilityProbe {
    pub fn new(config: ProbeConfig, transport: Arc<dyn ProbeTransport>) -> Self {
        Self::with_sleeper(config, transport, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        config: ProbeConfig,
        transport: Arc<dyn ProbeTransport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            transport,
            sleeper,
        }
    }

    /// The URL the existence GET is sent to.
    pub fn check_url(&self, input: &ProbeInput) -> String {
        if self.config.encode_segments {
            if let Some(url) = encoded_check_url(&self.config.base_url, input) {
                return url;
            }
            warn!(base_url = %self.config.base_url, "base URL is not hierarchical, concatenating path verbatim");
        }
        format!("{}{}", self.config.base_url, input.file_path())
    }

    /// Outcome as it stands before any request is sent.
    pub fn pending_outcome(&self, input: &ProbeInput) -> ProbeOutcome {
        ProbeOutcome::pending(input.file_path(), self.check_url(input))
    }

    pub async fn probe(&self, map_group: &str, mission_display_title: &str) -> ProbeOutcome {
        let input = ProbeInput::new(map_group, mission_display_title);
        self.probe_input(&input).await
    }

    pub async fn probe_input(&self, input: &ProbeInput) -> ProbeOutcome {
        let mut outcome = self.pending_outcome(input);
        self.check_existence(&mut outcome).await;
        if outcome.file_exists {
            self.lookup_size(&mut outcome).await;
        }
        outcome
    }

    /// Like `probe_input`, but gives up once `deadline` has elapsed.
    ///
    /// Expiry during the existence check is reported as an unreachable
    /// upstream. Expiry during the size lookup keeps what the existence check
    /// found and leaves `file_size` unset.
    pub async fn probe_within(&self, input: &ProbeInput, deadline: Duration) -> ProbeOutcome {
        let expires = Instant::now() + deadline;
        let mut outcome = self.pending_outcome(input);

        if timeout_at(expires, self.check_existence(&mut outcome)).await.is_err() {
            warn!(?deadline, "existence check abandoned at deadline");
            outcome.mark_unreachable(format!(
                "The file check did not finish within {} ms and was abandoned.",
                deadline.as_millis()
            ));
            return outcome;
        }

        if outcome.file_exists
            && timeout_at(expires, self.lookup_size(&mut outcome)).await.is_err()
        {
            warn!(?deadline, "size lookup abandoned at deadline");
            outcome.file_size = None;
            outcome.note(format!(
                "The size lookup did not finish within {} ms and was abandoned.",
                deadline.as_millis()
            ));
        }
        outcome
    }

    async fn check_existence(&self, outcome: &mut ProbeOutcome) {
        info!(url = %outcome.full_check_url, "checking file availability");
        let existence = self.transport.get(&outcome.full_check_url).await;
        if let Err(e) = &existence {
            warn!(url = %outcome.full_check_url, error = %e, "existence check could not reach upstream");
        }
        outcome.apply_existence(&existence);
        info!(
            status = outcome.external_status,
            exists = outcome.file_exists,
            final_url = %outcome.final_redirect_url,
            "existence check finished"
        );
    }

    async fn lookup_size(&self, outcome: &mut ProbeOutcome) {
        let head_url = outcome.final_redirect_url.clone();
        let max_retries = self.config.max_retries;
        let mut delay = self.config.initial_backoff;

        for attempt in 1..=max_retries {
            debug!(attempt, max_retries, url = %head_url, "requesting file size");
            let result = SizeAttempt::classify(self.transport.head(&head_url).await);
            outcome.note(result.note(attempt));

            if let SizeAttempt::Found(size) = result {
                info!(attempt, size, "file size found");
                outcome.file_size = Some(size);
                return;
            }
            warn!(attempt, ?result, "size lookup attempt did not produce a size");

            if attempt < max_retries {
                debug!(?delay, "backing off before next size attempt");
                self.sleeper.sleep(delay).await;
                delay = delay.saturating_mul(self.config.backoff_multiplier);
            }
        }

        outcome.note(format!(
            "Could not determine the file size after {max_retries} attempts."
        ));
    }
}

fn encoded_check_url(base_url: &str, input: &ProbeInput) -> Option<String> {
    let mut url = Url::parse(base_url).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(&input.map_group)
        .push(&input.file_name());
    Some(url.into())
}
