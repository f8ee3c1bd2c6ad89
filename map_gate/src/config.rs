// MapGate - config.rs

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser};
use thiserror::Error;
use url::Url;

use crate::probe_manager::{ProbeConfig, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_CHECK_BASE_URL};
use crate::transport::TransportConfig;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("probe-deadline-secs ({deadline_ms} ms) is shorter than the slowest possible probe ({worst_case_ms} ms)")]
    DeadlineTooShort { deadline_ms: u128, worst_case_ms: u128 },
}

/// Settings shared by everything that runs a probe.
#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Base URL the archive path is appended to.
    #[arg(long, env = "MAP_GATE_CHECK_BASE_URL", default_value = DEFAULT_CHECK_BASE_URL)]
    pub check_base_url: String,

    /// Timeout for each GET or HEAD request, in seconds.
    #[arg(long, env = "MAP_GATE_REQUEST_TIMEOUT_SECS", default_value_t = 15)]
    pub request_timeout_secs: u64,

    /// Maximum redirect hops followed by the existence check.
    #[arg(long, env = "MAP_GATE_MAX_REDIRECTS", default_value_t = 10)]
    pub max_redirects: usize,

    /// HEAD attempts made while looking up the file size.
    #[arg(long, env = "MAP_GATE_SIZE_RETRIES", default_value_t = 3)]
    pub size_retries: u32,

    /// Delay before the second size attempt; doubles after each failure.
    #[arg(long, env = "MAP_GATE_INITIAL_BACKOFF_MS", default_value_t = 500)]
    pub initial_backoff_ms: u64,

    /// Append the archive path verbatim instead of percent-encoding each segment.
    #[arg(long, env = "MAP_GATE_RAW_PATHS")]
    pub raw_paths: bool,
}

impl ProbeArgs {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_http_url("check-base-url", &self.check_base_url)?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero("request-timeout-secs"));
        }
        Ok(())
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            base_url: self.check_base_url.clone(),
            max_retries: self.size_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            encode_segments: !self.raw_paths,
        }
    }

    /// Longest a probe can take when every request runs to its timeout:
    /// one GET, every HEAD attempt, and the backoff waits between them.
    pub fn worst_case_probe(&self) -> Duration {
        let timeout = Duration::from_secs(self.request_timeout_secs);
        let requests = timeout.saturating_mul(self.size_retries.saturating_add(1));
        let mut backoff = Duration::ZERO;
        let mut delay = Duration::from_millis(self.initial_backoff_ms);
        for _ in 1..self.size_retries {
            backoff = backoff.saturating_add(delay);
            delay = delay.saturating_mul(DEFAULT_BACKOFF_MULTIPLIER);
        }
        requests.saturating_add(backoff)
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            timeout: Duration::from_secs(self.request_timeout_secs),
            max_redirects: self.max_redirects,
            ..TransportConfig::default()
        }
    }
}

/// Map download edge handler.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Address to listen on.
    #[arg(long, env = "MAP_GATE_LISTEN", default_value = "127.0.0.1:8787")]
    pub listen: SocketAddr,

    /// Where a submission missing mapGroup or missionDisplayTitle is sent.
    #[arg(
        long,
        env = "MAP_GATE_MISSING_PARAMS_REDIRECT",
        default_value = "https://l4d2server.com/map"
    )]
    pub missing_params_redirect: String,

    /// Upper bound on a whole probe, in seconds. Must cover the slowest
    /// possible probe under the request timeout and retry settings.
    #[arg(long, env = "MAP_GATE_PROBE_DEADLINE_SECS", default_value_t = 90)]
    pub probe_deadline_secs: u64,

    #[command(flatten)]
    pub probe: ProbeArgs,
}

impl ServerArgs {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.probe.validate()?;
        check_http_url("missing-params-redirect", &self.missing_params_redirect)?;
        if self.probe_deadline_secs == 0 {
            return Err(ConfigError::Zero("probe-deadline-secs"));
        }
        let worst_case = self.probe.worst_case_probe();
        if self.probe_deadline() < worst_case {
            return Err(ConfigError::DeadlineTooShort {
                deadline_ms: self.probe_deadline().as_millis(),
                worst_case_ms: worst_case.as_millis(),
            });
        }
        Ok(())
    }

    pub fn probe_deadline(&self) -> Duration {
        Duration::from_secs(self.probe_deadline_secs)
    }
}

fn check_http_url(field: &'static str, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            field,
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}
