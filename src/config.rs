use std::{net::SocketAddr, time::Duration};

use anyhow::{Error, Result, anyhow, bail};
use dotenvy::dotenv;
use regex::Regex;
use serde::Deserialize;

use crate::models::backoff::BackoffConfig;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_sqs_queue_url")]
    pub sqs_queue_url: String,
    #[serde(default)]
    pub aws_endpoint: Option<String>,
    #[serde(default)]
    pub aws_region: Option<String>,

    #[serde(default = "default_alertmanager_url")]
    pub alertmanager_url: String,

    #[serde(default)]
    pub alert_regex: String,

    #[serde(default = "default_metric_prefix")]
    pub metric_prefix: String,
    #[serde(default)]
    pub metrics_log_interval_seconds: Option<u64>,

    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_sqs_max_messages")]
    pub sqs_max_messages: i32,
    #[serde(default = "default_sqs_wait_time_seconds")]
    pub sqs_wait_time_seconds: i32,
    #[serde(default = "default_sqs_visibility_timeout_seconds")]
    pub sqs_visibility_timeout_seconds: i32,

    #[serde(default = "default_queue_timeout_seconds")]
    pub queue_timeout_seconds: u64,
    #[serde(default = "default_alertmanager_timeout_seconds")]
    pub alertmanager_timeout_seconds: u64,
    #[serde(default = "default_health_check_timeout_seconds")]
    pub health_check_timeout_seconds: u64,

    #[serde(default = "default_backoff_min_seconds")]
    pub backoff_min_seconds: u64,
    #[serde(default = "default_backoff_max_seconds")]
    pub backoff_max_seconds: u64,

    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_sqs_queue_url() -> String {
    "http://localhost:4100/queue/alerts1".to_string()
}

fn default_alertmanager_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_metric_prefix() -> String {
    "sqs2alertmanager".to_string()
}

fn default_listen_address() -> String {
    "0.0.0.0:8888".to_string()
}

fn default_sqs_max_messages() -> i32 {
    10
}

fn default_sqs_wait_time_seconds() -> i32 {
    10
}

fn default_sqs_visibility_timeout_seconds() -> i32 {
    120
}

fn default_queue_timeout_seconds() -> u64 {
    30
}

fn default_alertmanager_timeout_seconds() -> u64 {
    10
}

fn default_health_check_timeout_seconds() -> u64 {
    2
}

fn default_backoff_min_seconds() -> u64 {
    5
}

fn default_backoff_max_seconds() -> u64 {
    300
}

fn default_buffer_size() -> usize {
    1
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.sqs_queue_url.is_empty() {
            bail!("SQS_QUEUE_URL must not be empty");
        }

        if self.alertmanager_url.is_empty() {
            bail!("ALERTMANAGER_URL must not be empty");
        }

        if !(1..=10).contains(&self.sqs_max_messages) {
            bail!(
                "SQS_MAX_MESSAGES must be between 1 and 10, got {}",
                self.sqs_max_messages
            );
        }

        if !(0..=20).contains(&self.sqs_wait_time_seconds) {
            bail!(
                "SQS_WAIT_TIME_SECONDS must be between 0 and 20, got {}",
                self.sqs_wait_time_seconds
            );
        }

        if self.sqs_visibility_timeout_seconds < 0 {
            bail!("SQS_VISIBILITY_TIMEOUT_SECONDS must not be negative");
        }

        if self.queue_timeout_seconds <= self.sqs_wait_time_seconds as u64 {
            bail!(
                "QUEUE_TIMEOUT_SECONDS ({}) must exceed SQS_WAIT_TIME_SECONDS ({})",
                self.queue_timeout_seconds,
                self.sqs_wait_time_seconds
            );
        }

        if self.alertmanager_timeout_seconds == 0 || self.health_check_timeout_seconds == 0 {
            bail!("HTTP timeouts must be greater than zero");
        }

        if self.backoff_min_seconds == 0 || self.backoff_min_seconds > self.backoff_max_seconds {
            bail!(
                "invalid backoff bounds: min {}s, max {}s",
                self.backoff_min_seconds,
                self.backoff_max_seconds
            );
        }

        if self.buffer_size == 0 {
            bail!("BUFFER_SIZE must be at least 1");
        }

        if self.metrics_log_interval_seconds == Some(0) {
            bail!("METRICS_LOG_INTERVAL_SECONDS must be greater than zero when set");
        }

        let valid_prefix = !self.metric_prefix.is_empty()
            && self
                .metric_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
        if !valid_prefix {
            bail!(
                "METRIC_PREFIX '{}' may only contain [A-Za-z0-9_:]",
                self.metric_prefix
            );
        }

        self.listen_addr()?;

        Ok(())
    }

    /// Compiles the alarm name pattern. Called once at startup; a bad pattern aborts the process.
    pub fn compile_pattern(&self) -> Result<Regex, Error> {
        Regex::new(&self.alert_regex)
            .map_err(|e| anyhow!("Unable to compile ALERT_REGEX '{}': {}", self.alert_regex, e))
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, Error> {
        self.listen_address
            .parse()
            .map_err(|e| anyhow!("Invalid LISTEN_ADDRESS '{}': {}", self.listen_address, e))
    }

    pub fn backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            min: Duration::from_secs(self.backoff_min_seconds),
            max: Duration::from_secs(self.backoff_max_seconds),
            factor: 2.0,
            jitter: true,
        }
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_timeout_seconds)
    }

    pub fn alertmanager_timeout(&self) -> Duration {
        Duration::from_secs(self.alertmanager_timeout_seconds)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sqs_queue_url: default_sqs_queue_url(),
            aws_endpoint: None,
            aws_region: None,
            alertmanager_url: default_alertmanager_url(),
            alert_regex: String::new(),
            metric_prefix: default_metric_prefix(),
            metrics_log_interval_seconds: None,
            listen_address: default_listen_address(),
            sqs_max_messages: default_sqs_max_messages(),
            sqs_wait_time_seconds: default_sqs_wait_time_seconds(),
            sqs_visibility_timeout_seconds: default_sqs_visibility_timeout_seconds(),
            queue_timeout_seconds: default_queue_timeout_seconds(),
            alertmanager_timeout_seconds: default_alertmanager_timeout_seconds(),
            health_check_timeout_seconds: default_health_check_timeout_seconds(),
            backoff_min_seconds: default_backoff_min_seconds(),
            backoff_max_seconds: default_backoff_max_seconds(),
            buffer_size: default_buffer_size(),
        }
    }
}
