use std::{collections::HashMap, time::Instant};

use anyhow::{Error, Result, anyhow};
use chrono::Utc;
use reqwest::Client;
use tracing::{debug, warn};

use crate::{
    config::Config,
    models::health::{HealthCheckResponse, HealthStatus, ServiceHealth},
};

/// A named HTTP endpoint probed on every health check.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    pub name: String,
    pub url: String,
}

pub struct HealthChecker {
    http_client: Client,
    probes: Vec<HealthProbe>,
}

impl HealthChecker {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let probes = vec![
            HealthProbe {
                name: "alertmanager".to_string(),
                url: config.alertmanager_url.clone(),
            },
            HealthProbe {
                name: "aws-sqs".to_string(),
                url: config.sqs_queue_url.clone(),
            },
        ];

        Self::with_probes(config, probes)
    }

    pub fn with_probes(config: &Config, probes: Vec<HealthProbe>) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(config.health_check_timeout())
            .build()
            .map_err(|e| anyhow!("Failed to create health check HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            probes,
        })
    }

    pub async fn check_all(&self) -> HealthCheckResponse {
        let mut checks = HashMap::new();

        for probe in &self.probes {
            let health = self.check_endpoint(probe).await;
            checks.insert(probe.name.clone(), health);
        }

        let status = Self::determine_overall_status(&checks);

        HealthCheckResponse {
            status,
            timestamp: Utc::now(),
            checks,
        }
    }

    /// Any status above 499 and unreachable endpoints are unhealthy; anything below 500 is up.
    async fn check_endpoint(&self, probe: &HealthProbe) -> ServiceHealth {
        let start = Instant::now();

        match self.http_client.get(&probe.url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.as_u16() > 499 {
                    warn!(probe = %probe.name, status = %status, "Health check failed");
                    ServiceHealth::unhealthy(status.to_string()).with_status_code(status.as_u16())
                } else {
                    let elapsed = start.elapsed().as_millis() as u64;
                    debug!(probe = %probe.name, response_time_ms = elapsed, "Health check passed");
                    ServiceHealth::healthy(elapsed).with_status_code(status.as_u16())
                }
            }
            Err(e) => {
                warn!(probe = %probe.name, error = %e, "Health check request failed");
                ServiceHealth::unhealthy(format!("Request failed: {}", e))
            }
        }
    }

    fn determine_overall_status(checks: &HashMap<String, ServiceHealth>) -> HealthStatus {
        let has_unhealthy = checks
            .values()
            .any(|health| health.status == HealthStatus::Unhealthy);

        if has_unhealthy {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Healthy
        }
    }
}
