use anyhow::{Error, Result, anyhow};
use reqwest::{Client, header::CONTENT_TYPE};
use tracing::{debug, info};

use crate::{config::Config, error::DeliveryError, models::alert::Alert};

const ALERTS_PATH: &str = "/api/v1/alerts";

pub struct AlertmanagerClient {
    http_client: Client,
    base_url: String,
}

impl AlertmanagerClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(config.alertmanager_timeout())
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        info!(base_url = %config.alertmanager_url, "Alertmanager client initialized");

        Ok(Self {
            http_client,
            base_url: config.alertmanager_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn alerts_url(&self) -> String {
        format!("{}{}", self.base_url, ALERTS_PATH)
    }

    /// Posts `alerts` as a JSON list. Any status below 400 counts as accepted.
    pub async fn send_alerts(&self, alerts: &[Alert]) -> Result<u16, DeliveryError> {
        let body = serde_json::to_vec(alerts).map_err(|e| DeliveryError::Encode(e.to_string()))?;

        let url = self.alerts_url();
        debug!(url = %url, alert_count = alerts.len(), "Posting alerts to alertmanager");

        let response = self
            .http_client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status().as_u16();

        if status < 400 {
            Ok(status)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DeliveryError::Rejected { status, body })
        }
    }
}
