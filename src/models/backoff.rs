use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub min: Duration,
    pub max: Duration,
    pub factor: f64,
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(5),
            max: Duration::from_secs(300),
            factor: 2.0,
            jitter: true,
        }
    }
}
