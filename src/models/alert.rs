use serde::{Deserialize, Serialize};

pub const SEVERITY_CRITICAL: &str = "Critical";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(rename = "ASG", default, skip_serializing_if = "String::is_empty")]
    pub asg: String,

    #[serde(rename = "AWSAccountId", default, skip_serializing_if = "String::is_empty")]
    pub aws_account_id: String,

    #[serde(rename = "Description", default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(rename = "Reason", default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    #[serde(rename = "Region", default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    #[serde(rename = "SqsUrl", default)]
    pub source: String,
}

/// Labels Alertmanager groups and routes on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub env: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alertname: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity: String,

    #[serde(rename = "runbook", default, skip_serializing_if = "String::is_empty")]
    pub runbook_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub annotations: Annotations,

    #[serde(rename = "generatorURL", default)]
    pub generator_url: String,

    pub labels: Labels,
}

/// Named values pulled out of an alarm name. Groups that did not participate in the match stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub env: String,
    pub service: String,
    pub alert_name: String,
    pub runbook: String,
}
