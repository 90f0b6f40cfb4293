use serde::{Deserialize, Deserializer, Serialize};

/// Outer notification delivered on the queue. `message` holds the alarm as a JSON-encoded string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlarmEnvelope {
    #[serde(rename = "Message", default, deserialize_with = "null_as_default")]
    pub message: String,

    #[serde(rename = "MessageId", default, deserialize_with = "null_as_default")]
    pub message_id: String,

    #[serde(rename = "Subject", default, deserialize_with = "null_as_default")]
    pub subject: String,

    #[serde(rename = "Timestamp", default, deserialize_with = "null_as_default")]
    pub timestamp: String,

    #[serde(rename = "TopicArn", default, deserialize_with = "null_as_default")]
    pub topic_arn: String,

    #[serde(rename = "Type", default, deserialize_with = "null_as_default")]
    pub notification_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmEvent {
    #[serde(rename = "AWSAccountId", default, deserialize_with = "null_as_default")]
    pub aws_account_id: String,

    #[serde(rename = "AlarmDescription", default, deserialize_with = "null_as_default")]
    pub alarm_description: String,

    #[serde(rename = "AlarmName", default, deserialize_with = "null_as_default")]
    pub alarm_name: String,

    #[serde(rename = "NewStateReason", default, deserialize_with = "null_as_default")]
    pub new_state_reason: String,

    #[serde(rename = "NewStateValue", default, deserialize_with = "null_as_default")]
    pub new_state_value: String,

    #[serde(rename = "OldStateValue", default, deserialize_with = "null_as_default")]
    pub old_state_value: String,

    #[serde(rename = "Region", default, deserialize_with = "null_as_default")]
    pub region: String,

    #[serde(rename = "StateChangeTime", default, deserialize_with = "null_as_default")]
    pub state_change_time: String,

    #[serde(rename = "Trigger", default, deserialize_with = "null_as_default")]
    pub trigger: Trigger,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "MetricName", default, deserialize_with = "null_as_default")]
    pub metric_name: String,

    #[serde(rename = "Namespace", default, deserialize_with = "null_as_default")]
    pub namespace: String,

    #[serde(rename = "Dimensions", default, deserialize_with = "null_as_default")]
    pub dimensions: Vec<Dimension>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
}

impl AlarmEvent {
    /// Value of the first trigger dimension, empty when the alarm carries none.
    pub fn first_dimension_value(&self) -> &str {
        self.trigger
            .dimensions
            .first()
            .map(|d| d.value.as_str())
            .unwrap_or_default()
    }
}

// CloudWatch sends explicit nulls for unset fields such as AlarmDescription
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
