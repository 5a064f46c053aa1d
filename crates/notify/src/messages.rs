//! Health-check messages handed to notifiers by the alerting pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Status of a single Consul health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Passing,
    Warning,
    Critical,
    /// Anything Consul reports that is not one of the three known states
    /// (e.g. `maintenance`). The raw string is kept for logging.
    Unknown(String),
}

impl Default for Status {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl Status {
    /// Get the Consul wire string for this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Passing => "passing",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<&str> for Status {
    fn from(raw: &str) -> Self {
        match raw {
            "passing" => Self::Passing,
            "warning" => Self::Warning,
            "critical" => Self::Critical,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// One health-check observation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Message {
    pub node: String,
    #[serde(rename = "ServiceID", alias = "ServiceId")]
    pub service_id: String,
    pub service: String,
    #[serde(rename = "CheckID", alias = "CheckId")]
    pub check_id: String,
    pub check: String,
    pub status: Status,
    pub output: String,
    pub notes: String,
    /// Check interval in seconds, when the pipeline knows it.
    pub interval: Option<u64>,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_empty")]
    pub service_tags: Vec<String>,
}

/// Go encodes a nil slice as `null`; read it as an empty list.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Message {
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.status == Status::Critical
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.status == Status::Warning
    }

    #[must_use]
    pub fn is_passing(&self) -> bool {
        self.status == Status::Passing
    }
}

/// Overall health of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallStatus {
    Healthy,
    Unstable,
    Critical,
}

impl OverallStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "HEALTHY",
            Self::Unstable => "UNSTABLE",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate view of a batch: overall status plus per-state counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub overall: OverallStatus,
    pub pass: usize,
    pub warn: usize,
    pub fail: usize,
}

/// Ordered batch of messages for one notification cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Messages(pub Vec<Message>);

impl Messages {
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self(messages)
    }

    /// Summarize the batch.
    ///
    /// Messages whose status is neither passing, warning nor critical are
    /// not counted anywhere.
    #[must_use]
    pub fn summary(&self) -> Summary {
        let (mut pass, mut warn, mut fail) = (0, 0, 0);

        for message in &self.0 {
            match message.status {
                Status::Critical => fail += 1,
                Status::Warning => warn += 1,
                Status::Passing => pass += 1,
                Status::Unknown(_) => {}
            }
        }

        let overall = if fail > 0 {
            OverallStatus::Critical
        } else if warn > 0 {
            OverallStatus::Unstable
        } else {
            OverallStatus::Healthy
        };

        Summary {
            overall,
            pass,
            warn,
            fail,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }
}

impl From<Vec<Message>> for Messages {
    fn from(messages: Vec<Message>) -> Self {
        Self(messages)
    }
}

impl<'a> IntoIterator for &'a Messages {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(status: &str) -> Message {
        Message {
            node: "host1".to_string(),
            status: Status::from(status),
            ..Message::default()
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(Status::from("passing"), Status::Passing);
        assert_eq!(Status::from("warning"), Status::Warning);
        assert_eq!(Status::from("critical"), Status::Critical);
        assert_eq!(
            Status::from("maintenance"),
            Status::Unknown("maintenance".to_string())
        );
        assert_eq!(Status::from("maintenance").to_string(), "maintenance");
    }

    #[test]
    fn test_summary_counts_and_overall() {
        let messages = Messages::new(vec![
            with_status("passing"),
            with_status("warning"),
            with_status("critical"),
            with_status("critical"),
            with_status("bogus"),
        ]);

        let summary = messages.summary();
        assert_eq!(summary.overall, OverallStatus::Critical);
        assert_eq!((summary.pass, summary.warn, summary.fail), (1, 1, 2));
    }

    #[test]
    fn test_summary_unstable_and_healthy() {
        let unstable = Messages::new(vec![with_status("passing"), with_status("warning")]);
        assert_eq!(unstable.summary().overall, OverallStatus::Unstable);

        let healthy = Messages::new(vec![with_status("passing")]);
        assert_eq!(healthy.summary().overall, OverallStatus::Healthy);

        assert_eq!(Messages::default().summary().overall, OverallStatus::Healthy);
    }

    #[test]
    fn test_message_deserializes_consul_fields() {
        let json = r#"{
            "Node": "host1",
            "ServiceID": "db-1",
            "Service": "db-main",
            "CheckID": "service:db-1",
            "Check": "disk",
            "Status": "critical",
            "Output": "disk full",
            "ServiceTags": ["prod", "db"]
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.node, "host1");
        assert_eq!(message.service_id, "db-1");
        assert_eq!(message.check_id, "service:db-1");
        assert!(message.is_critical());
        assert_eq!(message.service_tags, vec!["prod", "db"]);
        assert!(message.timestamp.is_none());
    }

    #[test]
    fn test_null_service_tags_read_as_empty() {
        let json = r#"[{
            "Node": "host1",
            "ServiceID": "",
            "Service": "",
            "CheckID": "serfHealth",
            "Check": "Serf Health Status",
            "Status": "critical",
            "Output": "Agent not live or unreachable",
            "Timestamp": "0001-01-01T00:00:00Z",
            "ServiceTags": null
        }]"#;

        let messages: Messages = serde_json::from_str(json).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages.0[0].service_tags.is_empty());
        assert!(messages.0[0].is_critical());
        assert!(messages.0[0].timestamp.is_some());
    }

    #[test]
    fn test_messages_is_a_json_array() {
        let messages: Messages =
            serde_json::from_str(r#"[{"Node": "a", "Status": "passing"}, {"Node": "b"}]"#)
                .unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.0[0].is_passing());
        assert_eq!(messages.0[1].status, Status::Unknown(String::new()));
    }
}
