//! Usage event entities

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata key carrying the byte size of an export
pub const DATA_SIZE_KEY: &str = "dataSize";

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Unique identifier for a usage event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageEventId(String);

impl UsageEventId {
    /// Create a usage event ID from an existing value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique ID
    pub fn generate() -> Self {
        Self(format!("usage-event-{}", uuid::Uuid::new_v4()))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UsageEventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UsageEventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of tracked feature action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageEventType {
    TriageSession,
    ApiCall,
    ReportGeneration,
    DataExport,
    UserInvitation,
}

impl UsageEventType {
    pub const ALL: [UsageEventType; 5] = [
        Self::TriageSession,
        Self::ApiCall,
        Self::ReportGeneration,
        Self::DataExport,
        Self::UserInvitation,
    ];

    /// The quota-bearing feature this action counts against
    pub fn feature(self) -> Option<UsageFeature> {
        match self {
            Self::TriageSession => Some(UsageFeature::TriageSession),
            Self::ReportGeneration => Some(UsageFeature::ReportGeneration),
            Self::DataExport => Some(UsageFeature::DataExport),
            Self::UserInvitation => Some(UsageFeature::UserInvitation),
            Self::ApiCall => None,
        }
    }
}

impl std::fmt::Display for UsageEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TriageSession => write!(f, "TRIAGE_SESSION"),
            Self::ApiCall => write!(f, "API_CALL"),
            Self::ReportGeneration => write!(f, "REPORT_GENERATION"),
            Self::DataExport => write!(f, "DATA_EXPORT"),
            Self::UserInvitation => write!(f, "USER_INVITATION"),
        }
    }
}

impl std::str::FromStr for UsageEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "TRIAGE_SESSION" => Ok(Self::TriageSession),
            "API_CALL" => Ok(Self::ApiCall),
            "REPORT_GENERATION" => Ok(Self::ReportGeneration),
            "DATA_EXPORT" => Ok(Self::DataExport),
            "USER_INVITATION" => Ok(Self::UserInvitation),
            other => Err(format!("Unknown usage event type: {}", other)),
        }
    }
}

/// A feature with a per-tier quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageFeature {
    TriageSession,
    ReportGeneration,
    DataExport,
    UserInvitation,
    Storage,
}

impl UsageFeature {
    pub const ALL: [UsageFeature; 5] = [
        Self::TriageSession,
        Self::ReportGeneration,
        Self::DataExport,
        Self::UserInvitation,
        Self::Storage,
    ];
}

impl std::fmt::Display for UsageFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TriageSession => write!(f, "TRIAGE_SESSION"),
            Self::ReportGeneration => write!(f, "REPORT_GENERATION"),
            Self::DataExport => write!(f, "DATA_EXPORT"),
            Self::UserInvitation => write!(f, "USER_INVITATION"),
            Self::Storage => write!(f, "STORAGE"),
        }
    }
}

/// Free-form event metadata
pub type EventMetadata = HashMap<String, serde_json::Value>;

/// One tracked action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    id: UsageEventId,
    pub user_id: String,
    pub event_type: UsageEventType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: EventMetadata,
    synced_to_server: bool,
}

impl UsageEvent {
    /// Create an unsynced event stamped with the current time
    pub fn new(user_id: impl Into<String>, event_type: UsageEventType) -> Self {
        Self {
            id: UsageEventId::generate(),
            user_id: user_id.into(),
            event_type,
            timestamp: Utc::now(),
            metadata: EventMetadata::new(),
            synced_to_server: false,
        }
    }

    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn id(&self) -> &UsageEventId {
        &self.id
    }

    pub fn is_synced(&self) -> bool {
        self.synced_to_server
    }

    /// Record server acknowledgement. There is no way back to unsynced.
    pub fn mark_synced(&mut self) {
        self.synced_to_server = true;
    }

    /// Size of the exported data in GB, when the metadata carries one
    pub fn data_size_gb(&self) -> Option<f64> {
        self.metadata
            .get(DATA_SIZE_KEY)
            .and_then(|v| v.as_f64())
            .filter(|bytes| bytes.is_finite() && *bytes > 0.0)
            .map(|bytes| bytes / BYTES_PER_GB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_event_is_unsynced() {
        let event = UsageEvent::new("user-1", UsageEventType::TriageSession);
        assert!(event.id().as_str().starts_with("usage-event-"));
        assert!(!event.is_synced());
        assert!(event.metadata.is_empty());
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = UsageEvent::new("user-1", UsageEventType::ApiCall);
        let b = UsageEvent::new("user-1", UsageEventType::ApiCall);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_mark_synced() {
        let mut event = UsageEvent::new("user-1", UsageEventType::ApiCall);
        event.mark_synced();
        assert!(event.is_synced());
    }

    #[test]
    fn test_data_size_in_gb() {
        let mut metadata = EventMetadata::new();
        metadata.insert(DATA_SIZE_KEY.to_string(), serde_json::json!(536_870_912u64));
        let event = UsageEvent::new("user-1", UsageEventType::DataExport).with_metadata(metadata);
        assert_eq!(event.data_size_gb(), Some(0.5));

        let mut metadata = EventMetadata::new();
        metadata.insert(DATA_SIZE_KEY.to_string(), serde_json::json!("large"));
        let event = UsageEvent::new("user-1", UsageEventType::DataExport).with_metadata(metadata);
        assert_eq!(event.data_size_gb(), None);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let event = UsageEvent::new("user-1", UsageEventType::ReportGeneration);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["userId"], "user-1");
        assert_eq!(value["eventType"], "REPORT_GENERATION");
        assert_eq!(value["syncedToServer"], false);
        assert!(value["id"].as_str().unwrap().starts_with("usage-event-"));

        let parsed: UsageEvent = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_event_type_parsing() {
        assert_eq!(
            "data-export".parse::<UsageEventType>().unwrap(),
            UsageEventType::DataExport
        );
        assert_eq!(UsageEventType::ApiCall.feature(), None);
        assert_eq!(
            UsageEventType::UserInvitation.feature(),
            Some(UsageFeature::UserInvitation)
        );
        assert!("unknown".parse::<UsageEventType>().is_err());
    }
}
