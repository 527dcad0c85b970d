//! Payload definitions for Hello, Identify, and Resume

use serde::{Deserialize, Serialize};

use super::Intents;

/// Payload for op 10 (Hello)
///
/// Sent by the gateway immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Bot token (without the `Bot ` prefix)
    pub token: String,

    /// Event groups to receive
    pub intents: Intents,

    /// Client connection properties
    pub properties: IdentifyProperties,
}

impl IdentifyPayload {
    #[must_use]
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        Self {
            token: token.into(),
            intents,
            properties: IdentifyProperties::default(),
        }
    }
}

/// Client connection properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: env!("CARGO_PKG_NAME").to_string(),
            device: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// Payload for op 4 (Resume)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    pub token: String,
    pub session_id: String,
    /// Last sequence number received
    pub seq: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_serialization() {
        let identify = IdentifyPayload::new("abc", Intents::mirror());
        let json = serde_json::to_value(&identify).unwrap();
        assert_eq!(json["token"], "abc");
        assert_eq!(json["intents"], 34305);
        assert_eq!(json["properties"]["browser"], "monicu-discord");
    }

    #[test]
    fn test_resume_serialization() {
        let resume = ResumePayload {
            token: "abc".to_string(),
            session_id: "s1".to_string(),
            seq: None,
        };
        let json = serde_json::to_value(&resume).unwrap();
        assert_eq!(json["session_id"], "s1");
        assert!(json["seq"].is_null());
    }
}
