//! Gateway frame envelope

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{HelloPayload, IdentifyPayload, OpCode, ResumePayload};

/// `{"op", "d", "s", "t"}` as sent and received on the socket
///
/// `s` and `t` are only present on dispatches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayFrame {
    pub op: OpCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    /// Always serialized, as `null` when absent
    #[serde(default)]
    pub d: Option<Value>,
}

impl GatewayFrame {
    fn outgoing(op: OpCode, d: Value) -> Self {
        Self {
            op,
            t: None,
            s: None,
            d: Some(d),
        }
    }

    /// Heartbeat carrying the last dispatch sequence, or `null` before any
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::outgoing(OpCode::Heartbeat, last_sequence.into())
    }

    pub fn identify(payload: &IdentifyPayload) -> Result<Self, serde_json::Error> {
        Ok(Self::outgoing(OpCode::Identify, serde_json::to_value(payload)?))
    }

    pub fn resume(payload: &ResumePayload) -> Result<Self, serde_json::Error> {
        Ok(Self::outgoing(OpCode::Resume, serde_json::to_value(payload)?))
    }

    fn data_as<T: DeserializeOwned>(&self, op: OpCode) -> Option<T> {
        if self.op != op {
            return None;
        }
        T::deserialize(self.d.as_ref()?).ok()
    }

    pub fn as_hello(&self) -> Option<HelloPayload> {
        self.data_as(OpCode::Hello)
    }

    /// `Some(resumable)` for an invalid-session frame
    pub fn as_invalid_session(&self) -> Option<bool> {
        if self.op != OpCode::InvalidSession {
            return None;
        }
        Some(self.data_as(OpCode::InvalidSession).unwrap_or(false))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl fmt::Display for GatewayFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        match (&self.t, self.s) {
            (Some(t), Some(s)) => write!(f, " {t} #{s}"),
            (Some(t), None) => write!(f, " {t}"),
            _ => Ok(()),
        }
    }
}
