//! Gateway close codes

use std::fmt;

/// Close code received when the gateway ends the connection
///
/// Any `u16` is representable; the constants are the 4xxx codes Discord
/// documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseCode(pub u16);

impl CloseCode {
    pub const UNKNOWN_ERROR: Self = Self(4000);
    pub const UNKNOWN_OPCODE: Self = Self(4001);
    pub const DECODE_ERROR: Self = Self(4002);
    pub const NOT_AUTHENTICATED: Self = Self(4003);
    pub const AUTHENTICATION_FAILED: Self = Self(4004);
    pub const ALREADY_AUTHENTICATED: Self = Self(4005);
    pub const INVALID_SEQUENCE: Self = Self(4007);
    pub const RATE_LIMITED: Self = Self(4008);
    pub const SESSION_TIMED_OUT: Self = Self(4009);
    pub const INVALID_SHARD: Self = Self(4010);
    pub const SHARDING_REQUIRED: Self = Self(4011);
    pub const INVALID_API_VERSION: Self = Self(4012);
    pub const INVALID_INTENTS: Self = Self(4013);
    pub const DISALLOWED_INTENTS: Self = Self(4014);

    /// Reconnecting with the same token and intents would fail again
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self.0, 4004 | 4010..=4014)
    }

    /// The session survives and can be resumed
    #[must_use]
    pub const fn is_resumable(self) -> bool {
        !self.is_fatal() && !matches!(self.0, 4007 | 4009)
    }

    fn reason(self) -> Option<&'static str> {
        Some(match self.0 {
            1000 => "normal closure",
            1001 => "going away",
            4000 => "unknown error",
            4001 => "unknown opcode",
            4002 => "decode error",
            4003 => "not authenticated",
            4004 => "authentication failed",
            4005 => "already authenticated",
            4007 => "invalid sequence",
            4008 => "rate limited",
            4009 => "session timed out",
            4010 => "invalid shard",
            4011 => "sharding required",
            4012 => "invalid API version",
            4013 => "invalid intents",
            4014 => "disallowed intents",
            _ => return None,
        })
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{} ({reason})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_codes() {
        assert!(CloseCode::AUTHENTICATION_FAILED.is_fatal());
        assert!(CloseCode::DISALLOWED_INTENTS.is_fatal());
        assert!(CloseCode::INVALID_SHARD.is_fatal());
        assert!(!CloseCode::UNKNOWN_ERROR.is_fatal());
        assert!(!CloseCode(1000).is_fatal());
    }

    #[test]
    fn test_resumable_codes() {
        assert!(CloseCode::UNKNOWN_ERROR.is_resumable());
        assert!(CloseCode::RATE_LIMITED.is_resumable());
        assert!(!CloseCode::INVALID_SEQUENCE.is_resumable());
        assert!(!CloseCode::SESSION_TIMED_OUT.is_resumable());
        assert!(!CloseCode::AUTHENTICATION_FAILED.is_resumable());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CloseCode::AUTHENTICATION_FAILED.to_string(),
            "4004 (authentication failed)"
        );
        assert_eq!(CloseCode(4999).to_string(), "4999");
    }
}
