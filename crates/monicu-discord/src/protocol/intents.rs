//! Gateway intents

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Event groups the gateway should deliver to this session
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u64 {
        const GUILDS = 1 << 0;
        const GUILD_MESSAGES = 1 << 9;
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        const MESSAGE_CONTENT = 1 << 15;
    }
}

impl Intents {
    /// Intents needed to mirror messages and reactions
    #[must_use]
    pub const fn mirror() -> Self {
        Self::GUILDS
            .union(Self::GUILD_MESSAGES)
            .union(Self::GUILD_MESSAGE_REACTIONS)
            .union(Self::MESSAGE_CONTENT)
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::mirror()
    }
}

impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::from_bits_truncate(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_intents_value() {
        assert_eq!(Intents::mirror().bits(), 1 | (1 << 9) | (1 << 10) | (1 << 15));
        assert_eq!(serde_json::to_string(&Intents::mirror()).unwrap(), "34305");
    }
}
