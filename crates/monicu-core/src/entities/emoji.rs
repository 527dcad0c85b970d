//! Emoji entity
//!
//! Custom emoji are identified by their platform id; standard (unicode) emoji
//! only have a name. The two form disjoint namespaces: a custom emoji with id
//! `123` never resolves to the standard emoji named `"123"`.

use crate::value_objects::Snowflake;

/// Emoji entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emoji {
    pub id: i64,
    pub discord_id: Option<Snowflake>,
    pub name: String,
}

impl Emoji {
    /// Lookup key for this row
    pub fn key(&self) -> EmojiRef {
        match self.discord_id {
            Some(id) => EmojiRef::Custom {
                id,
                name: self.name.clone(),
            },
            None => EmojiRef::Standard {
                name: self.name.clone(),
            },
        }
    }
}

/// Emoji lookup key as delivered by the platform
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EmojiRef {
    /// Community-defined emoji, keyed by id
    Custom { id: Snowflake, name: String },
    /// Unicode emoji, keyed by name
    Standard { name: String },
}

impl EmojiRef {
    /// Build a key from the raw `{id, name}` pair of an emoji payload
    ///
    /// Returns `None` when neither an id nor a name is present.
    pub fn from_parts(id: Option<Snowflake>, name: Option<&str>) -> Option<Self> {
        match (id, name) {
            (Some(id), name) => Some(Self::Custom {
                id,
                name: name.unwrap_or_default().to_string(),
            }),
            (None, Some(name)) if !name.is_empty() => Some(Self::Standard {
                name: name.to_string(),
            }),
            (None, _) => None,
        }
    }

    /// External id, present only for custom emoji
    pub fn discord_id(&self) -> Option<Snowflake> {
        match self {
            Self::Custom { id, .. } => Some(*id),
            Self::Standard { .. } => None,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        match self {
            Self::Custom { name, .. } | Self::Standard { name } => name,
        }
    }

    /// Form used in REST paths: `name:id` for custom emoji, the name otherwise
    pub fn api_name(&self) -> String {
        match self {
            Self::Custom { id, name } => format!("{name}:{id}"),
            Self::Standard { name } => name.clone(),
        }
    }
}

impl std::fmt::Display for EmojiRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.api_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts() {
        assert_eq!(
            EmojiRef::from_parts(Some(Snowflake::new(123)), Some("blob")),
            Some(EmojiRef::Custom {
                id: Snowflake::new(123),
                name: "blob".to_string()
            })
        );
        assert_eq!(
            EmojiRef::from_parts(None, Some("👍")),
            Some(EmojiRef::Standard {
                name: "👍".to_string()
            })
        );
        assert_eq!(EmojiRef::from_parts(None, Some("")), None);
        assert_eq!(EmojiRef::from_parts(None, None), None);
    }

    #[test]
    fn test_custom_and_standard_never_equal() {
        let custom = EmojiRef::Custom {
            id: Snowflake::new(123),
            name: "123".to_string(),
        };
        let standard = EmojiRef::Standard {
            name: "123".to_string(),
        };
        assert_ne!(custom, standard);
        assert_eq!(custom.name(), standard.name());
        assert_ne!(custom.discord_id(), standard.discord_id());
    }

    #[test]
    fn test_api_name() {
        let custom = EmojiRef::Custom {
            id: Snowflake::new(42),
            name: "party".to_string(),
        };
        assert_eq!(custom.api_name(), "party:42");

        let standard = EmojiRef::Standard {
            name: "🔥".to_string(),
        };
        assert_eq!(standard.api_name(), "🔥");
    }

    #[test]
    fn test_emoji_key_roundtrip() {
        let emoji = Emoji {
            id: 1,
            discord_id: None,
            name: "👍".to_string(),
        };
        assert_eq!(emoji.key().discord_id(), None);
        assert_eq!(emoji.key().name(), "👍");
    }
}
