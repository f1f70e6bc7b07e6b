use serde::{Deserialize, Serialize};

use crate::error::SetupError;

/// Gateway intents: a raw bit set, or a list of intent names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Intents {
    Bits(u64),
    Names(Vec<String>),
}

/// Discord gateway intent names and their bit positions.
const INTENT_BITS: &[(&str, u32)] = &[
    ("GUILDS", 0),
    ("GUILD_MEMBERS", 1),
    ("GUILD_MODERATION", 2),
    ("GUILD_BANS", 2),
    ("GUILD_EMOJIS_AND_STICKERS", 3),
    ("GUILD_INTEGRATIONS", 4),
    ("GUILD_WEBHOOKS", 5),
    ("GUILD_INVITES", 6),
    ("GUILD_VOICE_STATES", 7),
    ("GUILD_PRESENCES", 8),
    ("GUILD_MESSAGES", 9),
    ("GUILD_MESSAGE_REACTIONS", 10),
    ("GUILD_MESSAGE_TYPING", 11),
    ("DIRECT_MESSAGES", 12),
    ("DIRECT_MESSAGE_REACTIONS", 13),
    ("DIRECT_MESSAGE_TYPING", 14),
    ("MESSAGE_CONTENT", 15),
    ("GUILD_SCHEDULED_EVENTS", 16),
    ("AUTO_MODERATION_CONFIGURATION", 20),
    ("AUTO_MODERATION_EXECUTION", 21),
];

impl Intents {
    /// Resolve to a bit set. Unknown names are rejected.
    pub fn bits(&self) -> Result<u64, SetupError> {
        match self {
            Intents::Bits(bits) => Ok(*bits),
            Intents::Names(names) => names.iter().try_fold(0u64, |acc, name| {
                let wanted = name.trim().to_uppercase();
                INTENT_BITS
                    .iter()
                    .find(|(known, _)| *known == wanted)
                    .map(|(_, bit)| acc | (1u64 << bit))
                    .ok_or_else(|| SetupError::new(format!("Unknown gateway intent '{name}'")))
            }),
        }
    }
}
