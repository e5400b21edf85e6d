//! Mood model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The mood a diary entry is tagged with.
///
/// Stored by name. The declaration order is the order moods are offered in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    #[default]
    Neutral,
    Happy,
    Angry,
    Bored,
    Calm,
    Depressed,
    Disappointed,
    Humorous,
    Lonely,
    Mysterious,
    Romantic,
    Shameful,
    Awful,
    Surprised,
    Suspicious,
    Tense,
}

impl Mood {
    /// Every mood, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::Neutral,
        Self::Happy,
        Self::Angry,
        Self::Bored,
        Self::Calm,
        Self::Depressed,
        Self::Disappointed,
        Self::Humorous,
        Self::Lonely,
        Self::Mysterious,
        Self::Romantic,
        Self::Shameful,
        Self::Awful,
        Self::Surprised,
        Self::Suspicious,
        Self::Tense,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Neutral => "Neutral",
            Self::Happy => "Happy",
            Self::Angry => "Angry",
            Self::Bored => "Bored",
            Self::Calm => "Calm",
            Self::Depressed => "Depressed",
            Self::Disappointed => "Disappointed",
            Self::Humorous => "Humorous",
            Self::Lonely => "Lonely",
            Self::Mysterious => "Mysterious",
            Self::Romantic => "Romantic",
            Self::Shameful => "Shameful",
            Self::Awful => "Awful",
            Self::Surprised => "Surprised",
            Self::Suspicious => "Suspicious",
            Self::Tense => "Tense",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mood {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|mood| mood.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown mood: {wanted}")))
    }
}
