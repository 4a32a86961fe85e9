use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Opaque, stable player identifier issued by the identity collaborator.
///
/// The engine only compares and hashes it; its structure is never parsed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Team {
    Good,
    Evil,
    Neutral,
}

impl Team {
    pub const ALL: [Team; 3] = [Team::Good, Team::Evil, Team::Neutral];
}

/// What an inspection reveals. May differ from [`Team`] for deceptive roles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Aura {
    Good,
    Evil,
    Unknown,
}

impl From<Team> for Aura {
    fn from(team: Team) -> Self {
        match team {
            Team::Good => Aura::Good,
            Team::Evil => Aura::Evil,
            Team::Neutral => Aura::Unknown,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum RevelationMode {
    #[default]
    Full,
    Hidden,
    AuraOnly,
    Progressive,
}

/// How a player died. Renders as the snake_case cause tag (`wolf_kill`, `vote`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    WolfKill,
    SerialKill,
    Vote,
    Judged,
    LastStand,
    Grief,
    MisdirectedProtection,
    VisitedWolf,
    VisitedVictim,
    Reflected,
}

impl DeathCause {
    /// Deaths caused by the wolf pack itself.
    pub fn is_pack_kill(self) -> bool {
        matches!(self, DeathCause::WolfKill)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerKind {
    Lobby,
    Night,
    Discussion,
    Vote,
    Judge,
    Revenge,
}
