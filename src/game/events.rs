use serde::{Deserialize, Serialize};
use strum::Display;

use crate::roles::RoleKey;
use crate::types::{Aura, DeathCause, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Died,
    /// An attack was absorbed by a protection.
    Protected,
    /// An attack missed because the target was away from home.
    NearMiss,
    /// The target took a hit and lived.
    Survived,
    /// The target changed role (bite, sleeper activation, mentor loss).
    Converted,
    /// The target took over another player's role or appearance.
    Inherited,
    Disguised,
    Revived,
    Bonded,
    ShieldUsed,
    /// A dead player's true role was exposed regardless of revelation mode.
    Exposed,
    PeacefulNight,
}

/// Immutable record of one resolution outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub subject: PlayerId,
    pub cause: Option<DeathCause>,
    pub related: Option<PlayerId>,
}

impl Event {
    pub fn new(kind: EventKind, subject: PlayerId) -> Self {
        Self {
            kind,
            subject,
            cause: None,
            related: None,
        }
    }

    pub fn death(subject: PlayerId, cause: DeathCause) -> Self {
        Self {
            kind: EventKind::Died,
            subject,
            cause: Some(cause),
            related: None,
        }
    }

    pub fn with_related(mut self, related: PlayerId) -> Self {
        self.related = Some(related);
        self
    }

    pub fn with_cause(mut self, cause: DeathCause) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn is_death(&self) -> bool {
        self.kind == EventKind::Died
    }
}

/// Private information for a single player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    RoleAssigned { role: RoleKey },
    AuraSeen { target: PlayerId, aura: Aura },
    SeerFound { target: PlayerId, is_seer: bool },
    BondedTo { partner: PlayerId },
    RoleChanged { role: RoleKey },
    DisguisedAs { role: RoleKey },
    ExecutionerTarget { target: PlayerId },
    PackMembers { members: Vec<PlayerId> },
}
