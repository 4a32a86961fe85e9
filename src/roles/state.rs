use serde::{Deserialize, Serialize};

use crate::roles::RoleKey;
use crate::types::PlayerId;

pub const ELDER_LIVES: u8 = 2;

/// Per-role mutable extension state, built when a role is (re)assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RoleState {
    #[default]
    None,
    Guardian {
        last_protected: Option<PlayerId>,
    },
    Elder {
        lives: u8,
    },
    Cupid {
        bonded: bool,
    },
    Judge {
        authority_used: bool,
    },
    WildChild {
        mentor: Option<PlayerId>,
    },
    Pacifist {
        peace_used: bool,
    },
    Healer {
        revive_used: bool,
    },
    Witness {
        exposed: Option<PlayerId>,
    },
    Shapeshifter {
        tagged: Option<PlayerId>,
        disguise: Option<RoleKey>,
    },
    PackGuardian {
        shield_used: bool,
    },
    Executioner {
        target: Option<PlayerId>,
    },
    Doppelganger {
        model: Option<PlayerId>,
    },
}

impl RoleState {
    pub fn initial(role: RoleKey) -> Self {
        match role {
            RoleKey::GuardianAngel => RoleState::Guardian {
                last_protected: None,
            },
            RoleKey::Elder => RoleState::Elder { lives: ELDER_LIVES },
            RoleKey::Cupid => RoleState::Cupid { bonded: false },
            RoleKey::Judge => RoleState::Judge {
                authority_used: false,
            },
            RoleKey::WildChild => RoleState::WildChild { mentor: None },
            RoleKey::Pacifist => RoleState::Pacifist { peace_used: false },
            RoleKey::Healer => RoleState::Healer { revive_used: false },
            RoleKey::Witness => RoleState::Witness { exposed: None },
            RoleKey::Shapeshifter => RoleState::Shapeshifter {
                tagged: None,
                disguise: None,
            },
            RoleKey::PackGuardian => RoleState::PackGuardian { shield_used: false },
            RoleKey::Executioner => RoleState::Executioner { target: None },
            RoleKey::Doppelganger => RoleState::Doppelganger { model: None },
            _ => RoleState::None,
        }
    }

    /// Roles that must make a forced choice during the first night.
    pub fn needs_first_night_choice(&self) -> bool {
        matches!(
            self,
            RoleState::Cupid { bonded: false }
                | RoleState::WildChild { mentor: None }
                | RoleState::Doppelganger { model: None }
        )
    }

    pub fn has_pack_shield(&self) -> bool {
        matches!(self, RoleState::PackGuardian { shield_used: false })
    }

    pub fn has_judge_authority(&self) -> bool {
        matches!(
            self,
            RoleState::Judge {
                authority_used: false
            }
        )
    }

    pub fn disguise(&self) -> Option<RoleKey> {
        match self {
            RoleState::Shapeshifter { disguise, .. } => *disguise,
            _ => None,
        }
    }
}
