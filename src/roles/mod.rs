//! Static role catalog.
//!
//! Every role is described by a [`RoleDef`]: its team, the aura an inspection
//! reports, and an optional night ability descriptor. The resolution pipeline
//! dispatches through the descriptor, so adding a role means adding a table
//! entry rather than touching the pipeline.

pub mod abilities;
pub mod state;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::types::{Aura, Team};

pub use abilities::{AbilityKind, NightAbility, Stage, TargetRule};
pub use state::RoleState;

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
pub enum RoleKey {
    Villager,
    Seer,
    Fool,
    GuardianAngel,
    Harlot,
    Hunter,
    Elder,
    Cupid,
    Lover,
    Judge,
    ApprenticeSeer,
    Cursed,
    Traitor,
    WildChild,
    Pacifist,
    Healer,
    Witness,
    Lycan,
    Wolf,
    AlphaWolf,
    WolfCub,
    Sorcerer,
    Shapeshifter,
    PackGuardian,
    SerialKiller,
    Tanner,
    Executioner,
    Doppelganger,
}

#[derive(Debug, Clone, Copy)]
pub struct RoleDef {
    pub key: RoleKey,
    pub team: Team,
    pub aura: Aura,
    pub ability: Option<NightAbility>,
    /// Weight of this role's ballot in the pack kill tally. Zero for non-pack roles.
    pub kill_weight: u8,
    /// At most one copy per game.
    pub unique: bool,
    /// Wins alone when it is the last player standing.
    pub lone_survivor: bool,
}

impl RoleDef {
    pub fn acts_at_night(&self) -> bool {
        self.ability.is_some()
    }

    pub fn is_pack_killer(&self) -> bool {
        self.kill_weight > 0
    }
}

/// Symmetric exclusion pairs: once one side is chosen the other is off the table.
pub const CONFLICTS: &[(RoleKey, RoleKey)] = &[
    (RoleKey::Seer, RoleKey::Fool),
    (RoleKey::Fool, RoleKey::ApprenticeSeer),
    (RoleKey::Doppelganger, RoleKey::WildChild),
    (RoleKey::Cursed, RoleKey::Traitor),
    (RoleKey::Hunter, RoleKey::Judge),
];

/// Roles whose aura deliberately differs from their team.
pub const AURA_EXCEPTIONS: &[(RoleKey, Aura)] = &[
    (RoleKey::Lycan, Aura::Evil),
    (RoleKey::Sorcerer, Aura::Good),
    (RoleKey::SerialKiller, Aura::Evil),
];

static CATALOG: Lazy<HashMap<RoleKey, RoleDef>> =
    Lazy::new(|| RoleKey::iter().map(|key| (key, build_def(key))).collect());

impl RoleKey {
    pub fn def(self) -> &'static RoleDef {
        &CATALOG[&self]
    }

    pub fn team(self) -> Team {
        self.def().team
    }

    pub fn aura(self) -> Aura {
        self.def().aura
    }

    pub fn conflicts_with(self, other: RoleKey) -> bool {
        CONFLICTS
            .iter()
            .any(|&(a, b)| (a == self && b == other) || (a == other && b == self))
    }

    pub fn is_seer(self) -> bool {
        matches!(self, RoleKey::Seer)
    }
}

fn build_def(key: RoleKey) -> RoleDef {
    use RoleKey::*;

    let team = match key {
        Wolf | AlphaWolf | WolfCub | Sorcerer | Shapeshifter | PackGuardian => Team::Evil,
        SerialKiller | Tanner | Executioner | Doppelganger => Team::Neutral,
        _ => Team::Good,
    };
    let aura = AURA_EXCEPTIONS
        .iter()
        .find(|(role, _)| *role == key)
        .map(|(_, aura)| *aura)
        .unwrap_or_else(|| Aura::from(team));
    let kill_weight = match key {
        Wolf | WolfCub => 1,
        AlphaWolf => 2,
        _ => 0,
    };
    RoleDef {
        key,
        team,
        aura,
        ability: abilities::ability_for(key),
        kill_weight,
        unique: !matches!(key, Villager | Wolf | Lover),
        lone_survivor: matches!(key, SerialKiller),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aura_follows_team_except_listed_roles() {
        for key in RoleKey::iter() {
            let def = key.def();
            match AURA_EXCEPTIONS.iter().find(|(role, _)| *role == key) {
                Some((_, aura)) => assert_eq!(def.aura, *aura, "{key}"),
                None => assert_eq!(def.aura, Aura::from(def.team), "{key}"),
            }
        }
    }

    #[test]
    fn conflicts_are_symmetric() {
        assert!(RoleKey::Seer.conflicts_with(RoleKey::Fool));
        assert!(RoleKey::Fool.conflicts_with(RoleKey::Seer));
        assert!(!RoleKey::Seer.conflicts_with(RoleKey::ApprenticeSeer));
    }

    #[test]
    fn only_wolves_vote_in_the_pack() {
        let pack: Vec<_> = RoleKey::iter()
            .filter(|key| key.def().is_pack_killer())
            .collect();
        assert_eq!(pack, vec![RoleKey::Wolf, RoleKey::AlphaWolf, RoleKey::WolfCub]);
        assert_eq!(RoleKey::AlphaWolf.def().kill_weight, 2);
    }
}
