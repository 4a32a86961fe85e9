//! Revelation policy: what the table learns about a player.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::players::{Player, Roster};
use crate::roles::RoleKey;
use crate::types::{Aura, PlayerId, RevelationMode, Team};

/// Last day on which progressive revelation shows only auras.
pub const PROGRESSIVE_AURA_DAYS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disclosure {
    Role(RoleKey),
    Aura(Aura),
    Nothing,
}

pub fn disclose(mode: RevelationMode, day: u32, player: &Player) -> Disclosure {
    let role = match player.apparent_role() {
        Some(role) => role,
        None => return Disclosure::Nothing,
    };
    match mode {
        RevelationMode::Full => Disclosure::Role(role),
        RevelationMode::Hidden => Disclosure::Nothing,
        RevelationMode::AuraOnly => Disclosure::Aura(player.aura),
        RevelationMode::Progressive if day <= PROGRESSIVE_AURA_DAYS => {
            Disclosure::Aura(player.aura)
        }
        RevelationMode::Progressive => Disclosure::Role(role),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Composition {
    Roles(BTreeMap<RoleKey, usize>),
    Teams(BTreeMap<Team, usize>),
    Hidden,
}

/// The game-start announcement of what is in play.
pub fn composition(mode: RevelationMode, roster: &Roster) -> Composition {
    match mode {
        RevelationMode::Full => {
            let mut roles = BTreeMap::new();
            for role in roster.iter().filter_map(|p| p.role) {
                *roles.entry(role).or_insert(0) += 1;
            }
            Composition::Roles(roles)
        }
        RevelationMode::AuraOnly | RevelationMode::Progressive => {
            let mut teams = BTreeMap::new();
            for player in roster.iter() {
                *teams.entry(player.team).or_insert(0) += 1;
            }
            Composition::Teams(teams)
        }
        RevelationMode::Hidden => Composition::Hidden,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
    /// Only dead players are disclosed.
    pub disclosure: Option<Disclosure>,
}

pub fn public_roster(mode: RevelationMode, day: u32, roster: &Roster) -> Vec<RosterEntry> {
    roster
        .iter()
        .map(|p| RosterEntry {
            id: p.id.clone(),
            name: p.display_name.clone(),
            alive: p.alive,
            disclosure: (!p.alive).then(|| disclose(mode, day, p)),
        })
        .collect()
}
