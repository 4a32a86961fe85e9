//! Day vote tally and the effects of a lynch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::deaths::DeathLedger;
use crate::game::events::{Event, EventKind, Notice};
use crate::game::players::Roster;
use crate::roles::{RoleKey, RoleState};
use crate::types::{DeathCause, PlayerId, Team};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoLynchReason {
    NoVotes,
    Tie,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteResult {
    Lynch { target: PlayerId, votes: u32 },
    NoLynch(NoLynchReason),
}

/// Plurality over cast ballots. An exact tie at the top lynches nobody.
pub fn tally<'a>(ballots: impl IntoIterator<Item = &'a PlayerId>) -> VoteResult {
    let mut counts: BTreeMap<&PlayerId, u32> = BTreeMap::new();
    for target in ballots {
        *counts.entry(target).or_insert(0) += 1;
    }
    let Some(top) = counts.values().copied().max() else {
        return VoteResult::NoLynch(NoLynchReason::NoVotes);
    };
    let mut leaders = counts.iter().filter(|(_, votes)| **votes == top);
    match (leaders.next(), leaders.next()) {
        (Some((target, _)), None) => VoteResult::Lynch {
            target: (*target).clone(),
            votes: top,
        },
        _ => VoteResult::NoLynch(NoLynchReason::Tie),
    }
}

/// Everything a day-time death produced.
#[derive(Debug, Clone, Default)]
pub struct DayResolution {
    pub events: Vec<Event>,
    pub notices: Vec<(PlayerId, Notice)>,
    /// Set when a pack-shield negated the lynch; nobody died.
    pub shielded_by: Option<PlayerId>,
    /// A last-stand role that now owes a forced kill choice.
    pub revenge: Option<PlayerId>,
    /// True roles exposed regardless of revelation mode.
    pub exposed: Vec<(PlayerId, RoleKey)>,
    pub bonus_kill_next: bool,
}

impl DayResolution {
    pub fn died(&self, id: &PlayerId) -> bool {
        self.events.iter().any(|e| e.is_death() && &e.subject == id)
    }
}

/// Applies the vote's verdict, including the one-time pack-shield and the
/// lynch-only effects.
pub fn apply_lynch(roster: &mut Roster, target: &PlayerId) -> DayResolution {
    let Some(victim) = roster.get(target) else {
        return DayResolution::default();
    };

    let is_evil = victim.team == Team::Evil;
    let is_hunter = victim.role_is(RoleKey::Hunter);
    let exposure = match &victim.role_state {
        RoleState::Witness {
            exposed: Some(exposed),
        } => Some(exposed.clone()),
        _ => None,
    };

    if is_evil {
        let guardian = roster
            .alive_with_role(RoleKey::PackGuardian)
            .find(|p| p.role_state.has_pack_shield())
            .map(|p| p.id.clone());
        if let Some(guardian) = guardian {
            if let Some(player) = roster.get_mut(&guardian) {
                player.role_state = RoleState::PackGuardian { shield_used: true };
            }
            debug!(%target, %guardian, "lynch negated by pack-shield");
            return DayResolution {
                events: vec![
                    Event::new(EventKind::ShieldUsed, guardian.clone())
                        .with_related(target.clone()),
                ],
                shielded_by: Some(guardian),
                ..DayResolution::default()
            };
        }
    }

    let mut resolution = resolve_death(roster, target, DeathCause::Vote, None);
    if !resolution.died(target) {
        return resolution;
    }
    if is_hunter {
        resolution.revenge = Some(target.clone());
    }
    if let Some(exposed) = exposure {
        if let Some(role) = roster.get(&exposed).and_then(|p| p.role) {
            resolution
                .events
                .push(Event::new(EventKind::Exposed, exposed.clone()).with_related(target.clone()));
            resolution.exposed.push((exposed, role));
        }
    }
    resolution
}

/// The last-stand shot fired by a lynched Hunter.
pub fn apply_last_stand(roster: &mut Roster, shooter: &PlayerId, target: &PlayerId) -> DayResolution {
    resolve_death(roster, target, DeathCause::LastStand, Some(shooter))
}

/// An execution forced by the Judge after a vote without a lynch.
pub fn apply_execution(roster: &mut Roster, judge: &PlayerId, target: &PlayerId) -> DayResolution {
    if let Some(player) = roster.get_mut(judge) {
        player.role_state = RoleState::Judge {
            authority_used: true,
        };
    }
    resolve_death(roster, target, DeathCause::Judged, Some(judge))
}

fn resolve_death(
    roster: &mut Roster,
    target: &PlayerId,
    cause: DeathCause,
    related: Option<&PlayerId>,
) -> DayResolution {
    let mut ledger = DeathLedger::new(roster);
    if ledger.kill(target, cause, related) {
        ledger.settle(vec![target.clone()]);
    }
    DayResolution {
        events: ledger.events,
        notices: ledger.notices,
        bonus_kill_next: ledger.bonus_kill_next,
        ..DayResolution::default()
    }
}
