//! Death application and the effects chained off it.
//!
//! Shared by night resolution and the lynch path: every death goes through
//! [`DeathLedger::kill`], which refuses to resolve the same subject twice in
//! one pass, and [`DeathLedger::settle`] then runs transformations and chains
//! until no further deaths occur.

use std::collections::HashSet;

use tracing::debug;

use crate::game::events::{Event, EventKind, Notice};
use crate::game::players::Roster;
use crate::roles::{RoleKey, RoleState};
use crate::types::{DeathCause, PlayerId, Team};

pub struct DeathLedger<'a> {
    pub(crate) roster: &'a mut Roster,
    resolved: HashSet<PlayerId>,
    pub(crate) events: Vec<Event>,
    pub(crate) notices: Vec<(PlayerId, Notice)>,
    pub(crate) bonus_kill_next: bool,
}

impl<'a> DeathLedger<'a> {
    pub fn new(roster: &'a mut Roster) -> Self {
        Self {
            roster,
            resolved: HashSet::new(),
            events: Vec::new(),
            notices: Vec::new(),
            bonus_kill_next: false,
        }
    }

    pub fn is_resolved(&self, id: &PlayerId) -> bool {
        self.resolved.contains(id)
    }

    /// True when `id` is alive and has not already died in this pass.
    pub fn can_die(&self, id: &PlayerId) -> bool {
        !self.resolved.contains(id) && self.roster.is_alive(id)
    }

    /// Kills `id` once. Returns false for already-resolved or dead subjects.
    pub fn kill(&mut self, id: &PlayerId, cause: DeathCause, related: Option<&PlayerId>) -> bool {
        if self.resolved.contains(id) {
            return false;
        }
        if self.roster.kill(id, cause).is_err() {
            return false;
        }
        self.resolved.insert(id.clone());
        debug!(player = %id, %cause, "player died");
        let mut event = Event::death(id.clone(), cause);
        event.related = related.cloned();
        self.events.push(event);
        true
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn notify(&mut self, to: &PlayerId, notice: Notice) {
        self.notices.push((to.clone(), notice));
    }

    /// Runs death-triggered transformations and chained deaths to a fixpoint.
    pub fn settle(&mut self, newly_dead: Vec<PlayerId>) {
        let mut frontier = newly_dead;
        while !frontier.is_empty() {
            for dead in &frontier {
                self.transform_on_death(dead);
            }
            self.activate_sleepers();

            let mut next = Vec::new();
            for dead in &frontier {
                if let Some(partner) = self.grieving_partner(dead) {
                    if self.kill(&partner, DeathCause::Grief, Some(dead)) {
                        next.push(partner);
                    }
                }
                self.claim_disguise(dead);
                self.claim_inheritance(dead);
            }
            frontier = next;
        }
    }

    fn transform_on_death(&mut self, dead: &PlayerId) {
        if self.roster.get(dead).is_some_and(|p| p.role_is(RoleKey::WolfCub)) {
            self.bonus_kill_next = true;
        }
        let wards: Vec<PlayerId> = self
            .roster
            .alive_with_role(RoleKey::WildChild)
            .filter(|p| matches!(&p.role_state, RoleState::WildChild { mentor: Some(m) } if m == dead))
            .map(|p| p.id.clone())
            .collect();
        for ward in wards {
            self.convert(&ward, RoleKey::Wolf, Some(dead));
        }
    }

    fn activate_sleepers(&mut self) {
        if self.roster.alive_in_team(Team::Evil) > 0 {
            return;
        }
        let sleepers: Vec<PlayerId> = self
            .roster
            .alive_with_role(RoleKey::Traitor)
            .map(|p| p.id.clone())
            .collect();
        for sleeper in sleepers {
            self.convert(&sleeper, RoleKey::Wolf, None);
        }
    }

    pub(crate) fn convert(&mut self, id: &PlayerId, role: RoleKey, related: Option<&PlayerId>) {
        let Some(player) = self.roster.get_mut(id) else {
            return;
        };
        player.set_role(role);
        let mut event = Event::new(EventKind::Converted, id.clone());
        event.related = related.cloned();
        self.events.push(event);
        self.notify(id, Notice::RoleChanged { role });
    }

    fn grieving_partner(&self, dead: &PlayerId) -> Option<PlayerId> {
        let partner = self.roster.get(dead)?.bond.clone()?;
        self.can_die(&partner).then_some(partner)
    }

    fn claim_disguise(&mut self, dead: &PlayerId) {
        let Some(victim) = self.roster.get(dead) else {
            return;
        };
        if victim.last_death_cause.is_some_and(DeathCause::is_pack_kill) {
            return;
        }
        let (stolen_role, stolen_aura) = match victim.apparent_role() {
            Some(role) => (role, victim.aura),
            None => return,
        };
        let thieves: Vec<PlayerId> = self
            .roster
            .alive_with_role(RoleKey::Shapeshifter)
            .filter(|p| matches!(&p.role_state, RoleState::Shapeshifter { tagged: Some(t), .. } if t == dead))
            .map(|p| p.id.clone())
            .collect();
        for thief in thieves {
            if let Some(player) = self.roster.get_mut(&thief) {
                player.role_state = RoleState::Shapeshifter {
                    tagged: None,
                    disguise: Some(stolen_role),
                };
                player.aura = stolen_aura;
            }
            self.events
                .push(Event::new(EventKind::Disguised, thief.clone()).with_related(dead.clone()));
            self.notify(&thief, Notice::DisguisedAs { role: stolen_role });
        }
    }

    fn claim_inheritance(&mut self, dead: &PlayerId) {
        let Some(victim) = self.roster.get(dead) else {
            return;
        };
        let Some(dead_role) = victim.role else {
            return;
        };
        let dead_state = victim.role_state.clone();

        if dead_role.is_seer() {
            let apprentice = self
                .roster
                .alive_with_role(RoleKey::ApprenticeSeer)
                .map(|p| p.id.clone())
                .next();
            if let Some(apprentice) = apprentice {
                self.inherit(&apprentice, RoleKey::Seer, RoleState::None, dead);
            }
        }

        let mimics: Vec<PlayerId> = self
            .roster
            .alive_with_role(RoleKey::Doppelganger)
            .filter(|p| matches!(&p.role_state, RoleState::Doppelganger { model: Some(m) } if m == dead))
            .map(|p| p.id.clone())
            .collect();
        for mimic in mimics {
            self.inherit(&mimic, dead_role, dead_state.clone(), dead);
        }
    }

    fn inherit(&mut self, heir: &PlayerId, role: RoleKey, state: RoleState, from: &PlayerId) {
        if let Some(player) = self.roster.get_mut(heir) {
            player.set_role_with_state(role, state);
        }
        self.events
            .push(Event::new(EventKind::Inherited, heir.clone()).with_related(from.clone()));
        self.notify(heir, Notice::RoleChanged { role });
    }
}
