//! Night action resolution.
//!
//! Submitted intents are dispatched through each role's ability descriptor in
//! [`Stage`] order. Kill intents are only collected during dispatch; the kill
//! steps then run in a fixed sequence:
//!
//! 1. protections (dispatched in [`Stage::Protect`])
//! 2. pack kills, tallied by weight with a seeded tie-break
//! 3. solo kills
//! 4. immunity: extra lives, reflection, pack-shield
//! 5. transformations: bites, then death-triggered conversions
//! 6. chained deaths, disguises and inheritance
//!
//! A peaceful night skips steps 2-6 for everything but peace-exempt abilities.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use smallvec::SmallVec;
use tracing::debug;

use crate::game::deaths::DeathLedger;
use crate::game::events::{Event, EventKind, Notice};
use crate::game::intent::{IntentPayload, candidates, legal_night_payloads, usable_ability};
use crate::game::players::Roster;
use crate::roles::{NightAbility, RoleKey, RoleState, Stage};
use crate::types::{Aura, DeathCause, PlayerId};

#[derive(Debug, Clone, Copy, Default)]
pub struct NightContext {
    pub day: u32,
    /// The pack lost a cub and may strike twice tonight.
    pub bonus_kill: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NightReport {
    pub events: Vec<Event>,
    pub notices: Vec<(PlayerId, Notice)>,
    pub peaceful: bool,
    pub bonus_kill_next: bool,
}

impl NightReport {
    pub fn deaths(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.is_death())
    }
}

type Attackers = SmallVec<[PlayerId; 4]>;

#[derive(Debug, Clone)]
struct Hit {
    target: PlayerId,
    cause: DeathCause,
    attackers: Attackers,
}

pub struct NightPass<'a> {
    ledger: DeathLedger<'a>,
    rng: &'a mut StdRng,
    protected: &'a mut BTreeSet<PlayerId>,
    peace_by: Option<PlayerId>,
    away: BTreeMap<PlayerId, PlayerId>,
    pack_votes: Vec<(PlayerId, PlayerId, u8)>,
    solo_attacks: Vec<(PlayerId, PlayerId)>,
    queued: Vec<(PlayerId, DeathCause, Option<PlayerId>)>,
    hits: Vec<Hit>,
}

/// Resolves one night. `protected` is the game's protection set; it is
/// extended here and must be cleared by the caller when a new night opens.
pub fn resolve_night(
    roster: &mut Roster,
    protected: &mut BTreeSet<PlayerId>,
    rng: &mut StdRng,
    intents: &BTreeMap<PlayerId, IntentPayload>,
    ctx: NightContext,
) -> NightReport {
    forget_skipped_protections(roster, intents);

    let mut staged: Vec<(Stage, PlayerId, NightAbility, IntentPayload)> = intents
        .iter()
        .filter(|(_, payload)| !matches!(payload, IntentPayload::Pass))
        .filter_map(|(actor, payload)| {
            let ability = usable_ability(roster.get(actor)?, ctx.day)?;
            Some((ability.stage(), actor.clone(), ability, payload.clone()))
        })
        .collect();
    staged.sort_by_key(|(stage, ..)| *stage);

    let mut pass = NightPass {
        ledger: DeathLedger::new(roster),
        rng,
        protected,
        peace_by: None,
        away: BTreeMap::new(),
        pack_votes: Vec::new(),
        solo_attacks: Vec::new(),
        queued: Vec::new(),
        hits: Vec::new(),
    };

    let (before_revive, revivals): (Vec<_>, Vec<_>) = staged
        .into_iter()
        .partition(|(stage, ..)| *stage < Stage::Revive);

    for (_, actor, ability, payload) in &before_revive {
        if pass.is_peaceful() && !ability.kind.peace_exempt() {
            continue;
        }
        (ability.resolve)(&mut pass, actor, payload);
    }

    if !pass.is_peaceful() {
        pass.resolve_pack(ctx.bonus_kill);
        pass.resolve_visits();
        pass.resolve_solo();
        pass.apply_immunities();
    }
    pass.apply_queued_deaths();

    for (_, actor, ability, payload) in &revivals {
        (ability.resolve)(&mut pass, actor, payload);
    }

    pass.finish()
}

/// A guardian who sat a night out may return to the ward it had before.
fn forget_skipped_protections(roster: &mut Roster, intents: &BTreeMap<PlayerId, IntentPayload>) {
    for player in roster.iter_mut() {
        let protects_tonight = intents
            .get(&player.id)
            .is_some_and(|payload| payload.target().is_some());
        if let RoleState::Guardian { last_protected } = &mut player.role_state {
            if !protects_tonight {
                *last_protected = None;
            }
        }
    }
}

/// Makes a random choice for every forced first-night decision left open.
pub fn fill_forced_choices(
    roster: &Roster,
    day: u32,
    intents: &mut BTreeMap<PlayerId, IntentPayload>,
    rng: &mut StdRng,
) {
    for player in roster.alive() {
        if intents.contains_key(&player.id) || !player.role_state.needs_first_night_choice() {
            continue;
        }
        let options: Vec<IntentPayload> = legal_night_payloads(roster, day, &player.id)
            .into_iter()
            .filter(|p| !matches!(p, IntentPayload::Pass))
            .collect();
        if let Some(choice) = options.choose(rng) {
            debug!(player = %player.id, ?choice, "forced choice made on player's behalf");
            intents.insert(player.id.clone(), choice.clone());
        }
    }
}

impl NightPass<'_> {
    fn roster(&self) -> &Roster {
        &*self.ledger.roster
    }

    fn roster_mut(&mut self) -> &mut Roster {
        &mut *self.ledger.roster
    }

    pub fn is_peaceful(&self) -> bool {
        self.peace_by.is_some()
    }

    pub(crate) fn activate_peace(&mut self, actor: &PlayerId) {
        if let Some(player) = self.roster_mut().get_mut(actor) {
            player.role_state = RoleState::Pacifist { peace_used: true };
        }
        self.peace_by = Some(actor.clone());
    }

    pub(crate) fn bond(&mut self, actor: &PlayerId, a: &PlayerId, b: &PlayerId) {
        if let Some(cupid) = self.roster_mut().get_mut(actor) {
            cupid.role_state = RoleState::Cupid { bonded: true };
        }
        for (one, other) in [(a, b), (b, a)] {
            let displaced = self
                .roster_mut()
                .get_mut(one)
                .and_then(|player| player.bond.replace(other.clone()));
            if let Some(old) = displaced.filter(|old| old != other) {
                if let Some(partner) = self.roster_mut().get_mut(&old) {
                    if partner.bond.as_ref() == Some(one) {
                        partner.bond = None;
                    }
                }
            }
            self.ledger.notify(one, Notice::BondedTo {
                partner: other.clone(),
            });
        }
        self.ledger
            .push(Event::new(EventKind::Bonded, a.clone()).with_related(b.clone()));
    }

    pub(crate) fn choose_mentor(&mut self, actor: &PlayerId, target: &PlayerId) {
        if let Some(player) = self.roster_mut().get_mut(actor) {
            player.role_state = RoleState::WildChild {
                mentor: Some(target.clone()),
            };
        }
    }

    pub(crate) fn choose_model(&mut self, actor: &PlayerId, target: &PlayerId) {
        if let Some(player) = self.roster_mut().get_mut(actor) {
            player.role_state = RoleState::Doppelganger {
                model: Some(target.clone()),
            };
        }
    }

    pub(crate) fn tag(&mut self, actor: &PlayerId, target: &PlayerId) {
        if let Some(player) = self.roster_mut().get_mut(actor) {
            if let RoleState::Shapeshifter { tagged, .. } = &mut player.role_state {
                *tagged = Some(target.clone());
            }
        }
    }

    pub(crate) fn commit_expose(&mut self, actor: &PlayerId, target: &PlayerId) {
        if let Some(player) = self.roster_mut().get_mut(actor) {
            player.role_state = RoleState::Witness {
                exposed: Some(target.clone()),
            };
        }
    }

    /// Step 1. Protecting an Evil player costs the protector their life.
    pub(crate) fn protect(&mut self, actor: &PlayerId, target: &PlayerId) {
        if let Some(guardian) = self.roster_mut().get_mut(actor) {
            guardian.role_state = RoleState::Guardian {
                last_protected: Some(target.clone()),
            };
        }
        let target_is_evil = self.roster().get(target).is_some_and(|p| p.is_evil());
        if target_is_evil {
            self.queued.push((
                actor.clone(),
                DeathCause::MisdirectedProtection,
                Some(target.clone()),
            ));
        } else {
            self.protected.insert(target.clone());
        }
    }

    pub(crate) fn visit(&mut self, actor: &PlayerId, host: &PlayerId) {
        self.away.insert(actor.clone(), host.clone());
    }

    pub(crate) fn reveal_aura(&mut self, actor: &PlayerId, target: &PlayerId) {
        if let Some(aura) = self.roster().get(target).map(|p| p.aura) {
            self.ledger.notify(actor, Notice::AuraSeen {
                target: target.clone(),
                aura,
            });
        }
    }

    pub(crate) fn reveal_random_aura(&mut self, actor: &PlayerId, target: &PlayerId) {
        let aura = if self.rng.gen_bool(0.5) {
            Aura::Good
        } else {
            Aura::Evil
        };
        self.ledger.notify(actor, Notice::AuraSeen {
            target: target.clone(),
            aura,
        });
    }

    pub(crate) fn reveal_seer(&mut self, actor: &PlayerId, target: &PlayerId) {
        let is_seer = self
            .roster()
            .get(target)
            .and_then(|p| p.role)
            .is_some_and(RoleKey::is_seer);
        self.ledger.notify(actor, Notice::SeerFound {
            target: target.clone(),
            is_seer,
        });
    }

    pub(crate) fn revive(&mut self, actor: &PlayerId, target: &PlayerId) {
        if let Some(healer) = self.roster_mut().get_mut(actor) {
            healer.role_state = RoleState::Healer { revive_used: true };
        }
        if self.ledger.is_resolved(target) {
            return;
        }
        if self.roster_mut().revive(target) {
            self.ledger
                .push(Event::new(EventKind::Revived, target.clone()).with_related(actor.clone()));
        }
    }

    pub(crate) fn pack_vote(&mut self, actor: &PlayerId, target: &PlayerId) {
        let weight = self
            .roster()
            .get(actor)
            .and_then(|p| p.role)
            .map_or(0, |role| role.def().kill_weight);
        if weight > 0 {
            self.pack_votes.push((actor.clone(), target.clone(), weight));
        }
    }

    pub(crate) fn solo_attack(&mut self, actor: &PlayerId, target: &PlayerId) {
        self.solo_attacks.push((actor.clone(), target.clone()));
    }

    /// Step 2. Plurality of weighted pack votes, random among ties.
    fn resolve_pack(&mut self, bonus_kill: bool) {
        let mut tally: BTreeMap<PlayerId, u32> = BTreeMap::new();
        let mut voters: BTreeMap<PlayerId, Attackers> = BTreeMap::new();
        for (voter, target, weight) in &self.pack_votes {
            if !self.ledger.roster.is_alive(target) {
                continue;
            }
            *tally.entry(target.clone()).or_insert(0) += u32::from(*weight);
            voters.entry(target.clone()).or_default().push(voter.clone());
        }
        let all_voters: Attackers = self
            .pack_votes
            .iter()
            .map(|(voter, ..)| voter.clone())
            .unique()
            .collect();

        let Some(first) = pick_plurality(&tally, self.rng) else {
            return;
        };
        let mut targets = vec![first.clone()];
        if bonus_kill {
            tally.remove(&first);
            let second = pick_plurality(&tally, self.rng)
                .or_else(|| self.random_bonus_target(&first));
            if let Some(second) = second {
                targets.push(second);
            }
        }
        for target in targets {
            let attackers = voters.get(&target).cloned().unwrap_or_else(|| all_voters.clone());
            self.strike(&target, DeathCause::WolfKill, attackers);
        }
    }

    fn random_bonus_target(&mut self, first: &PlayerId) -> Option<PlayerId> {
        let pool: Vec<PlayerId> = self
            .roster()
            .alive()
            .filter(|p| !p.is_pack_killer() && &p.id != first)
            .map(|p| p.id.clone())
            .collect();
        pool.choose(self.rng).cloned()
    }

    /// Visitors die when they call on a wolf or on the pack's unprotected victim.
    fn resolve_visits(&mut self) {
        let victims: BTreeSet<PlayerId> = self
            .hits
            .iter()
            .filter(|hit| hit.cause == DeathCause::WolfKill)
            .map(|hit| hit.target.clone())
            .collect();
        let visits: Vec<(PlayerId, PlayerId)> = self
            .away
            .iter()
            .map(|(visitor, host)| (visitor.clone(), host.clone()))
            .collect();
        for (visitor, host) in visits {
            let host_is_wolf = self.roster().get(&host).is_some_and(|p| p.is_pack_killer());
            if host_is_wolf {
                self.queued
                    .push((visitor, DeathCause::VisitedWolf, Some(host)));
            } else if victims.contains(&host) {
                self.queued
                    .push((visitor, DeathCause::VisitedVictim, Some(host)));
            }
        }
    }

    /// Step 3.
    fn resolve_solo(&mut self) {
        let attacks = std::mem::take(&mut self.solo_attacks);
        for (actor, target) in attacks {
            let mut attackers = Attackers::new();
            attackers.push(actor);
            self.strike(&target, DeathCause::SerialKill, attackers);
        }
    }

    /// Records an attack unless protection or absence spares the target.
    fn strike(&mut self, target: &PlayerId, cause: DeathCause, attackers: Attackers) {
        if !self.ledger.can_die(target) {
            return;
        }
        if self.protected.contains(target) {
            self.ledger
                .push(Event::new(EventKind::Protected, target.clone()).with_cause(cause));
            return;
        }
        if self.away.contains_key(target) {
            self.ledger
                .push(Event::new(EventKind::NearMiss, target.clone()).with_cause(cause));
            return;
        }
        self.hits.push(Hit {
            target: target.clone(),
            cause,
            attackers,
        });
    }

    /// Steps 4 and 5a: extra lives, reflection, and bites.
    fn apply_immunities(&mut self) {
        let hits = std::mem::take(&mut self.hits);
        let mut bites = Vec::new();
        for hit in hits {
            let Some(player) = self.roster().get(&hit.target) else {
                continue;
            };
            let role = player.role;
            let lives = match player.role_state {
                RoleState::Elder { lives } => Some(lives),
                _ => None,
            };

            if let Some(lives) = lives.filter(|lives| *lives > 1) {
                if let Some(elder) = self.roster_mut().get_mut(&hit.target) {
                    elder.role_state = RoleState::Elder { lives: lives - 1 };
                }
                self.ledger.push(
                    Event::new(EventKind::Survived, hit.target.clone()).with_cause(hit.cause),
                );
                continue;
            }

            if role == Some(RoleKey::SerialKiller) && hit.cause == DeathCause::WolfKill {
                self.ledger.push(
                    Event::new(EventKind::Survived, hit.target.clone()).with_cause(hit.cause),
                );
                self.reflect(&hit);
                continue;
            }

            if role == Some(RoleKey::Cursed) && hit.cause == DeathCause::WolfKill {
                bites.push(hit.target.clone());
                continue;
            }

            self.queued.push((hit.target, hit.cause, None));
        }

        for bitten in bites {
            self.ledger.convert(&bitten, RoleKey::Wolf, None);
        }
    }

    /// A pack-shield absorbs the reflected kill; otherwise one attacker dies.
    fn reflect(&mut self, hit: &Hit) {
        let guardian = self
            .roster()
            .alive_with_role(RoleKey::PackGuardian)
            .find(|p| p.role_state.has_pack_shield())
            .map(|p| p.id.clone());
        if let Some(guardian) = guardian {
            if let Some(player) = self.roster_mut().get_mut(&guardian) {
                player.role_state = RoleState::PackGuardian { shield_used: true };
            }
            self.ledger.push(
                Event::new(EventKind::ShieldUsed, guardian).with_related(hit.target.clone()),
            );
            return;
        }
        let living: Vec<PlayerId> = hit
            .attackers
            .iter()
            .filter(|id| self.ledger.can_die(id))
            .cloned()
            .collect();
        if let Some(victim) = living.choose(self.rng) {
            self.queued
                .push((victim.clone(), DeathCause::Reflected, Some(hit.target.clone())));
        }
    }

    /// Steps 5b and 6.
    fn apply_queued_deaths(&mut self) {
        let queued = std::mem::take(&mut self.queued);
        let mut newly_dead = Vec::new();
        for (id, cause, related) in queued {
            if self.ledger.kill(&id, cause, related.as_ref()) {
                newly_dead.push(id);
            }
        }
        self.ledger.settle(newly_dead);
    }

    fn finish(self) -> NightReport {
        let NightPass {
            mut ledger,
            peace_by,
            ..
        } = self;
        if let Some(pacifist) = &peace_by {
            ledger.push(Event::new(EventKind::PeacefulNight, pacifist.clone()));
        }
        NightReport {
            events: ledger.events,
            notices: ledger.notices,
            peaceful: peace_by.is_some(),
            bonus_kill_next: ledger.bonus_kill_next,
        }
    }
}

/// Highest tally wins; ties are broken uniformly at random.
fn pick_plurality(tally: &BTreeMap<PlayerId, u32>, rng: &mut StdRng) -> Option<PlayerId> {
    let top = tally.values().copied().max()?;
    let tied: Vec<&PlayerId> = tally
        .iter()
        .filter(|(_, count)| **count == top)
        .map(|(id, _)| id)
        .collect();
    tied.choose(rng).map(|id| (*id).clone())
}

/// Candidate list used by bots and tests to aim a single-target ability.
pub fn night_targets(roster: &Roster, actor: &PlayerId, day: u32) -> Vec<PlayerId> {
    let Some(player) = roster.get(actor) else {
        return Vec::new();
    };
    match usable_ability(player, day) {
        Some(ability) => candidates(roster, player, ability.target_rule),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::game::players::Player;

    fn setup(roles: &[RoleKey]) -> Roster {
        let mut roster = Roster::new();
        for (i, role) in roles.iter().enumerate() {
            let mut player = Player::new(PlayerId::new(format!("p{i}")), format!("P{i}"));
            player.set_role(*role);
            roster.add(player).expect("unique");
        }
        roster
    }

    fn id(i: usize) -> PlayerId {
        PlayerId::new(format!("p{i}"))
    }

    #[test]
    fn plurality_breaks_ties_within_tied_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let tally: BTreeMap<PlayerId, u32> = [(id(1), 2), (id(2), 2), (id(3), 1)].into();
        for _ in 0..20 {
            let pick = pick_plurality(&tally, &mut rng).expect("non-empty");
            assert!(pick == id(1) || pick == id(2));
        }
    }

    #[test]
    fn alpha_vote_outweighs_a_single_wolf() {
        let mut roster = setup(&[
            RoleKey::AlphaWolf,
            RoleKey::Wolf,
            RoleKey::Villager,
            RoleKey::Villager,
        ]);
        let intents: BTreeMap<PlayerId, IntentPayload> = [
            (id(0), IntentPayload::Target(id(2))),
            (id(1), IntentPayload::Target(id(3))),
        ]
        .into();
        let mut protected = BTreeSet::new();
        let mut rng = StdRng::seed_from_u64(1);
        let report = resolve_night(
            &mut roster,
            &mut protected,
            &mut rng,
            &intents,
            NightContext {
                day: 2,
                bonus_kill: false,
            },
        );
        let dead: Vec<_> = report.deaths().map(|e| e.subject.clone()).collect();
        assert_eq!(dead, vec![id(2)]);
    }

    #[test]
    fn elder_survives_the_first_bite() {
        let mut roster = setup(&[RoleKey::Wolf, RoleKey::Elder, RoleKey::Villager]);
        let intents: BTreeMap<PlayerId, IntentPayload> =
            [(id(0), IntentPayload::Target(id(1)))].into();
        let mut protected = BTreeSet::new();
        let mut rng = StdRng::seed_from_u64(1);
        let ctx = NightContext {
            day: 1,
            bonus_kill: false,
        };
        let report = resolve_night(&mut roster, &mut protected, &mut rng, &intents, ctx);
        assert_eq!(report.deaths().count(), 0);
        assert!(report.events.iter().any(|e| e.kind == EventKind::Survived));

        let report = resolve_night(&mut roster, &mut protected, &mut rng, &intents, ctx);
        assert_eq!(report.deaths().count(), 1);
    }

    #[test]
    fn forced_choices_are_filled_at_random() {
        let roster = setup(&[RoleKey::Cupid, RoleKey::Villager, RoleKey::Wolf]);
        let mut intents = BTreeMap::new();
        let mut rng = StdRng::seed_from_u64(3);
        fill_forced_choices(&roster, 1, &mut intents, &mut rng);
        assert!(matches!(intents.get(&id(0)), Some(IntentPayload::Pair(..))));
    }
}
