//! Shared fixtures: tables with hand-picked roles and helpers for driving
//! a `GameState` through its timers.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use werewolf_rs::game::{
    GameConfig, GameEvent, GamePhase, GameState, IntentPayload, NightContext, NightReport, Player,
    Roster, StepOutcome, resolve_night,
};
use werewolf_rs::roles::RoleKey;
use werewolf_rs::types::{DeathCause, PlayerId};

pub const SEED: u64 = 42;

pub fn id(i: usize) -> PlayerId {
    PlayerId::new(format!("p{i}"))
}

pub fn target(i: usize) -> IntentPayload {
    IntentPayload::Target(id(i))
}

pub fn config() -> GameConfig {
    GameConfig {
        min_players: 3,
        seed: Some(SEED),
        ..GameConfig::default()
    }
}

/// A roster where seat `i` holds `roles[i]`.
pub fn roster(roles: &[RoleKey]) -> Roster {
    let mut roster = Roster::new();
    for (i, role) in roles.iter().enumerate() {
        let mut player = Player::new(id(i), format!("P{i}"));
        player.set_role(*role);
        roster.add(player).expect("unique ids");
    }
    roster
}

pub fn bond(roster: &mut Roster, a: usize, b: usize) {
    for (one, other) in [(a, b), (b, a)] {
        roster.get_mut(&id(one)).expect("seated").bond = Some(id(other));
    }
}

/// Resolves a single night over `roster` with a fixed seed.
pub fn run_night(
    roster: &mut Roster,
    intents: &[(usize, IntentPayload)],
    day: u32,
    bonus_kill: bool,
) -> (NightReport, BTreeSet<PlayerId>) {
    let intents: BTreeMap<PlayerId, IntentPayload> = intents
        .iter()
        .map(|(seat, payload)| (id(*seat), payload.clone()))
        .collect();
    let mut protected = BTreeSet::new();
    let mut rng = StdRng::seed_from_u64(SEED);
    let report = resolve_night(
        roster,
        &mut protected,
        &mut rng,
        &intents,
        NightContext { day, bonus_kill },
    );
    (report, protected)
}

pub fn died(report: &NightReport) -> Vec<(PlayerId, DeathCause)> {
    report
        .deaths()
        .filter_map(|e| e.cause.map(|cause| (e.subject.clone(), cause)))
        .collect()
}

/// A started game on Night 1 whose seats were re-dealt to `roles`.
pub fn table(roles: &[RoleKey]) -> GameState {
    table_with(config(), roles)
}

pub fn table_with(config: GameConfig, roles: &[RoleKey]) -> GameState {
    let mut state = GameState::new(config, id(0), "P0", Instant::now());
    for i in 1..roles.len() {
        state.join(id(i), format!("P{i}")).expect("lobby open");
    }
    state.force_start(&id(0)).expect("host starts");
    for (i, role) in roles.iter().enumerate() {
        let player = state.roster.get_mut(&id(i)).expect("seated");
        player.set_role(*role);
        player.bond = None;
    }
    state
}

/// Fires the live timer as if it had run out.
pub fn expire(state: &mut GameState) -> StepOutcome {
    let (token, _) = state.active_timer().expect("a live timer");
    state.fire_timer(token).expect("live token")
}

/// Lets timers run out until `phase` is reached.
pub fn run_until(state: &mut GameState, phase: GamePhase) {
    for _ in 0..8 {
        if state.phase == phase {
            return;
        }
        expire(state);
    }
    panic!("never reached {phase}, stuck in {}", state.phase);
}

pub fn deaths(state: &GameState) -> Vec<(PlayerId, DeathCause)> {
    state
        .log()
        .iter()
        .filter_map(|event| match event {
            GameEvent::Died { player, cause, .. } => Some((player.clone(), *cause)),
            _ => None,
        })
        .collect()
}

pub fn alive(state: &GameState, i: usize) -> bool {
    state.roster.is_alive(&id(i))
}
