//! Role assignment at the Lobby to Night 1 transition.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::game::GameError;
use crate::roles::RoleKey;
use crate::types::{PlayerId, Team};

pub const EVIL_RATIO: f64 = 0.25;
pub const NEUTRAL_RATIO: f64 = 0.15;
/// One bonded pair per this many players.
pub const PLAYERS_PER_BONDED_PAIR: usize = 8;

/// Weighted choice between the two seer variants.
const SEER_VARIANTS: [(RoleKey, u32); 2] = [(RoleKey::Seer, 80), (RoleKey::Fool, 20)];
const ALWAYS_PRESENT: [RoleKey; 1] = [RoleKey::GuardianAngel];
const VILLAGER_CHANCE: f64 = 0.35;
const EVIL_SPECIALIST_CHANCE: f64 = 0.5;

const EVIL_SPECIALISTS: [RoleKey; 5] = [
    RoleKey::AlphaWolf,
    RoleKey::WolfCub,
    RoleKey::Sorcerer,
    RoleKey::Shapeshifter,
    RoleKey::PackGuardian,
];
const NEUTRAL_POOL: [RoleKey; 4] = [
    RoleKey::SerialKiller,
    RoleKey::Tanner,
    RoleKey::Executioner,
    RoleKey::Doppelganger,
];
const GOOD_POOL: [RoleKey; 13] = [
    RoleKey::Harlot,
    RoleKey::Hunter,
    RoleKey::Elder,
    RoleKey::Cupid,
    RoleKey::Judge,
    RoleKey::ApprenticeSeer,
    RoleKey::Cursed,
    RoleKey::Traitor,
    RoleKey::WildChild,
    RoleKey::Pacifist,
    RoleKey::Healer,
    RoleKey::Witness,
    RoleKey::Lycan,
];

#[derive(Debug, Clone, Default)]
pub struct Assignment {
    /// One role per player, in the order players were passed in.
    pub roles: Vec<(PlayerId, RoleKey)>,
    pub bonds: Vec<(PlayerId, PlayerId)>,
    /// Executioner and the Good player it needs lynched.
    pub executioner_targets: Vec<(PlayerId, PlayerId)>,
}

impl Assignment {
    pub fn role_of(&self, id: &PlayerId) -> Option<RoleKey> {
        self.roles.iter().find(|(p, _)| p == id).map(|(_, role)| *role)
    }
}

/// Evil and Neutral slot counts for `n` players; the rest are Good.
pub fn team_sizes(n: usize) -> (usize, usize) {
    let evil = ((n as f64) * EVIL_RATIO).round().max(1.0) as usize;
    let neutral = ((n as f64) * NEUTRAL_RATIO).round().max(1.0) as usize;
    (evil, neutral)
}

pub fn assign(
    players: &[PlayerId],
    min_players: usize,
    rng: &mut StdRng,
) -> Result<Assignment, GameError> {
    if players.len() < min_players {
        return Err(GameError::InsufficientPlayers {
            have: players.len(),
            need: min_players,
        });
    }

    let mut roles = role_multiset(players.len(), rng);
    roles.shuffle(rng);
    let mut assigned: Vec<(PlayerId, RoleKey)> =
        players.iter().cloned().zip(roles).collect();

    let bonds = pair_lovers(&mut assigned, rng);
    let executioner_targets = pick_executioner_targets(&assigned, rng);
    debug!(players = players.len(), ?bonds, "roles assigned");

    Ok(Assignment {
        roles: assigned,
        bonds,
        executioner_targets,
    })
}

/// Builds exactly `n` roles. Exhausted slots degrade to Villager.
pub fn role_multiset(n: usize, rng: &mut StdRng) -> Vec<RoleKey> {
    let (evil, neutral) = team_sizes(n);
    let good = n.saturating_sub(evil + neutral);
    let mut chosen: Vec<RoleKey> = Vec::with_capacity(n);

    // Wolf first so every game has a base killer.
    chosen.push(RoleKey::Wolf);
    for _ in 1..evil {
        let role = if rng.gen_bool(EVIL_SPECIALIST_CHANCE) {
            pick_unique(&EVIL_SPECIALISTS, &chosen, rng).unwrap_or(RoleKey::Wolf)
        } else {
            RoleKey::Wolf
        };
        chosen.push(role);
    }

    for _ in 0..neutral {
        let role = pick_unique(&NEUTRAL_POOL, &chosen, rng).unwrap_or(RoleKey::Villager);
        chosen.push(role);
    }

    let mut essentials = Vec::new();
    if let Ok(dist) = WeightedIndex::new(SEER_VARIANTS.iter().map(|(_, w)| *w)) {
        essentials.push(SEER_VARIANTS[dist.sample(rng)].0);
    }
    essentials.extend(ALWAYS_PRESENT);

    for slot in 0..good {
        let role = match essentials.get(slot) {
            Some(role) if is_available(*role, &chosen) => *role,
            _ if rng.gen_bool(VILLAGER_CHANCE) => RoleKey::Villager,
            _ => pick_unique(&GOOD_POOL, &chosen, rng).unwrap_or(RoleKey::Villager),
        };
        chosen.push(role);
    }
    chosen
}

fn is_available(role: RoleKey, chosen: &[RoleKey]) -> bool {
    if role.def().unique && chosen.contains(&role) {
        return false;
    }
    !chosen.iter().any(|other| role.conflicts_with(*other))
}

fn pick_unique(pool: &[RoleKey], chosen: &[RoleKey], rng: &mut StdRng) -> Option<RoleKey> {
    let open: Vec<RoleKey> = pool
        .iter()
        .copied()
        .filter(|role| is_available(*role, chosen))
        .collect();
    open.choose(rng).copied()
}

fn pair_lovers(assigned: &mut [(PlayerId, RoleKey)], rng: &mut StdRng) -> Vec<(PlayerId, PlayerId)> {
    let pairs = assigned.len() / PLAYERS_PER_BONDED_PAIR;
    let mut villagers: Vec<usize> = assigned
        .iter()
        .enumerate()
        .filter(|(_, (_, role))| *role == RoleKey::Villager)
        .map(|(idx, _)| idx)
        .collect();
    villagers.shuffle(rng);

    let mut bonds = Vec::new();
    for chunk in villagers.chunks_exact(2).take(pairs) {
        let (a, b) = (chunk[0], chunk[1]);
        assigned[a].1 = RoleKey::Lover;
        assigned[b].1 = RoleKey::Lover;
        bonds.push((assigned[a].0.clone(), assigned[b].0.clone()));
    }
    bonds
}

fn pick_executioner_targets(
    assigned: &[(PlayerId, RoleKey)],
    rng: &mut StdRng,
) -> Vec<(PlayerId, PlayerId)> {
    let good: Vec<&PlayerId> = assigned
        .iter()
        .filter(|(_, role)| role.team() == Team::Good)
        .map(|(id, _)| id)
        .collect();
    assigned
        .iter()
        .filter(|(_, role)| *role == RoleKey::Executioner)
        .filter_map(|(id, _)| good.choose(rng).map(|target| (id.clone(), (*target).clone())))
        .collect()
}
