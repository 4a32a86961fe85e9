mod common;

use std::collections::BTreeMap;

use common::{id, roster, run_night, target};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use werewolf_rs::game::assignment::{PLAYERS_PER_BONDED_PAIR, assign, team_sizes};
use werewolf_rs::roles::{CONFLICTS, RoleKey};
use werewolf_rs::types::{DeathCause, PlayerId, Team};

fn seats(n: usize) -> Vec<PlayerId> {
    (0..n).map(id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn deal_fits_the_table(n in 5usize..=35, seed in any::<u64>()) {
        let deal = assign(&seats(n), 5, &mut StdRng::seed_from_u64(seed)).expect("enough players");
        prop_assert_eq!(deal.roles.len(), n);

        let mut teams: BTreeMap<Team, usize> = BTreeMap::new();
        for (_, role) in &deal.roles {
            *teams.entry(role.team()).or_insert(0) += 1;
        }
        let (evil_target, neutral_target) = team_sizes(n);
        let evil = teams.get(&Team::Evil).copied().unwrap_or(0);
        let neutral = teams.get(&Team::Neutral).copied().unwrap_or(0);

        prop_assert_eq!(evil, evil_target);
        let evil_share = evil as f64 / n as f64;
        prop_assert!((0.2..=0.35).contains(&evil_share), "evil share {}", evil_share);
        prop_assert!(neutral >= 1 && neutral <= neutral_target);
        prop_assert!(deal.roles.iter().any(|(_, role)| *role == RoleKey::Wolf));
    }

    #[test]
    fn deal_respects_uniqueness_conflicts_and_essentials(n in 5usize..=35, seed in any::<u64>()) {
        let deal = assign(&seats(n), 5, &mut StdRng::seed_from_u64(seed)).expect("enough players");
        let mut counts: BTreeMap<RoleKey, usize> = BTreeMap::new();
        for (_, role) in &deal.roles {
            *counts.entry(*role).or_insert(0) += 1;
        }
        for (role, count) in &counts {
            if role.def().unique {
                prop_assert_eq!(*count, 1, "{} dealt twice", role);
            }
        }
        for (a, b) in CONFLICTS {
            prop_assert!(
                !(counts.contains_key(a) && counts.contains_key(b)),
                "{} and {} dealt together", a, b
            );
        }
        let seers = counts.get(&RoleKey::Seer).copied().unwrap_or(0)
            + counts.get(&RoleKey::Fool).copied().unwrap_or(0);
        prop_assert_eq!(seers, 1, "exactly one of Seer and Fool");
        prop_assert_eq!(counts.get(&RoleKey::GuardianAngel).copied(), Some(1));
    }

    #[test]
    fn bonds_and_executioner_targets_are_well_formed(n in 5usize..=35, seed in any::<u64>()) {
        let deal = assign(&seats(n), 5, &mut StdRng::seed_from_u64(seed)).expect("enough players");
        prop_assert!(deal.bonds.len() <= n / PLAYERS_PER_BONDED_PAIR);
        for (a, b) in &deal.bonds {
            prop_assert_ne!(a, b);
            prop_assert_eq!(deal.role_of(a), Some(RoleKey::Lover));
            prop_assert_eq!(deal.role_of(b), Some(RoleKey::Lover));
        }
        for (executioner, target) in &deal.executioner_targets {
            prop_assert_eq!(deal.role_of(executioner), Some(RoleKey::Executioner));
            prop_assert_eq!(deal.role_of(target).map(RoleKey::team), Some(Team::Good));
        }
    }

    #[test]
    fn bonus_kill_never_hits_the_pack_or_repeats(day in 2u32..10, victim in 2usize..6) {
        let mut roster = roster(&[
            RoleKey::Wolf,
            RoleKey::WolfCub,
            RoleKey::Villager,
            RoleKey::Villager,
            RoleKey::Villager,
            RoleKey::Villager,
        ]);
        let (report, _) = run_night(&mut roster, &[(0, target(victim))], day, true);
        let dead: Vec<PlayerId> = report
            .deaths()
            .filter(|e| e.cause == Some(DeathCause::WolfKill))
            .map(|e| e.subject.clone())
            .collect();

        prop_assert_eq!(dead.len(), 2);
        prop_assert_eq!(&dead[0], &id(victim));
        prop_assert_ne!(&dead[1], &id(victim));
        prop_assert!(dead[1] != id(0) && dead[1] != id(1));
    }
}

#[test]
fn too_few_seats_are_refused() {
    let err = assign(&seats(4), 5, &mut StdRng::seed_from_u64(1)).unwrap_err();
    assert_eq!(
        err,
        werewolf_rs::GameError::InsufficientPlayers { have: 4, need: 5 }
    );
}

#[test]
fn large_tables_get_bonded_pairs() {
    let paired = (0..50u64)
        .filter(|seed| {
            let deal = assign(&seats(24), 5, &mut StdRng::seed_from_u64(*seed)).expect("enough players");
            !deal.bonds.is_empty()
        })
        .count();
    assert!(paired > 0);
}
