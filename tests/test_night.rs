mod common;

use std::collections::{BTreeMap, BTreeSet};

use common::{alive, bond, deaths, died, id, roster, run_night, table, target};
use rand::SeedableRng;
use rand::rngs::StdRng;
use werewolf_rs::game::intent::validate_night;
use werewolf_rs::game::{
    EventKind, GameError, GameEvent, GamePhase, IntentPayload, NightContext, Notice, PhaseKind,
    resolve_night,
};
use werewolf_rs::roles::{RoleKey, RoleState};
use werewolf_rs::types::{Aura, DeathCause, Team};

#[test]
fn pack_kill_resolves_once_every_actor_has_chosen() {
    let mut state = table(&[
        RoleKey::Wolf,
        RoleKey::Seer,
        RoleKey::GuardianAngel,
        RoleKey::Villager,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);

    state
        .submit_intent(&id(0), PhaseKind::Night, target(3))
        .expect("wolf picks");
    state
        .submit_intent(&id(1), PhaseKind::Night, target(0))
        .expect("seer looks");
    assert_eq!(state.phase, GamePhase::Night);
    state
        .submit_intent(&id(2), PhaseKind::Night, target(1))
        .expect("guardian protects");

    assert_eq!(state.phase, GamePhase::Discussion);
    assert_eq!(deaths(&state), vec![(id(3), DeathCause::WolfKill)]);
    assert!(state.victory().is_none());
    assert!(state.log().iter().any(|event| matches!(
        event,
        GameEvent::Notice {
            to,
            notice: Notice::AuraSeen { aura: Aura::Evil, .. },
        } if *to == id(1)
    )));
}

#[test]
fn protection_absorbs_the_pack_kill() {
    let mut roster = roster(&[RoleKey::Wolf, RoleKey::GuardianAngel, RoleKey::Villager]);
    let (report, protected) = run_night(&mut roster, &[(0, target(2)), (1, target(2))], 1, false);

    assert!(died(&report).is_empty());
    assert!(protected.contains(&id(2)));
    assert!(
        report
            .events
            .iter()
            .any(|e| e.kind == EventKind::Protected && e.subject == id(2))
    );
}

#[test]
fn protecting_a_wolf_kills_the_guardian() {
    let mut roster = roster(&[
        RoleKey::Wolf,
        RoleKey::GuardianAngel,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    let (report, protected) = run_night(&mut roster, &[(0, target(2)), (1, target(0))], 1, false);

    let dead = died(&report);
    assert!(dead.contains(&(id(1), DeathCause::MisdirectedProtection)));
    assert!(dead.contains(&(id(2), DeathCause::WolfKill)));
    assert!(!protected.contains(&id(0)));
}

#[test]
fn guardian_cannot_protect_the_same_player_twice_running() {
    let mut state = table(&[
        RoleKey::Wolf,
        RoleKey::GuardianAngel,
        RoleKey::Villager,
        RoleKey::Villager,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    state
        .submit_intent(&id(1), PhaseKind::Night, target(2))
        .expect("first protection");
    state
        .submit_intent(&id(0), PhaseKind::Night, IntentPayload::Pass)
        .expect("wolf passes");
    common::run_until(&mut state, GamePhase::Night);

    let err = state
        .submit_intent(&id(1), PhaseKind::Night, target(2))
        .unwrap_err();
    assert!(matches!(err, GameError::InvalidIntent(_)));
}

#[test]
fn peaceful_night_stops_kills_but_not_support_abilities() {
    let mut roster = roster(&[
        RoleKey::Pacifist,
        RoleKey::Wolf,
        RoleKey::GuardianAngel,
        RoleKey::Healer,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    roster
        .kill(&id(5), DeathCause::WolfKill)
        .expect("alive before the night");

    let (report, protected) = run_night(
        &mut roster,
        &[
            (0, IntentPayload::Activate),
            (1, target(4)),
            (2, target(4)),
            (3, target(5)),
        ],
        2,
        false,
    );

    assert!(report.peaceful);
    assert!(died(&report).is_empty());
    assert!(protected.contains(&id(4)));
    assert!(roster.is_alive(&id(5)));
    assert!(matches!(
        roster.get(&id(0)).map(|p| &p.role_state),
        Some(RoleState::Pacifist { peace_used: true })
    ));
    assert!(matches!(
        roster.get(&id(3)).map(|p| &p.role_state),
        Some(RoleState::Healer { revive_used: true })
    ));
}

#[test]
fn a_doubly_attacked_player_dies_once() {
    let mut roster = roster(&[
        RoleKey::Wolf,
        RoleKey::SerialKiller,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    let (report, _) = run_night(&mut roster, &[(0, target(2)), (1, target(2))], 2, false);

    assert_eq!(died(&report), vec![(id(2), DeathCause::WolfKill)]);
}

#[test]
fn replaying_a_resolved_night_kills_nobody_twice() {
    let mut roster = roster(&[
        RoleKey::Wolf,
        RoleKey::SerialKiller,
        RoleKey::Villager,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    let intents = [(0, target(2)), (1, target(2))];
    let (first, _) = run_night(&mut roster, &intents, 2, false);
    let (second, _) = run_night(&mut roster, &intents, 3, false);

    assert_eq!(died(&first).len(), 1);
    assert!(died(&second).is_empty());
    assert_eq!(
        roster.get(&id(2)).and_then(|p| p.last_death_cause),
        Some(DeathCause::WolfKill)
    );
}

#[test]
fn bonded_partner_follows_into_death() {
    let mut roster = roster(&[
        RoleKey::Wolf,
        RoleKey::Lover,
        RoleKey::Lover,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    bond(&mut roster, 1, 2);
    let (report, _) = run_night(&mut roster, &[(0, target(1))], 2, false);

    let grief = report
        .deaths()
        .find(|e| e.subject == id(2))
        .expect("partner died");
    assert_eq!(grief.cause, Some(DeathCause::Grief));
    assert_eq!(grief.related, Some(id(1)));
}

#[test]
fn serial_killer_reflects_the_pack_attack() {
    let mut roster = roster(&[
        RoleKey::Wolf,
        RoleKey::SerialKiller,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    let (report, _) = run_night(&mut roster, &[(0, target(1)), (1, target(2))], 2, false);

    let dead = died(&report);
    assert!(roster.is_alive(&id(1)));
    assert!(dead.contains(&(id(0), DeathCause::Reflected)));
    assert!(dead.contains(&(id(2), DeathCause::SerialKill)));
}

#[test]
fn pack_shield_absorbs_the_reflection_once() {
    let mut roster = roster(&[
        RoleKey::Wolf,
        RoleKey::SerialKiller,
        RoleKey::PackGuardian,
        RoleKey::Villager,
    ]);
    let (report, _) = run_night(&mut roster, &[(0, target(1))], 2, false);

    assert!(died(&report).is_empty());
    assert!(report.events.iter().any(|e| e.kind == EventKind::ShieldUsed));
    assert!(!roster.get(&id(2)).expect("seated").role_state.has_pack_shield());

    let (report, _) = run_night(&mut roster, &[(0, target(1))], 3, false);
    assert_eq!(died(&report), vec![(id(0), DeathCause::Reflected)]);
}

#[test]
fn cursed_is_turned_instead_of_killed() {
    let mut roster = roster(&[RoleKey::Wolf, RoleKey::Cursed, RoleKey::Villager, RoleKey::Villager]);
    let (report, _) = run_night(&mut roster, &[(0, target(1))], 2, false);

    assert!(died(&report).is_empty());
    let cursed = roster.get(&id(1)).expect("seated");
    assert!(cursed.alive);
    assert!(cursed.role_is(RoleKey::Wolf));
    assert_eq!(cursed.team, Team::Evil);
}

#[test]
fn harlot_is_away_when_the_pack_calls() {
    let mut roster = roster(&[RoleKey::Wolf, RoleKey::Harlot, RoleKey::Villager, RoleKey::Villager]);
    let (report, _) = run_night(&mut roster, &[(0, target(1)), (1, target(2))], 2, false);

    assert!(roster.is_alive(&id(1)));
    assert!(report.events.iter().any(|e| e.kind == EventKind::NearMiss));
}

#[test]
fn harlot_visiting_the_victim_dies_too() {
    let mut roster = roster(&[RoleKey::Wolf, RoleKey::Harlot, RoleKey::Villager, RoleKey::Villager]);
    let (report, _) = run_night(&mut roster, &[(0, target(2)), (1, target(2))], 2, false);

    let dead = died(&report);
    assert!(dead.contains(&(id(2), DeathCause::WolfKill)));
    assert!(dead.contains(&(id(1), DeathCause::VisitedVictim)));
}

#[test]
fn wild_child_turns_when_the_mentor_dies() {
    let mut state = table(&[
        RoleKey::Wolf,
        RoleKey::WildChild,
        RoleKey::Villager,
        RoleKey::Villager,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    state
        .submit_intent(&id(1), PhaseKind::Night, target(2))
        .expect("mentor chosen");
    state
        .submit_intent(&id(0), PhaseKind::Night, target(2))
        .expect("wolf picks");

    assert!(!alive(&state, 2));
    let child = state.roster.get(&id(1)).expect("seated");
    assert!(child.role_is(RoleKey::Wolf));
}

#[test]
fn unanswered_first_night_choice_is_made_at_random() {
    let mut state = table(&[
        RoleKey::Wolf,
        RoleKey::Cupid,
        RoleKey::Villager,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    common::expire(&mut state);

    let bonded = state.roster.iter().filter(|p| p.bond.is_some()).count();
    assert_eq!(bonded, 2);
    assert!(matches!(
        state.roster.get(&id(1)).map(|p| &p.role_state),
        Some(RoleState::Cupid { bonded: true })
    ));
}

#[test]
fn guardian_may_return_to_a_ward_after_a_night_off() {
    let mut roster = roster(&[
        RoleKey::Wolf,
        RoleKey::GuardianAngel,
        RoleKey::Villager,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    run_night(&mut roster, &[(1, target(2))], 1, false);
    assert!(matches!(
        validate_night(&roster, 2, &id(1), &target(2)),
        Err(GameError::InvalidIntent(_))
    ));

    // Night 2 passes without a protection.
    run_night(&mut roster, &[(1, IntentPayload::Pass)], 2, false);
    assert_eq!(validate_night(&roster, 3, &id(1), &target(2)), Ok(()));
}

#[test]
fn cupid_cannot_bond_a_player_who_already_has_a_partner() {
    let mut state = table(&[
        RoleKey::Cupid,
        RoleKey::Lover,
        RoleKey::Lover,
        RoleKey::Villager,
        RoleKey::Wolf,
        RoleKey::Villager,
    ]);
    for (one, other) in [(1, 2), (2, 1)] {
        state.roster.get_mut(&id(one)).expect("seated").bond = Some(id(other));
    }

    let err = state
        .submit_intent(&id(0), PhaseKind::Night, IntentPayload::Pair(id(1), id(3)))
        .unwrap_err();
    assert!(matches!(err, GameError::InvalidIntent(_)));
    assert!(state.legal_intents(&id(0)).iter().all(|(_, payload)| match payload {
        IntentPayload::Pair(a, b) => ![id(1), id(2)].contains(a) && ![id(1), id(2)].contains(b),
        _ => true,
    }));
}

#[test]
fn rebonding_unlinks_the_old_partner() {
    let mut roster = roster(&[
        RoleKey::Cupid,
        RoleKey::Lover,
        RoleKey::Lover,
        RoleKey::Villager,
        RoleKey::Wolf,
        RoleKey::Villager,
    ]);
    bond(&mut roster, 1, 2);
    let (report, _) = run_night(
        &mut roster,
        &[(0, IntentPayload::Pair(id(1), id(3))), (4, target(2))],
        1,
        false,
    );

    assert_eq!(died(&report), vec![(id(2), DeathCause::WolfKill)]);
    assert!(roster.is_alive(&id(1)));
    assert!(roster.is_alive(&id(3)));
    assert_eq!(roster.get(&id(1)).and_then(|p| p.bond.clone()), Some(id(3)));
    assert_eq!(roster.get(&id(2)).and_then(|p| p.bond.clone()), None);
}

#[test]
fn shapeshifter_takes_the_look_of_a_tagged_victim() {
    let mut roster = roster(&[
        RoleKey::Wolf,
        RoleKey::Shapeshifter,
        RoleKey::SerialKiller,
        RoleKey::Seer,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    let (report, _) = run_night(&mut roster, &[(1, target(3)), (2, target(3))], 2, false);

    assert_eq!(died(&report), vec![(id(3), DeathCause::SerialKill)]);
    assert!(report.events.iter().any(|e| e.kind == EventKind::Disguised && e.subject == id(1)));
    let thief = roster.get(&id(1)).expect("seated");
    assert_eq!(thief.apparent_role(), Some(RoleKey::Seer));
    assert_eq!(thief.aura, Aura::Good);
    assert_eq!(thief.team, Team::Evil);
}

#[test]
fn pack_victims_give_the_shapeshifter_nothing() {
    let mut roster = roster(&[
        RoleKey::Wolf,
        RoleKey::Shapeshifter,
        RoleKey::Seer,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    let (report, _) = run_night(&mut roster, &[(1, target(2)), (0, target(2))], 2, false);

    assert_eq!(died(&report), vec![(id(2), DeathCause::WolfKill)]);
    assert!(!report.events.iter().any(|e| e.kind == EventKind::Disguised));
    let thief = roster.get(&id(1)).expect("seated");
    assert_eq!(thief.apparent_role(), Some(RoleKey::Shapeshifter));
    assert_eq!(thief.aura, Aura::Evil);
}

#[test]
fn doppelganger_inherits_its_model() {
    let mut roster = roster(&[
        RoleKey::Wolf,
        RoleKey::Doppelganger,
        RoleKey::Seer,
        RoleKey::Villager,
        RoleKey::Villager,
    ]);
    let (report, _) = run_night(&mut roster, &[(1, target(2)), (0, target(2))], 1, false);

    assert!(
        report
            .events
            .iter()
            .any(|e| e.kind == EventKind::Inherited && e.subject == id(1) && e.related == Some(id(2)))
    );
    let heir = roster.get(&id(1)).expect("seated");
    assert!(heir.role_is(RoleKey::Seer));
    assert_eq!(heir.team, Team::Good);
    assert!(report.notices.iter().any(|(to, notice)| *to == id(1)
        && *notice == Notice::RoleChanged { role: RoleKey::Seer }));
}

#[test]
fn fool_sees_a_coin_flip_not_the_truth() {
    let mut roster = roster(&[RoleKey::Wolf, RoleKey::Fool, RoleKey::Villager, RoleKey::Villager]);
    let intents: BTreeMap<_, _> = [(id(1), target(2))].into_iter().collect();
    let mut rng = StdRng::seed_from_u64(common::SEED);
    let mut seen = Vec::new();
    for day in 2..22 {
        let report = resolve_night(
            &mut roster,
            &mut BTreeSet::new(),
            &mut rng,
            &intents,
            NightContext { day, bonus_kill: false },
        );
        for (to, notice) in report.notices {
            if let Notice::AuraSeen { target, aura } = notice {
                assert_eq!((to, target), (id(1), id(2)));
                seen.push(aura);
            }
        }
    }

    assert_eq!(seen.len(), 20);
    assert!(seen.contains(&Aura::Evil), "a villager always read as good");
    assert!(seen.contains(&Aura::Good));
}

#[test]
fn sorcerer_learns_only_whether_the_target_is_a_seer() {
    let mut roster = roster(&[
        RoleKey::Wolf,
        RoleKey::Sorcerer,
        RoleKey::Seer,
        RoleKey::Villager,
    ]);
    let (first, _) = run_night(&mut roster, &[(1, target(2))], 2, false);
    let (second, _) = run_night(&mut roster, &[(1, target(3))], 3, false);

    assert_eq!(
        first.notices,
        vec![(id(1), Notice::SeerFound { target: id(2), is_seer: true })]
    );
    assert_eq!(
        second.notices,
        vec![(id(1), Notice::SeerFound { target: id(3), is_seer: false })]
    );
}
