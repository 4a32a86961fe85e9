use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::players::Roster;
use crate::roles::{RoleKey, RoleState};
use crate::types::{PlayerId, Team};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    Team(Team),
    Tanner,
    Lovers,
    Executioner,
    LoneSurvivor,
    /// Everybody died at once.
    Nobody,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Team(team) => write!(f, "{team} team"),
            Party::Tanner => f.write_str("Tanner"),
            Party::Lovers => f.write_str("Lovers"),
            Party::Executioner => f.write_str("Executioner"),
            Party::LoneSurvivor => f.write_str("Lone survivor"),
            Party::Nobody => f.write_str("Nobody"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Victory {
    pub party: Party,
    pub winners: Vec<PlayerId>,
}

impl Victory {
    fn new(party: Party, winners: Vec<PlayerId>) -> Self {
        Self { party, winners }
    }
}

/// Checks every win condition in priority order after a batch of deaths.
/// `lynched` is the player the day vote just killed, if any.
pub fn evaluate(roster: &Roster, lynched: Option<&PlayerId>) -> Option<Victory> {
    if let Some(lynched) = lynched {
        if roster.get(lynched).is_some_and(|p| p.role_is(RoleKey::Tanner) && !p.alive) {
            return Some(Victory::new(Party::Tanner, vec![lynched.clone()]));
        }
    }

    let alive: Vec<_> = roster.alive().collect();
    if let [a, b] = alive.as_slice() {
        if a.bond.as_ref() == Some(&b.id) && b.bond.as_ref() == Some(&a.id) {
            return Some(Victory::new(Party::Lovers, vec![a.id.clone(), b.id.clone()]));
        }
    }

    if let Some(lynched) = lynched {
        let executioners: Vec<PlayerId> = roster
            .alive_with_role(RoleKey::Executioner)
            .filter(|p| matches!(&p.role_state, RoleState::Executioner { target: Some(t) } if t == lynched))
            .map(|p| p.id.clone())
            .collect();
        if !executioners.is_empty() {
            return Some(Victory::new(Party::Executioner, executioners));
        }
    }

    match alive.as_slice() {
        [] => return Some(Victory::new(Party::Nobody, Vec::new())),
        [sole] => {
            let lone = sole.role.is_some_and(|role| role.def().lone_survivor);
            if lone || sole.team == Team::Neutral {
                let party = if lone { Party::LoneSurvivor } else { Party::Team(Team::Neutral) };
                return Some(Victory::new(party, vec![sole.id.clone()]));
            }
            return Some(team_victory(roster, sole.team));
        }
        _ => {}
    }

    let evil = alive.iter().filter(|p| p.team == Team::Evil).count();
    if evil == 0 {
        return Some(team_victory(roster, Team::Good));
    }
    if evil >= alive.len() - evil {
        return Some(team_victory(roster, Team::Evil));
    }
    None
}

/// A team wins as a whole, the dead included.
fn team_victory(roster: &Roster, team: Team) -> Victory {
    let winners = roster
        .iter()
        .filter(|p| p.team == team)
        .map(|p| p.id.clone())
        .collect();
    Victory::new(Party::Team(team), winners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::players::Player;
    use crate::types::DeathCause;

    fn roster(roles: &[RoleKey]) -> Roster {
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
    fn game_continues_while_both_sides_stand() {
        let roster = roster(&[RoleKey::Wolf, RoleKey::Villager, RoleKey::Seer]);
        assert_eq!(evaluate(&roster, None), None);
    }

    #[test]
    fn lynched_tanner_wins_first() {
        let mut roster = roster(&[RoleKey::Tanner, RoleKey::Wolf, RoleKey::Villager]);
        roster.kill(&id(0), DeathCause::Vote).expect("alive");
        let victory = evaluate(&roster, Some(&id(0))).expect("tanner wins");
        assert_eq!(victory.party, Party::Tanner);
    }

    #[test]
    fn parity_hands_evil_the_game() {
        let mut roster = roster(&[RoleKey::Wolf, RoleKey::Villager, RoleKey::Villager]);
        roster.kill(&id(1), DeathCause::WolfKill).expect("alive");
        let victory = evaluate(&roster, None).expect("evil wins");
        assert_eq!(victory.party, Party::Team(Team::Evil));
        assert_eq!(victory.winners, vec![id(0)]);
    }

    #[test]
    fn lone_serial_killer_wins_alone() {
        let mut roster = roster(&[RoleKey::SerialKiller, RoleKey::Wolf, RoleKey::Villager]);
        roster.kill(&id(1), DeathCause::SerialKill).expect("alive");
        roster.kill(&id(2), DeathCause::SerialKill).expect("alive");
        let victory = evaluate(&roster, None).expect("someone wins");
        assert_eq!(victory.party, Party::LoneSurvivor);
    }
}
