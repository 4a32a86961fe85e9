use serde::{Deserialize, Serialize};

use crate::game::GameError;
use crate::game::players::{Player, Roster};
use crate::roles::{AbilityKind, NightAbility, RoleState, TargetRule};
use crate::types::{PlayerId, Team};

/// A player's submitted choice for the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentPayload {
    /// Abstain, skip, or decline.
    Pass,
    /// Trigger a zero-target ability or request an early vote.
    Activate,
    Target(PlayerId),
    Pair(PlayerId, PlayerId),
}

impl Default for IntentPayload {
    fn default() -> Self {
        IntentPayload::Pass
    }
}

impl IntentPayload {
    pub fn target(&self) -> Option<&PlayerId> {
        match self {
            IntentPayload::Target(target) => Some(target),
            _ => None,
        }
    }

    pub fn pair(&self) -> Option<(&PlayerId, &PlayerId)> {
        match self {
            IntentPayload::Pair(a, b) => Some((a, b)),
            _ => None,
        }
    }
}

/// The ability `player` may use on night `day`, if any.
pub fn usable_ability(player: &Player, day: u32) -> Option<NightAbility> {
    if !player.alive {
        return None;
    }
    let ability = player.role?.def().ability?;
    if ability.first_night_only
        && (day != 1 || !player.role_state.needs_first_night_choice())
    {
        return None;
    }
    let spent = match (&ability.kind, &player.role_state) {
        (AbilityKind::Peace, RoleState::Pacifist { peace_used }) => *peace_used,
        (AbilityKind::Revive, RoleState::Healer { revive_used }) => *revive_used,
        _ => false,
    };
    if spent {
        return None;
    }
    Some(ability)
}

/// Players `actor` may legally pick under `rule`, in join order.
pub fn candidates(roster: &Roster, actor: &Player, rule: TargetRule) -> Vec<PlayerId> {
    roster
        .iter()
        .filter(|p| match rule {
            TargetRule::NoTarget => false,
            TargetRule::AliveOther => p.alive && p.id != actor.id,
            TargetRule::AliveNonPack => p.alive && p.id != actor.id && !p.is_pack_killer(),
            TargetRule::AliveUnbonded => p.alive && p.bond.is_none(),
            TargetRule::DeadGood => !p.alive && p.team == Team::Good,
        })
        .filter(|p| !blocked_by_role_state(actor, &p.id))
        .map(|p| p.id.clone())
        .collect()
}

fn blocked_by_role_state(actor: &Player, target: &PlayerId) -> bool {
    match &actor.role_state {
        RoleState::Guardian {
            last_protected: Some(last),
        } => last == target,
        _ => false,
    }
}

pub fn validate_night(
    roster: &Roster,
    day: u32,
    actor: &PlayerId,
    payload: &IntentPayload,
) -> Result<(), GameError> {
    let player = roster.require(actor)?;
    let ability = usable_ability(player, day).ok_or(GameError::NotYourTurn)?;
    if matches!(payload, IntentPayload::Pass) {
        return Ok(());
    }
    let allowed = candidates(roster, player, ability.target_rule);
    match (ability.target_count, payload) {
        (0, IntentPayload::Activate) => Ok(()),
        (1, IntentPayload::Target(target)) => {
            if allowed.contains(target) {
                Ok(())
            } else {
                Err(GameError::InvalidIntent(format!(
                    "{target} is not a valid target"
                )))
            }
        }
        (2, IntentPayload::Pair(a, b)) => {
            if a == b {
                Err(GameError::InvalidIntent("pair must name two players".into()))
            } else if allowed.contains(a) && allowed.contains(b) {
                Ok(())
            } else {
                Err(GameError::InvalidIntent("pair includes an invalid target".into()))
            }
        }
        (count, _) => Err(GameError::InvalidIntent(format!(
            "ability expects {count} target(s)"
        ))),
    }
}

/// Every payload `actor` could submit tonight, `Pass` included.
pub fn legal_night_payloads(roster: &Roster, day: u32, actor: &PlayerId) -> Vec<IntentPayload> {
    let Some(player) = roster.get(actor) else {
        return Vec::new();
    };
    let Some(ability) = usable_ability(player, day) else {
        return Vec::new();
    };
    let mut payloads = vec![IntentPayload::Pass];
    let allowed = candidates(roster, player, ability.target_rule);
    match ability.target_count {
        0 => payloads.push(IntentPayload::Activate),
        1 => payloads.extend(allowed.into_iter().map(IntentPayload::Target)),
        _ => {
            for (i, a) in allowed.iter().enumerate() {
                for b in allowed.iter().skip(i + 1) {
                    payloads.push(IntentPayload::Pair(a.clone(), b.clone()));
                }
            }
        }
    }
    payloads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::RoleKey;

    fn roster(roles: &[RoleKey]) -> Roster {
        let mut roster = Roster::new();
        for (i, role) in roles.iter().enumerate() {
            let mut player = Player::new(PlayerId::new(format!("p{i}")), format!("P{i}"));
            player.set_role(*role);
            roster.add(player).expect("unique");
        }
        roster
    }

    #[test]
    fn villager_has_nothing_to_submit() {
        let roster = roster(&[RoleKey::Villager, RoleKey::Wolf]);
        let err = validate_night(&roster, 1, &PlayerId::new("p0"), &IntentPayload::Pass)
            .unwrap_err();
        assert!(matches!(err, GameError::NotYourTurn));
    }

    #[test]
    fn wolves_cannot_target_the_pack() {
        let roster = roster(&[RoleKey::Wolf, RoleKey::AlphaWolf, RoleKey::Villager]);
        let err = validate_night(
            &roster,
            1,
            &PlayerId::new("p0"),
            &IntentPayload::Target(PlayerId::new("p1")),
        )
        .unwrap_err();
        assert!(matches!(err, GameError::InvalidIntent(_)));
        assert!(
            validate_night(
                &roster,
                1,
                &PlayerId::new("p0"),
                &IntentPayload::Target(PlayerId::new("p2"))
            )
            .is_ok()
        );
    }

    #[test]
    fn first_night_choice_expires_after_night_one() {
        let roster = roster(&[RoleKey::Cupid, RoleKey::Villager, RoleKey::Wolf]);
        let cupid = PlayerId::new("p0");
        assert!(legal_night_payloads(&roster, 1, &cupid).len() > 1);
        assert!(legal_night_payloads(&roster, 2, &cupid).is_empty());
    }

    #[test]
    fn guardian_cannot_repeat_last_target() {
        let mut roster = roster(&[RoleKey::GuardianAngel, RoleKey::Villager, RoleKey::Wolf]);
        if let Some(ga) = roster.get_mut(&PlayerId::new("p0")) {
            ga.role_state = RoleState::Guardian {
                last_protected: Some(PlayerId::new("p1")),
            };
        }
        let err = validate_night(
            &roster,
            2,
            &PlayerId::new("p0"),
            &IntentPayload::Target(PlayerId::new("p1")),
        )
        .unwrap_err();
        assert!(matches!(err, GameError::InvalidIntent(_)));
    }
}
