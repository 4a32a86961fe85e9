//! Night ability descriptors and the resolve functions they point at.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::game::intent::IntentPayload;
use crate::game::night::NightPass;
use crate::roles::RoleKey;
use crate::types::PlayerId;

pub type ResolveFn = fn(&mut NightPass<'_>, &PlayerId, &IntentPayload);

/// Pipeline stage an ability runs in. Stages run in declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Stage {
    Peace,
    Choice,
    Protect,
    Inspect,
    Kill,
    Revive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum AbilityKind {
    Peace,
    Bond,
    Mentor,
    Mimic,
    Tag,
    Commit,
    Protect,
    Visit,
    Inspect,
    FoolInspect,
    SeerHunt,
    PackKill,
    SoloKill,
    Revive,
}

impl AbilityKind {
    pub fn stage(self) -> Stage {
        match self {
            AbilityKind::Peace => Stage::Peace,
            AbilityKind::Bond
            | AbilityKind::Mentor
            | AbilityKind::Mimic
            | AbilityKind::Tag
            | AbilityKind::Commit => Stage::Choice,
            AbilityKind::Protect | AbilityKind::Visit => Stage::Protect,
            AbilityKind::Inspect | AbilityKind::FoolInspect | AbilityKind::SeerHunt => {
                Stage::Inspect
            }
            AbilityKind::PackKill | AbilityKind::SoloKill => Stage::Kill,
            AbilityKind::Revive => Stage::Revive,
        }
    }

    /// Abilities that still take effect on a peaceful night.
    pub fn peace_exempt(self) -> bool {
        !matches!(
            self,
            AbilityKind::PackKill | AbilityKind::SoloKill | AbilityKind::Visit
        )
    }
}

/// Which players an ability may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetRule {
    NoTarget,
    AliveOther,
    /// Alive and not a member of the wolf pack.
    AliveNonPack,
    /// Alive and not yet bonded; the bonder may pick itself.
    AliveUnbonded,
    /// Dead and on the Good team.
    DeadGood,
}

#[derive(Clone, Copy)]
pub struct NightAbility {
    pub kind: AbilityKind,
    pub target_count: u8,
    pub target_rule: TargetRule,
    pub first_night_only: bool,
    pub resolve: ResolveFn,
}

impl fmt::Debug for NightAbility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NightAbility")
            .field("kind", &self.kind)
            .field("target_count", &self.target_count)
            .field("target_rule", &self.target_rule)
            .field("first_night_only", &self.first_night_only)
            .finish_non_exhaustive()
    }
}

impl NightAbility {
    fn new(kind: AbilityKind, target_rule: TargetRule, resolve: ResolveFn) -> Self {
        let target_count = match target_rule {
            TargetRule::NoTarget => 0,
            _ => 1,
        };
        Self {
            kind,
            target_count,
            target_rule,
            first_night_only: false,
            resolve,
        }
    }

    fn pair(mut self) -> Self {
        self.target_count = 2;
        self
    }

    fn first_night(mut self) -> Self {
        self.first_night_only = true;
        self
    }

    pub fn stage(&self) -> Stage {
        self.kind.stage()
    }
}

pub(crate) fn ability_for(role: RoleKey) -> Option<NightAbility> {
    use AbilityKind as K;
    use TargetRule as T;

    let ability = match role {
        RoleKey::Seer => NightAbility::new(K::Inspect, T::AliveOther, inspect),
        RoleKey::Fool => NightAbility::new(K::FoolInspect, T::AliveOther, fool_inspect),
        RoleKey::Sorcerer => NightAbility::new(K::SeerHunt, T::AliveOther, seer_hunt),
        RoleKey::GuardianAngel => NightAbility::new(K::Protect, T::AliveOther, protect),
        RoleKey::Harlot => NightAbility::new(K::Visit, T::AliveOther, visit),
        RoleKey::Cupid => NightAbility::new(K::Bond, T::AliveUnbonded, bond).pair().first_night(),
        RoleKey::WildChild => {
            NightAbility::new(K::Mentor, T::AliveOther, choose_mentor).first_night()
        }
        RoleKey::Doppelganger => {
            NightAbility::new(K::Mimic, T::AliveOther, choose_model).first_night()
        }
        RoleKey::Shapeshifter => NightAbility::new(K::Tag, T::AliveOther, tag),
        RoleKey::Witness => NightAbility::new(K::Commit, T::AliveOther, commit_expose),
        RoleKey::Pacifist => NightAbility::new(K::Peace, T::NoTarget, activate_peace),
        RoleKey::Healer => NightAbility::new(K::Revive, T::DeadGood, revive),
        RoleKey::Wolf | RoleKey::AlphaWolf | RoleKey::WolfCub => {
            NightAbility::new(K::PackKill, T::AliveNonPack, pack_vote)
        }
        RoleKey::SerialKiller => NightAbility::new(K::SoloKill, T::AliveOther, solo_kill),
        _ => return None,
    };
    Some(ability)
}

fn inspect(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some(target) = payload.target() {
        pass.reveal_aura(actor, target);
    }
}

fn fool_inspect(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some(target) = payload.target() {
        pass.reveal_random_aura(actor, target);
    }
}

fn seer_hunt(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some(target) = payload.target() {
        pass.reveal_seer(actor, target);
    }
}

fn protect(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some(target) = payload.target() {
        pass.protect(actor, target);
    }
}

fn visit(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some(target) = payload.target() {
        pass.visit(actor, target);
    }
}

fn bond(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some((a, b)) = payload.pair() {
        pass.bond(actor, a, b);
    }
}

fn choose_mentor(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some(target) = payload.target() {
        pass.choose_mentor(actor, target);
    }
}

fn choose_model(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some(target) = payload.target() {
        pass.choose_model(actor, target);
    }
}

fn tag(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some(target) = payload.target() {
        pass.tag(actor, target);
    }
}

fn commit_expose(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some(target) = payload.target() {
        pass.commit_expose(actor, target);
    }
}

fn activate_peace(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if matches!(payload, IntentPayload::Activate) {
        pass.activate_peace(actor);
    }
}

fn revive(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some(target) = payload.target() {
        pass.revive(actor, target);
    }
}

fn pack_vote(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some(target) = payload.target() {
        pass.pack_vote(actor, target);
    }
}

fn solo_kill(pass: &mut NightPass<'_>, actor: &PlayerId, payload: &IntentPayload) {
    if let Some(target) = payload.target() {
        pass.solo_attack(actor, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_abilities_are_not_peace_exempt() {
        assert!(!AbilityKind::PackKill.peace_exempt());
        assert!(!AbilityKind::SoloKill.peace_exempt());
        assert!(AbilityKind::Protect.peace_exempt());
        assert!(AbilityKind::Revive.peace_exempt());
        assert!(AbilityKind::Bond.peace_exempt());
    }

    #[test]
    fn cupid_bonds_two_players_on_first_night_only() {
        let ability = ability_for(RoleKey::Cupid).expect("cupid acts");
        assert_eq!(ability.target_count, 2);
        assert!(ability.first_night_only);
    }

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::Peace < Stage::Choice);
        assert!(Stage::Protect < Stage::Kill);
        assert!(Stage::Kill < Stage::Revive);
    }
}
