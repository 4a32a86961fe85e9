use rand::Rng;
use rand::seq::SliceRandom;

use crate::game::{Game, IntentPayload, PhaseKind};
use crate::players::BasePlayer;
use crate::types::PlayerId;

/// Chance a bot asks to skip discussion instead of waiting.
const FORCE_VOTE_CHANCE: f64 = 0.5;

#[derive(Clone)]
pub struct RandomPlayer;

impl BasePlayer for RandomPlayer {
    fn decide(
        &self,
        _game: &Game,
        _seat: &PlayerId,
        actions: &[(PhaseKind, IntentPayload)],
    ) -> Option<(PhaseKind, IntentPayload)> {
        let mut rng = rand::thread_rng();
        if actions.iter().all(|(kind, _)| *kind == PhaseKind::ForceVote)
            && !rng.gen_bool(FORCE_VOTE_CHANCE)
        {
            return None;
        }
        // Prefer doing something over passing when there is a choice.
        let active: Vec<_> = actions
            .iter()
            .filter(|(_, payload)| *payload != IntentPayload::Pass)
            .collect();
        match active.choose(&mut rng) {
            Some(action) => Some((*action).clone()),
            None => actions.choose(&mut rng).cloned(),
        }
    }
}
