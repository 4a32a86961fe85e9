use crate::game::{Game, IntentPayload, PhaseKind};
use crate::players::BasePlayer;
use crate::types::PlayerId;

/// Never acts; every phase runs to its timer and resolves on defaults.
#[derive(Clone, Default)]
pub struct PassivePlayer;

impl BasePlayer for PassivePlayer {
    fn decide(
        &self,
        _game: &Game,
        _seat: &PlayerId,
        _actions: &[(PhaseKind, IntentPayload)],
    ) -> Option<(PhaseKind, IntentPayload)> {
        None
    }
}
