use crate::game::{Game, IntentPayload, PhaseKind};
use crate::types::PlayerId;

pub trait BasePlayer {
    /// Picks one of `actions` for `seat`, or `None` to wait for the timer.
    fn decide(
        &self,
        game: &Game,
        seat: &PlayerId,
        actions: &[(PhaseKind, IntentPayload)],
    ) -> Option<(PhaseKind, IntentPayload)>;
}
