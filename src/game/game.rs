use std::time::Instant;

use tracing::debug;
use uuid::Uuid;

use crate::game::{GameConfig, GameError, GameState, IntentPayload, PhaseKind, Victory};
use crate::players::BasePlayer;
use crate::types::PlayerId;

const DAYS_LIMIT: u32 = 100;

/// A self-contained game driven by bots on a virtual clock.
pub struct Game {
    pub seed: Option<u64>,
    pub id: Uuid,
    pub state: GameState,
    clock: Instant,
}

impl Game {
    /// Opens a lobby with the given seats; the first seat hosts.
    pub fn new(config: GameConfig, seats: &[PlayerId]) -> Result<Self, GameError> {
        let clock = Instant::now();
        let (host, rest) = seats
            .split_first()
            .ok_or(GameError::InsufficientPlayers { have: 0, need: config.min_players })?;
        let seed = config.seed;
        let mut state = GameState::new(config, host.clone(), host.to_string(), clock);
        for seat in rest {
            state.join(seat.clone(), seat.to_string())?;
        }
        Ok(Self {
            seed,
            id: Uuid::new_v4(),
            state,
            clock,
        })
    }

    pub fn start(&mut self) -> Result<(), GameError> {
        let host = self.state.host().clone();
        self.state.force_start(&host)?;
        Ok(())
    }

    /// Plays to completion. `players[i]` controls the i-th seat.
    pub fn play<P: BasePlayer>(&mut self, players: &[P]) -> Result<Option<Victory>, GameError> {
        self.start()?;
        while !self.state.is_finished() && self.state.day <= DAYS_LIMIT {
            if !self.play_tick(players) {
                break;
            }
        }
        if !self.state.is_finished() {
            let host = self.state.host().clone();
            self.state.force_end(&host)?;
        }
        Ok(self.victory().cloned())
    }

    /// Lets every seat act once; when nobody does, the live timer fires.
    /// Returns false when the game can make no further progress.
    pub fn play_tick<P: BasePlayer>(&mut self, players: &[P]) -> bool {
        let seats = self.state.roster.ids();
        let mut acted = false;
        for (seat, player) in seats.iter().zip(players) {
            let phase = self.state.phase;
            let legal = self.state.legal_intents(seat);
            if legal.is_empty() {
                continue;
            }
            if let Some((kind, payload)) = player.decide(self, seat, &legal) {
                acted |= self.execute(seat, kind, payload);
            }
            if self.state.phase != phase || self.state.is_finished() {
                return true;
            }
        }
        acted || self.advance_clock()
    }

    pub fn execute(&mut self, seat: &PlayerId, kind: PhaseKind, payload: IntentPayload) -> bool {
        match self.state.submit_intent(seat, kind, payload) {
            Ok(_) => true,
            Err(err) => {
                debug!(%seat, %err, "bot intent rejected");
                false
            }
        }
    }

    /// Jumps the virtual clock to the live timer and fires it.
    pub fn advance_clock(&mut self) -> bool {
        let Some((token, after)) = self.state.active_timer() else {
            return false;
        };
        self.clock += after;
        match self.state.fire_timer(token) {
            Ok(_) => true,
            Err(err) => {
                debug!(%err, "timer failed to advance the game");
                false
            }
        }
    }

    pub fn now(&self) -> Instant {
        self.clock
    }

    pub fn victory(&self) -> Option<&Victory> {
        self.state.victory()
    }
}
