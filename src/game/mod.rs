pub mod assignment;
pub mod deaths;
pub mod events;
pub mod game;
pub mod intent;
pub mod night;
pub mod players;
pub mod reveal;
pub mod state;
pub mod timers;
pub mod victory;
pub mod vote;

pub use assignment::{Assignment, assign};
pub use events::{Event, EventKind, Notice};
pub use game::Game;
pub use intent::IntentPayload;
pub use night::{NightContext, NightReport, resolve_night};
pub use players::{Player, Roster};
pub use reveal::{Composition, Disclosure, RosterEntry};
pub use state::{ConfigError, GameConfig, GameError, GameEvent, GamePhase, GameState, PhaseKind, StepOutcome};
pub use timers::{TimerCommand, TimerToken};
pub use victory::{Party, Victory};
pub use vote::{NoLynchReason, VoteResult};
