#![warn(clippy::all)]
#![deny(rust_2018_idioms)]

pub mod cli;
pub mod game;
pub mod logging;
pub mod players;
pub mod roles;
pub mod session;
pub mod types;

pub use game::{Game, GameConfig, GameError, GameEvent, GamePhase, GameState, PhaseKind};
pub use roles::RoleKey;
pub use session::{SessionHandle, SessionManager};
pub use types::{PlayerId, RevelationMode, Team};
