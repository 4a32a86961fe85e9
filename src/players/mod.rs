pub mod base;
pub mod passive;
pub mod random;

pub use base::BasePlayer;
pub use passive::PassivePlayer;
pub use random::RandomPlayer;
