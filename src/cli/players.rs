use crate::game::{Game, IntentPayload, PhaseKind};
use crate::players::{BasePlayer, PassivePlayer, RandomPlayer};
use crate::types::PlayerId;

pub struct CliPlayer {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const CLI_PLAYERS: &[CliPlayer] = &[
    CliPlayer {
        code: "R",
        name: "RandomPlayer",
        description: "Picks a random legal intent, preferring actions over passing.",
    },
    CliPlayer {
        code: "P",
        name: "PassivePlayer",
        description: "Never acts. Every phase runs out its timer.",
    },
];

#[derive(Clone)]
pub enum PlayerInstance {
    Random(RandomPlayer),
    Passive(PassivePlayer),
}

impl PlayerInstance {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerInstance::Random(_) => "Random",
            PlayerInstance::Passive(_) => "Passive",
        }
    }
}

impl BasePlayer for PlayerInstance {
    fn decide(
        &self,
        game: &Game,
        seat: &PlayerId,
        actions: &[(PhaseKind, IntentPayload)],
    ) -> Option<(PhaseKind, IntentPayload)> {
        match self {
            PlayerInstance::Random(p) => p.decide(game, seat, actions),
            PlayerInstance::Passive(p) => p.decide(game, seat, actions),
        }
    }
}

pub fn create_player(code: &str) -> Option<PlayerInstance> {
    match code.trim().to_uppercase().as_str() {
        "R" => Some(PlayerInstance::Random(RandomPlayer)),
        "P" => Some(PlayerInstance::Passive(PassivePlayer)),
        _ => None,
    }
}

/// Expands a comma-separated code list to `seats` bots; the last code repeats.
pub fn create_players(codes: &str, seats: usize) -> Result<Vec<PlayerInstance>, String> {
    let mut bots = Vec::with_capacity(seats);
    for code in codes.split(',').filter(|c| !c.trim().is_empty()) {
        bots.push(create_player(code).ok_or_else(|| format!("unknown player code '{code}'"))?);
    }
    let last = bots.last().cloned().ok_or("no player codes given")?;
    bots.truncate(seats);
    bots.resize(seats, last);
    Ok(bots)
}

pub fn print_player_help() {
    println!("Player Legend:");
    println!("{:<5} {:<25} {}", "CODE", "PLAYER", "DESCRIPTION");
    println!("{}", "-".repeat(80));
    for player in CLI_PLAYERS {
        println!("{:<5} {:<25} {}", player.code, player.name, player.description);
    }
}
