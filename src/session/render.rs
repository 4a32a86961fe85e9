//! One plain line per engine event.

use itertools::Itertools;

use crate::game::reveal::{Composition, Disclosure};
use crate::game::vote::{NoLynchReason, VoteResult};
use crate::game::{EventKind, GameEvent, GamePhase, GameState, Notice};
use crate::types::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Announce(String),
    Notify(PlayerId, String),
}

pub fn render(state: &GameState, event: &GameEvent) -> Option<Delivery> {
    let name = |id: &PlayerId| display_name(state, id);
    let line = match event {
        GameEvent::PlayerJoined { name, .. } => format!("{name} joined the game."),
        GameEvent::PlayerLeft { player } => format!("{} left the game.", name(player)),
        GameEvent::HostChanged { host } => format!("{} is now the host.", name(host)),
        GameEvent::LobbyExtended { remaining_secs } => {
            format!("Lobby extended, {remaining_secs}s remaining.")
        }
        GameEvent::LobbyExpired { players } => {
            format!("Only {players} players joined. The game is cancelled.")
        }
        GameEvent::RevelationModeChanged { mode } => format!("Revelation mode is now {mode}."),
        GameEvent::GameStarted {
            players,
            composition,
        } => format!(
            "The game begins with {players} players. {}",
            render_composition(composition)
        ),
        GameEvent::PhaseChanged { phase, day } => match phase {
            GamePhase::Lobby => return None,
            GamePhase::Night => format!("Night {day} falls."),
            GamePhase::Discussion => format!("Day {day}: discuss."),
            GamePhase::Vote => format!("Day {day}: vote."),
            GamePhase::JudgeDecision => "The vote failed. The Judge may intervene.".to_string(),
            GamePhase::Ended => "The game is over.".to_string(),
        },
        GameEvent::Notice { to, notice } => {
            return Some(Delivery::Notify(to.clone(), render_notice(state, notice)));
        }
        GameEvent::IntentAccepted { player, .. } => {
            return Some(Delivery::Notify(player.clone(), "Choice recorded.".to_string()));
        }
        GameEvent::IntentRejected { player, reason } => {
            return Some(Delivery::Notify(player.clone(), format!("Rejected: {reason}")));
        }
        GameEvent::ForceVoteRequested {
            player,
            requests,
            needed,
        } => format!("{} wants to vote now ({requests}/{needed}).", name(player)),
        GameEvent::BallotCast { voter, target } => match target {
            Some(target) => format!("{} votes for {}.", name(voter), name(target)),
            None => format!("{} abstains.", name(voter)),
        },
        GameEvent::VoteResolved { result } => match result {
            VoteResult::Lynch { target, votes } => {
                format!("The village lynches {} with {votes} votes.", name(target))
            }
            VoteResult::NoLynch(NoLynchReason::Tie) => "The vote is tied. Nobody is lynched.".to_string(),
            VoteResult::NoLynch(NoLynchReason::NoVotes) => "Nobody voted.".to_string(),
        },
        GameEvent::Died {
            player,
            cause,
            disclosure,
        } => format!(
            "{} died ({cause}).{}",
            name(player),
            render_disclosure(disclosure)
        ),
        GameEvent::Resolved(event) => {
            let subject = name(&event.subject);
            match event.kind {
                EventKind::Protected => format!("An attack on {subject} was stopped."),
                EventKind::NearMiss => format!("{subject} was out when danger came calling."),
                EventKind::Survived => format!("{subject} survived an attack."),
                EventKind::Revived => format!("{subject} has returned from the dead."),
                EventKind::ShieldUsed => "The pack's guardian spent its shield.".to_string(),
                EventKind::PeacefulNight => "A strange calm: nobody was harmed tonight.".to_string(),
                _ => return None,
            }
        }
        GameEvent::Exposed { player, role } => {
            format!("The witness exposes {}: they were the {role}.", name(player))
        }
        GameEvent::LastStandPending { player } => {
            format!("{} makes a last stand and takes aim.", name(player))
        }
        GameEvent::JudgeDecisionPending { judge } => {
            return Some(Delivery::Notify(
                judge.clone(),
                "Execute someone or pass.".to_string(),
            ));
        }
        GameEvent::GameEnded { victory } => match victory {
            Some(victory) => format!(
                "{} wins: {}.",
                victory.party,
                victory.winners.iter().map(name).join(", ")
            ),
            None => "The game ended without a winner.".to_string(),
        },
    };
    Some(Delivery::Announce(line))
}

fn display_name(state: &GameState, id: &PlayerId) -> String {
    state
        .roster
        .get(id)
        .map_or_else(|| id.to_string(), |p| p.display_name.clone())
}

fn render_notice(state: &GameState, notice: &Notice) -> String {
    let name = |id: &PlayerId| display_name(state, id);
    match notice {
        Notice::RoleAssigned { role } => format!("You are the {role}."),
        Notice::AuraSeen { target, aura } => format!("{}'s aura is {aura}.", name(target)),
        Notice::SeerFound { target, is_seer } => {
            let verdict = if *is_seer { "is" } else { "is not" };
            format!("{} {verdict} the Seer.", name(target))
        }
        Notice::BondedTo { partner } => format!("You are bonded to {}.", name(partner)),
        Notice::RoleChanged { role } => format!("You are now the {role}."),
        Notice::DisguisedAs { role } => format!("You now pass as the {role}."),
        Notice::ExecutionerTarget { target } => {
            format!("Get {} lynched to win.", name(target))
        }
        Notice::PackMembers { members } => {
            format!("Your pack: {}.", members.iter().map(name).join(", "))
        }
    }
}

fn render_disclosure(disclosure: &Disclosure) -> String {
    match disclosure {
        Disclosure::Role(role) => format!(" They were the {role}."),
        Disclosure::Aura(aura) => format!(" Their aura was {aura}."),
        Disclosure::Nothing => String::new(),
    }
}

fn render_composition(composition: &Composition) -> String {
    match composition {
        Composition::Roles(roles) => format!(
            "Roles: {}.",
            roles.iter().map(|(role, n)| format!("{role} x{n}")).join(", ")
        ),
        Composition::Teams(teams) => format!(
            "Teams: {}.",
            teams.iter().map(|(team, n)| format!("{team} x{n}")).join(", ")
        ),
        Composition::Hidden => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::game::GameConfig;
    use crate::types::DeathCause;

    #[test]
    fn deaths_use_the_cause_tag() {
        let state = GameState::new(GameConfig::default(), PlayerId::new("h"), "Hana", Instant::now());
        let event = GameEvent::Died {
            player: PlayerId::new("h"),
            cause: DeathCause::WolfKill,
            disclosure: Disclosure::Nothing,
        };
        assert_eq!(
            render(&state, &event),
            Some(Delivery::Announce("Hana died (wolf_kill).".to_string()))
        );
    }
}
