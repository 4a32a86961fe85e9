use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::game::GameError;
use crate::roles::{RoleKey, RoleState};
use crate::types::{Aura, DeathCause, PlayerId, Team};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub role: Option<RoleKey>,
    pub team: Team,
    pub aura: Aura,
    pub alive: bool,
    pub last_death_cause: Option<DeathCause>,
    pub role_state: RoleState,
    /// Bonded partner: both win together and one's death takes the other.
    pub bond: Option<PlayerId>,
}

impl Player {
    pub fn new(id: PlayerId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            role: None,
            team: Team::Good,
            aura: Aura::Unknown,
            alive: true,
            last_death_cause: None,
            role_state: RoleState::None,
            bond: None,
        }
    }

    /// Assigns a role and resets team, aura and role state from the catalog.
    pub fn set_role(&mut self, role: RoleKey) {
        self.set_role_with_state(role, RoleState::initial(role));
    }

    pub fn set_role_with_state(&mut self, role: RoleKey, state: RoleState) {
        let def = role.def();
        self.role = Some(role);
        self.team = def.team;
        self.aura = def.aura;
        self.role_state = state;
    }

    pub fn role_is(&self, role: RoleKey) -> bool {
        self.role == Some(role)
    }

    pub fn is_pack_killer(&self) -> bool {
        self.role.is_some_and(|role| role.def().is_pack_killer())
    }

    pub fn is_evil(&self) -> bool {
        self.team == Team::Evil
    }

    /// The role others are shown: a disguised shapeshifter shows the stolen role.
    pub fn apparent_role(&self) -> Option<RoleKey> {
        self.role_state.disguise().or(self.role)
    }
}

/// Player registry for one game: join order is kept for display only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    players: Vec<Player>,
    index: HashMap<PlayerId, usize>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// A roster holding just `player`.
    pub fn with_first(player: Player) -> Self {
        let mut index = HashMap::new();
        index.insert(player.id.clone(), 0);
        Self {
            players: vec![player],
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.index.contains_key(id)
    }

    pub fn add(&mut self, player: Player) -> Result<(), GameError> {
        if self.contains(&player.id) {
            return Err(GameError::AlreadyJoined(player.id));
        }
        self.index.insert(player.id.clone(), self.players.len());
        self.players.push(player);
        Ok(())
    }

    pub fn remove(&mut self, id: &PlayerId) -> Option<Player> {
        let idx = self.index.remove(id)?;
        let player = self.players.remove(idx);
        for slot in self.index.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(player)
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.index.get(id).map(|&idx| &self.players[idx])
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.index.get(id).map(|&idx| &mut self.players[idx])
    }

    pub fn require(&self, id: &PlayerId) -> Result<&Player, GameError> {
        self.get(id).ok_or_else(|| GameError::UnknownPlayer(id.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }

    pub fn alive(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    pub fn alive_ids(&self) -> Vec<PlayerId> {
        self.alive().map(|p| p.id.clone()).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    pub fn is_alive(&self, id: &PlayerId) -> bool {
        self.get(id).is_some_and(|p| p.alive)
    }

    pub fn alive_with_role(&self, role: RoleKey) -> impl Iterator<Item = &Player> {
        self.alive().filter(move |p| p.role_is(role))
    }

    pub fn alive_in_team(&self, team: Team) -> usize {
        self.alive().filter(|p| p.team == team).count()
    }

    /// Marks a player dead. Killing an already-dead player is rejected.
    pub fn kill(&mut self, id: &PlayerId, cause: DeathCause) -> Result<(), GameError> {
        let player = self
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownPlayer(id.clone()))?;
        if !player.alive {
            return Err(GameError::AlreadyResolved(id.clone()));
        }
        player.alive = false;
        player.last_death_cause = Some(cause);
        Ok(())
    }

    pub fn revive(&mut self, id: &PlayerId) -> bool {
        match self.get_mut(id) {
            Some(player) if !player.alive => {
                player.alive = true;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_of(n: usize) -> Roster {
        let mut roster = Roster::new();
        for i in 0..n {
            roster
                .add(Player::new(PlayerId::new(format!("p{i}")), format!("Player {i}")))
                .expect("unique ids");
        }
        roster
    }

    #[test]
    fn duplicate_join_is_rejected() {
        let mut roster = roster_of(2);
        let err = roster
            .add(Player::new(PlayerId::new("p0"), "again".into()))
            .unwrap_err();
        assert!(matches!(err, GameError::AlreadyJoined(_)));
    }

    #[test]
    fn remove_keeps_index_consistent() {
        let mut roster = roster_of(4);
        roster.remove(&PlayerId::new("p1"));
        assert_eq!(roster.len(), 3);
        assert_eq!(
            roster.get(&PlayerId::new("p3")).map(|p| p.display_name.as_str()),
            Some("Player 3")
        );
    }

    #[test]
    fn second_kill_is_already_resolved() {
        let mut roster = roster_of(3);
        let id = PlayerId::new("p2");
        roster.kill(&id, DeathCause::WolfKill).expect("first kill");
        let err = roster.kill(&id, DeathCause::Vote).unwrap_err();
        assert!(matches!(err, GameError::AlreadyResolved(_)));
        assert_eq!(
            roster.get(&id).and_then(|p| p.last_death_cause),
            Some(DeathCause::WolfKill)
        );
    }

    #[test]
    fn set_role_derives_team_and_aura() {
        let mut player = Player::new(PlayerId::new("x"), "x".into());
        player.set_role(RoleKey::Sorcerer);
        assert_eq!(player.team, Team::Evil);
        assert_eq!(player.aura, Aura::Good);
    }
}
