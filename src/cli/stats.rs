use std::collections::HashMap;
use std::time::Duration;

use crate::game::{Game, GameEvent, Party};

#[derive(Debug, Default, Clone)]
pub struct GameStats {
    pub wins: HashMap<Party, u32>,
    /// Games that hit the day limit or were aborted.
    pub unfinished: u32,
    pub games: u32,
    pub total_days: u64,
    pub total_deaths: u64,
    pub total_duration: Duration,
}

impl GameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_game(&mut self, game: &Game, duration: Duration) {
        self.games += 1;
        self.total_duration += duration;
        self.total_days += u64::from(game.state.day);
        self.total_deaths += game
            .state
            .log()
            .iter()
            .filter(|e| matches!(e, GameEvent::Died { .. }))
            .count() as u64;

        match game.victory() {
            Some(victory) => *self.wins.entry(victory.party).or_insert(0) += 1,
            None => self.unfinished += 1,
        }
    }

    pub fn merge(&mut self, other: GameStats) {
        for (party, wins) in other.wins {
            *self.wins.entry(party).or_insert(0) += wins;
        }
        self.unfinished += other.unfinished;
        self.games += other.games;
        self.total_days += other.total_days;
        self.total_deaths += other.total_deaths;
        self.total_duration += other.total_duration;
    }

    pub fn win_rate(&self, party: Party) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        f64::from(self.wins.get(&party).copied().unwrap_or(0)) / f64::from(self.games) * 100.0
    }

    pub fn get_avg_days(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.total_days as f64 / f64::from(self.games)
    }

    pub fn get_avg_deaths(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.total_deaths as f64 / f64::from(self.games)
    }

    pub fn get_avg_duration(&self) -> Duration {
        if self.games == 0 {
            return Duration::ZERO;
        }
        self.total_duration / self.games
    }
}

#[derive(Default)]
pub struct StatisticsAccumulator {
    pub stats: GameStats,
}

impl StatisticsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn after(&mut self, game: &Game, duration: Duration) {
        self.stats.record_game(game, duration);
    }
}
