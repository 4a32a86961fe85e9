use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, info, warn};

use crate::roles::{RoleKey, RoleState};
use crate::types::{DeathCause, PlayerId, RevelationMode, Team, TimerKind};

use super::{
    assignment::assign,
    events::{Event, Notice},
    intent::{IntentPayload, legal_night_payloads, usable_ability, validate_night},
    night::{NightContext, fill_forced_choices, resolve_night},
    players::{Player, Roster},
    reveal::{Composition, Disclosure, RosterEntry, composition, disclose, public_roster},
    timers::{TimerBook, TimerCommand, TimerToken},
    victory::{Victory, evaluate},
    vote::{DayResolution, VoteResult, apply_execution, apply_last_stand, apply_lynch, tally},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub min_players: usize,
    pub max_players: usize,
    pub lobby_secs: u64,
    pub lobby_extension_secs: u64,
    pub lobby_max_extensions: u32,
    /// Extensions are only granted while less than this much time remains.
    pub lobby_extend_threshold_secs: u64,
    /// Absolute limit on lobby length, measured from opening.
    pub lobby_cap_secs: u64,
    pub night_secs: u64,
    pub discussion_secs: u64,
    pub vote_secs: u64,
    pub judge_secs: u64,
    pub revenge_secs: u64,
    /// Share of alive players whose requests end discussion early.
    pub force_vote_fraction: f64,
    pub revelation_mode: RevelationMode,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 5,
            max_players: 35,
            lobby_secs: 180,
            lobby_extension_secs: 30,
            lobby_max_extensions: 3,
            lobby_extend_threshold_secs: 60,
            lobby_cap_secs: 600,
            night_secs: 90,
            discussion_secs: 120,
            vote_secs: 60,
            judge_secs: 30,
            revenge_secs: 30,
            force_vote_fraction: 0.6,
            revelation_mode: RevelationMode::Full,
            seed: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid game config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl GameConfig {
    /// Loads a JSON document; keys it leaves out keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn duration(&self, kind: TimerKind) -> Duration {
        let secs = match kind {
            TimerKind::Lobby => self.lobby_secs,
            TimerKind::Night => self.night_secs,
            TimerKind::Discussion => self.discussion_secs,
            TimerKind::Vote => self.vote_secs,
            TimerKind::Judge => self.judge_secs,
            TimerKind::Revenge => self.revenge_secs,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum GamePhase {
    Lobby,
    Night,
    Discussion,
    Vote,
    JudgeDecision,
    Ended,
}

/// The kind of choice an intent carries. Must match the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PhaseKind {
    Night,
    ForceVote,
    Vote,
    Judge,
    LastStand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PlayerJoined {
        player: PlayerId,
        name: String,
    },
    PlayerLeft {
        player: PlayerId,
    },
    HostChanged {
        host: PlayerId,
    },
    LobbyExtended {
        remaining_secs: u64,
    },
    LobbyExpired {
        players: usize,
    },
    RevelationModeChanged {
        mode: RevelationMode,
    },
    GameStarted {
        players: usize,
        composition: Composition,
    },
    PhaseChanged {
        phase: GamePhase,
        day: u32,
    },
    /// Private information for one player.
    Notice {
        to: PlayerId,
        notice: Notice,
    },
    IntentAccepted {
        player: PlayerId,
        phase: PhaseKind,
    },
    IntentRejected {
        player: PlayerId,
        reason: String,
    },
    ForceVoteRequested {
        player: PlayerId,
        requests: usize,
        needed: usize,
    },
    BallotCast {
        voter: PlayerId,
        target: Option<PlayerId>,
    },
    VoteResolved {
        result: VoteResult,
    },
    Died {
        player: PlayerId,
        cause: DeathCause,
        disclosure: Disclosure,
    },
    /// Any non-death resolution record.
    Resolved(Event),
    /// A true role disclosed regardless of revelation mode.
    Exposed {
        player: PlayerId,
        role: RoleKey,
    },
    LastStandPending {
        player: PlayerId,
    },
    JudgeDecisionPending {
        judge: PlayerId,
    },
    GameEnded {
        victory: Option<Victory>,
    },
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("game already completed")]
    GameFinished,
    #[error("not enough players: have {have}, need {need}")]
    InsufficientPlayers { have: usize, need: usize },
    #[error("invalid intent: {0}")]
    InvalidIntent(String),
    #[error("not your turn")]
    NotYourTurn,
    #[error("only the host may do that")]
    Unauthorized,
    #[error("{0} has already been resolved")]
    AlreadyResolved(PlayerId),
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("{0} already joined")]
    AlreadyJoined(PlayerId),
    #[error("lobby is full ({0} players)")]
    LobbyFull(usize),
    #[error("lobby is closed")]
    LobbyClosed,
    #[error("lobby extension refused: {0}")]
    ExtensionRefused(&'static str),
}

#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub events: Vec<GameEvent>,
    pub timers: Vec<TimerCommand>,
    pub done: bool,
}

#[derive(Debug, Clone, Copy)]
struct LobbyClock {
    opened: Instant,
    deadline: Instant,
    extensions: u32,
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub config: GameConfig,
    pub phase: GamePhase,
    pub day: u32,
    pub roster: Roster,
    pub revelation_mode: RevelationMode,
    host: PlayerId,
    pending_intents: BTreeMap<PlayerId, IntentPayload>,
    protected: BTreeSet<PlayerId>,
    pending_revenge: Option<PlayerId>,
    pending_judge: Option<PlayerId>,
    force_vote_requests: BTreeSet<PlayerId>,
    bonus_kill: bool,
    timers: TimerBook,
    lobby: LobbyClock,
    victory: Option<Victory>,
    log: Vec<GameEvent>,
    rng: StdRng,
}

impl GameState {
    /// Opens a lobby with `host` as its first member and arms the lobby timer.
    ///
    /// The lobby timer's `Schedule` command is not returned here; a driver
    /// that runs its own timers should call [`GameState::open`] instead, or
    /// read [`GameState::active_timer`].
    pub fn new(config: GameConfig, host: PlayerId, host_name: impl Into<String>, now: Instant) -> Self {
        Self::open(config, host, host_name, now).0
    }

    /// Like [`GameState::new`], also returning the outcome that arms the
    /// lobby timer.
    pub fn open(
        config: GameConfig,
        host: PlayerId,
        host_name: impl Into<String>,
        now: Instant,
    ) -> (Self, StepOutcome) {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let roster = Roster::with_first(Player::new(host.clone(), host_name.into()));

        let lobby_len = config.duration(TimerKind::Lobby);
        let mut timers = TimerBook::default();
        let mut opened = StepOutcome::default();
        timers.schedule(TimerKind::Lobby, lobby_len, &mut opened.timers);

        let state = Self {
            revelation_mode: config.revelation_mode,
            config,
            phase: GamePhase::Lobby,
            day: 0,
            roster,
            host,
            pending_intents: BTreeMap::new(),
            protected: BTreeSet::new(),
            pending_revenge: None,
            pending_judge: None,
            force_vote_requests: BTreeSet::new(),
            bonus_kill: false,
            timers,
            lobby: LobbyClock {
                opened: now,
                deadline: now + lobby_len,
                extensions: 0,
            },
            victory: None,
            log: Vec::new(),
            rng,
        };
        (state, opened)
    }

    pub fn host(&self) -> &PlayerId {
        &self.host
    }

    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::Ended
    }

    pub fn victory(&self) -> Option<&Victory> {
        self.victory.as_ref()
    }

    /// Every event produced so far, rejections included.
    pub fn log(&self) -> &[GameEvent] {
        &self.log
    }

    pub fn active_timer(&self) -> Option<(TimerToken, Duration)> {
        self.timers.active()
    }

    pub fn pending_revenge(&self) -> Option<&PlayerId> {
        self.pending_revenge.as_ref()
    }

    pub fn protected(&self) -> &BTreeSet<PlayerId> {
        &self.protected
    }

    pub fn public_roster(&self) -> Vec<RosterEntry> {
        public_roster(self.revelation_mode, self.day, &self.roster)
    }

    pub fn join(&mut self, player: PlayerId, name: impl Into<String>) -> Result<StepOutcome, GameError> {
        let result = self.try_join(&player, name.into());
        self.settle(&player, result)
    }

    pub fn leave(&mut self, player: &PlayerId) -> Result<StepOutcome, GameError> {
        let result = self.try_leave(player);
        self.settle(player, result)
    }

    pub fn force_start(&mut self, caller: &PlayerId) -> Result<StepOutcome, GameError> {
        let result = self.try_force_start(caller);
        self.settle(caller, result)
    }

    pub fn force_end(&mut self, caller: &PlayerId) -> Result<StepOutcome, GameError> {
        let result = self.authorize(caller).and_then(|()| {
            self.ensure_running()?;
            let mut out = StepOutcome::default();
            self.finish(None, &mut out);
            Ok(out)
        });
        self.settle(caller, result)
    }

    pub fn set_revelation_mode(
        &mut self,
        caller: &PlayerId,
        mode: RevelationMode,
    ) -> Result<StepOutcome, GameError> {
        let result = self.authorize(caller).and_then(|()| {
            self.ensure_running()?;
            self.revelation_mode = mode;
            Ok(StepOutcome {
                events: vec![GameEvent::RevelationModeChanged { mode }],
                ..StepOutcome::default()
            })
        });
        self.settle(caller, result)
    }

    pub fn extend_lobby(&mut self, caller: &PlayerId, now: Instant) -> Result<StepOutcome, GameError> {
        let result = self.try_extend_lobby(caller, now);
        self.settle(caller, result)
    }

    /// Accepts one intent from `player` for the current phase.
    pub fn submit_intent(
        &mut self,
        player: &PlayerId,
        phase: PhaseKind,
        payload: IntentPayload,
    ) -> Result<StepOutcome, GameError> {
        let result = self.try_submit(player, phase, payload);
        self.settle(player, result)
    }

    /// Handles an expired timer. Tokens that are no longer live are ignored.
    pub fn fire_timer(&mut self, token: TimerToken) -> Result<StepOutcome, GameError> {
        if !self.timers.claim(token) {
            warn!(?token, "ignoring stale timer");
            return Ok(StepOutcome::default());
        }
        debug!(?token, phase = %self.phase, "timer fired");
        let mut out = StepOutcome::default();
        match token.kind {
            TimerKind::Lobby => self.lobby_expired(&mut out)?,
            TimerKind::Night => self.resolve_night_phase(&mut out),
            TimerKind::Discussion => self.enter_phase(GamePhase::Vote, Some(TimerKind::Vote), &mut out),
            TimerKind::Vote => self.resolve_vote(&mut out),
            TimerKind::Judge => {
                self.pending_judge = None;
                self.enter_night(&mut out);
            }
            TimerKind::Revenge => {
                if let Some(shooter) = self.pending_revenge.take() {
                    debug!(%shooter, "last stand forfeited");
                }
                self.enter_night(&mut out);
            }
        }
        Ok(self.commit(out))
    }

    /// Every intent `actor` could submit right now.
    pub fn legal_intents(&self, actor: &PlayerId) -> Vec<(PhaseKind, IntentPayload)> {
        let alive = self.roster.is_alive(actor);
        match self.phase {
            GamePhase::Night if !self.pending_intents.contains_key(actor) => {
                legal_night_payloads(&self.roster, self.day, actor)
                    .into_iter()
                    .map(|payload| (PhaseKind::Night, payload))
                    .collect()
            }
            GamePhase::Discussion if alive && !self.force_vote_requests.contains(actor) => {
                vec![(PhaseKind::ForceVote, IntentPayload::Activate)]
            }
            GamePhase::Vote if self.pending_revenge.as_ref() == Some(actor) => {
                self.target_options(actor, PhaseKind::LastStand)
            }
            GamePhase::Vote
                if self.pending_revenge.is_none()
                    && alive
                    && !self.pending_intents.contains_key(actor) =>
            {
                self.target_options(actor, PhaseKind::Vote)
            }
            GamePhase::JudgeDecision if self.pending_judge.as_ref() == Some(actor) => {
                self.target_options(actor, PhaseKind::Judge)
            }
            _ => Vec::new(),
        }
    }

    fn target_options(&self, actor: &PlayerId, kind: PhaseKind) -> Vec<(PhaseKind, IntentPayload)> {
        let mut options = vec![(kind, IntentPayload::Pass)];
        options.extend(
            self.roster
                .alive()
                .filter(|p| &p.id != actor)
                .map(|p| (kind, IntentPayload::Target(p.id.clone()))),
        );
        options
    }

    /// Appends the outcome to the log, or records the rejection.
    fn settle(
        &mut self,
        caller: &PlayerId,
        result: Result<StepOutcome, GameError>,
    ) -> Result<StepOutcome, GameError> {
        match result {
            Ok(out) => Ok(self.commit(out)),
            Err(err) => {
                debug!(player = %caller, %err, "intent rejected");
                self.log.push(GameEvent::IntentRejected {
                    player: caller.clone(),
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn commit(&mut self, mut out: StepOutcome) -> StepOutcome {
        self.log.extend(out.events.iter().cloned());
        out.done = self.is_finished();
        out
    }

    fn authorize(&self, caller: &PlayerId) -> Result<(), GameError> {
        if caller == &self.host {
            Ok(())
        } else {
            Err(GameError::Unauthorized)
        }
    }

    fn ensure_running(&self) -> Result<(), GameError> {
        if self.is_finished() {
            Err(GameError::GameFinished)
        } else {
            Ok(())
        }
    }

    fn ensure_lobby(&self) -> Result<(), GameError> {
        self.ensure_running()?;
        if self.phase != GamePhase::Lobby {
            return Err(GameError::LobbyClosed);
        }
        Ok(())
    }

    fn try_join(&mut self, player: &PlayerId, name: String) -> Result<StepOutcome, GameError> {
        self.ensure_lobby()?;
        if self.roster.contains(player) {
            return Err(GameError::AlreadyJoined(player.clone()));
        }
        if self.roster.len() >= self.config.max_players {
            return Err(GameError::LobbyFull(self.config.max_players));
        }
        self.roster.add(Player::new(player.clone(), name.clone()))?;
        debug!(%player, players = self.roster.len(), "player joined");
        Ok(StepOutcome {
            events: vec![GameEvent::PlayerJoined {
                player: player.clone(),
                name,
            }],
            ..StepOutcome::default()
        })
    }

    fn try_leave(&mut self, player: &PlayerId) -> Result<StepOutcome, GameError> {
        self.ensure_lobby()?;
        self.roster
            .remove(player)
            .ok_or_else(|| GameError::UnknownPlayer(player.clone()))?;
        let mut out = StepOutcome::default();
        out.events.push(GameEvent::PlayerLeft {
            player: player.clone(),
        });
        if player == &self.host {
            let next_host = self.roster.iter().next().map(|p| p.id.clone());
            match next_host {
                Some(next) => {
                    self.host = next.clone();
                    out.events.push(GameEvent::HostChanged { host: next });
                }
                None => self.finish(None, &mut out),
            }
        }
        Ok(out)
    }

    fn try_force_start(&mut self, caller: &PlayerId) -> Result<StepOutcome, GameError> {
        self.authorize(caller)?;
        self.ensure_lobby()?;
        let mut out = StepOutcome::default();
        self.start_game(&mut out)?;
        Ok(out)
    }

    fn try_extend_lobby(&mut self, caller: &PlayerId, now: Instant) -> Result<StepOutcome, GameError> {
        self.authorize(caller)?;
        self.ensure_lobby()?;
        if self.lobby.extensions >= self.config.lobby_max_extensions {
            return Err(GameError::ExtensionRefused("no extensions left"));
        }
        let remaining = self.lobby.deadline.saturating_duration_since(now);
        if remaining >= Duration::from_secs(self.config.lobby_extend_threshold_secs) {
            return Err(GameError::ExtensionRefused("too much time remains"));
        }
        let cap = self.lobby.opened + Duration::from_secs(self.config.lobby_cap_secs);
        let extended = (self.lobby.deadline + Duration::from_secs(self.config.lobby_extension_secs)).min(cap);
        if extended <= self.lobby.deadline {
            return Err(GameError::ExtensionRefused("lobby cap reached"));
        }

        self.lobby.deadline = extended;
        self.lobby.extensions += 1;
        let remaining = extended.saturating_duration_since(now);
        let mut out = StepOutcome::default();
        self.timers.schedule(TimerKind::Lobby, remaining, &mut out.timers);
        out.events.push(GameEvent::LobbyExtended {
            remaining_secs: remaining.as_secs(),
        });
        Ok(out)
    }

    fn try_submit(
        &mut self,
        player: &PlayerId,
        kind: PhaseKind,
        payload: IntentPayload,
    ) -> Result<StepOutcome, GameError> {
        self.ensure_running()?;
        self.roster.require(player)?;
        let mut out = StepOutcome::default();
        match (self.phase, kind) {
            (GamePhase::Night, PhaseKind::Night) => self.submit_night(player, payload, &mut out)?,
            (GamePhase::Discussion, PhaseKind::ForceVote) => {
                self.request_force_vote(player, payload, &mut out)?
            }
            (GamePhase::Vote, PhaseKind::Vote) => self.cast_ballot(player, payload, &mut out)?,
            (GamePhase::Vote, PhaseKind::LastStand) => self.last_stand(player, payload, &mut out)?,
            (GamePhase::JudgeDecision, PhaseKind::Judge) => {
                self.judge_decision(player, payload, &mut out)?
            }
            _ => return Err(GameError::NotYourTurn),
        }
        Ok(out)
    }

    fn submit_night(
        &mut self,
        player: &PlayerId,
        payload: IntentPayload,
        out: &mut StepOutcome,
    ) -> Result<(), GameError> {
        if self.pending_intents.contains_key(player) {
            return Err(GameError::NotYourTurn);
        }
        validate_night(&self.roster, self.day, player, &payload)?;
        debug!(%player, ?payload, "night intent accepted");
        self.pending_intents.insert(player.clone(), payload);
        out.events.push(GameEvent::IntentAccepted {
            player: player.clone(),
            phase: PhaseKind::Night,
        });

        let everyone_acted = self
            .roster
            .alive()
            .filter(|p| usable_ability(p, self.day).is_some())
            .all(|p| self.pending_intents.contains_key(&p.id));
        if everyone_acted {
            self.resolve_night_phase(out);
        }
        Ok(())
    }

    fn request_force_vote(
        &mut self,
        player: &PlayerId,
        payload: IntentPayload,
        out: &mut StepOutcome,
    ) -> Result<(), GameError> {
        if !self.roster.is_alive(player) || self.force_vote_requests.contains(player) {
            return Err(GameError::NotYourTurn);
        }
        if payload != IntentPayload::Activate {
            return Err(GameError::InvalidIntent("force-vote takes no target".into()));
        }
        self.force_vote_requests.insert(player.clone());
        let alive = self.roster.alive_count();
        let needed = ((alive as f64) * self.config.force_vote_fraction).ceil().max(1.0) as usize;
        let requests = self.force_vote_requests.len();
        out.events.push(GameEvent::ForceVoteRequested {
            player: player.clone(),
            requests,
            needed,
        });
        if requests >= needed {
            self.enter_phase(GamePhase::Vote, Some(TimerKind::Vote), out);
        }
        Ok(())
    }

    fn cast_ballot(
        &mut self,
        voter: &PlayerId,
        payload: IntentPayload,
        out: &mut StepOutcome,
    ) -> Result<(), GameError> {
        if self.pending_revenge.is_some()
            || !self.roster.is_alive(voter)
            || self.pending_intents.contains_key(voter)
        {
            return Err(GameError::NotYourTurn);
        }
        let target = self.day_target(voter, &payload)?;
        debug!(%voter, ?target, "ballot cast");
        self.pending_intents.insert(voter.clone(), payload);
        out.events.push(GameEvent::BallotCast {
            voter: voter.clone(),
            target,
        });

        let everyone_voted = self
            .roster
            .alive()
            .all(|p| self.pending_intents.contains_key(&p.id));
        if everyone_voted {
            self.resolve_vote(out);
        }
        Ok(())
    }

    /// A day-time choice: `Pass`, or another alive player.
    fn day_target(&self, actor: &PlayerId, payload: &IntentPayload) -> Result<Option<PlayerId>, GameError> {
        match payload {
            IntentPayload::Pass => Ok(None),
            IntentPayload::Target(target) if target != actor && self.roster.is_alive(target) => {
                Ok(Some(target.clone()))
            }
            IntentPayload::Target(target) => Err(GameError::InvalidIntent(format!(
                "{target} is not a valid target"
            ))),
            _ => Err(GameError::InvalidIntent("expected a single target".into())),
        }
    }

    fn last_stand(
        &mut self,
        shooter: &PlayerId,
        payload: IntentPayload,
        out: &mut StepOutcome,
    ) -> Result<(), GameError> {
        if self.pending_revenge.as_ref() != Some(shooter) {
            return Err(GameError::NotYourTurn);
        }
        let target = self.day_target(shooter, &payload)?;
        self.pending_revenge = None;
        self.timers.cancel(&mut out.timers);
        if let Some(target) = target {
            let resolution = apply_last_stand(&mut self.roster, shooter, &target);
            self.publish_day(resolution, out);
            if self.check_victory(None, out) {
                return Ok(());
            }
        }
        self.enter_night(out);
        Ok(())
    }

    fn judge_decision(
        &mut self,
        judge: &PlayerId,
        payload: IntentPayload,
        out: &mut StepOutcome,
    ) -> Result<(), GameError> {
        if self.pending_judge.as_ref() != Some(judge) {
            return Err(GameError::NotYourTurn);
        }
        let target = self.day_target(judge, &payload)?;
        self.pending_judge = None;
        self.timers.cancel(&mut out.timers);
        if let Some(target) = target {
            let resolution = apply_execution(&mut self.roster, judge, &target);
            self.publish_day(resolution, out);
            if self.check_victory(None, out) {
                return Ok(());
            }
        }
        self.enter_night(out);
        Ok(())
    }

    fn lobby_expired(&mut self, out: &mut StepOutcome) -> Result<(), GameError> {
        if self.roster.len() < self.config.min_players {
            info!(players = self.roster.len(), "lobby expired without enough players");
            out.events.push(GameEvent::LobbyExpired {
                players: self.roster.len(),
            });
            self.finish(None, out);
            return Ok(());
        }
        self.start_game(out)
    }

    fn start_game(&mut self, out: &mut StepOutcome) -> Result<(), GameError> {
        let ids = self.roster.ids();
        let assignment = assign(&ids, self.config.min_players, &mut self.rng)?;

        for (id, role) in &assignment.roles {
            if let Some(player) = self.roster.get_mut(id) {
                player.set_role(*role);
            }
            out.events.push(GameEvent::Notice {
                to: id.clone(),
                notice: Notice::RoleAssigned { role: *role },
            });
        }
        for (a, b) in &assignment.bonds {
            for (one, other) in [(a, b), (b, a)] {
                if let Some(player) = self.roster.get_mut(one) {
                    player.bond = Some(other.clone());
                }
                out.events.push(GameEvent::Notice {
                    to: one.clone(),
                    notice: Notice::BondedTo {
                        partner: other.clone(),
                    },
                });
            }
        }
        for (executioner, target) in &assignment.executioner_targets {
            if let Some(player) = self.roster.get_mut(executioner) {
                player.role_state = RoleState::Executioner {
                    target: Some(target.clone()),
                };
            }
            out.events.push(GameEvent::Notice {
                to: executioner.clone(),
                notice: Notice::ExecutionerTarget {
                    target: target.clone(),
                },
            });
        }

        let pack: Vec<PlayerId> = self
            .roster
            .iter()
            .filter(|p| p.team == Team::Evil)
            .map(|p| p.id.clone())
            .collect();
        for member in &pack {
            out.events.push(GameEvent::Notice {
                to: member.clone(),
                notice: Notice::PackMembers {
                    members: pack.clone(),
                },
            });
        }

        info!(players = ids.len(), mode = %self.revelation_mode, "game started");
        out.events.push(GameEvent::GameStarted {
            players: ids.len(),
            composition: composition(self.revelation_mode, &self.roster),
        });
        self.enter_night(out);
        Ok(())
    }

    fn enter_phase(&mut self, phase: GamePhase, timer: Option<TimerKind>, out: &mut StepOutcome) {
        self.phase = phase;
        self.pending_intents.clear();
        match timer {
            Some(kind) => {
                let after = self.config.duration(kind);
                self.timers.schedule(kind, after, &mut out.timers);
            }
            None => self.timers.cancel(&mut out.timers),
        }
        info!(%phase, day = self.day, "phase changed");
        out.events.push(GameEvent::PhaseChanged {
            phase,
            day: self.day,
        });
    }

    fn enter_night(&mut self, out: &mut StepOutcome) {
        self.day += 1;
        self.protected.clear();
        self.force_vote_requests.clear();
        self.enter_phase(GamePhase::Night, Some(TimerKind::Night), out);
    }

    fn resolve_night_phase(&mut self, out: &mut StepOutcome) {
        self.timers.cancel(&mut out.timers);
        if self.day == 1 {
            fill_forced_choices(&self.roster, self.day, &mut self.pending_intents, &mut self.rng);
        }
        let intents = std::mem::take(&mut self.pending_intents);
        let ctx = NightContext {
            day: self.day,
            bonus_kill: std::mem::take(&mut self.bonus_kill),
        };
        let report = resolve_night(&mut self.roster, &mut self.protected, &mut self.rng, &intents, ctx);
        debug!(day = self.day, deaths = report.deaths().count(), peaceful = report.peaceful, "night resolved");
        self.bonus_kill = report.bonus_kill_next;
        self.publish(report.events, report.notices, out);

        if self.check_victory(None, out) {
            return;
        }
        self.enter_phase(GamePhase::Discussion, Some(TimerKind::Discussion), out);
    }

    fn resolve_vote(&mut self, out: &mut StepOutcome) {
        self.timers.cancel(&mut out.timers);
        let result = tally(self.pending_intents.values().filter_map(IntentPayload::target));
        out.events.push(GameEvent::VoteResolved {
            result: result.clone(),
        });

        let target = match result {
            VoteResult::Lynch { target, .. } => target,
            VoteResult::NoLynch(reason) => {
                debug!(?reason, "no lynch");
                let judge = self
                    .roster
                    .alive_with_role(RoleKey::Judge)
                    .find(|p| p.role_state.has_judge_authority())
                    .map(|p| p.id.clone());
                match judge {
                    Some(judge) => {
                        self.enter_phase(GamePhase::JudgeDecision, Some(TimerKind::Judge), out);
                        self.pending_judge = Some(judge.clone());
                        out.events.push(GameEvent::JudgeDecisionPending { judge });
                    }
                    None => self.enter_night(out),
                }
                return;
            }
        };

        let resolution = apply_lynch(&mut self.roster, &target);
        let shielded = resolution.shielded_by.is_some();
        let revenge = resolution.revenge.clone();
        self.publish_day(resolution, out);
        if shielded {
            self.enter_night(out);
            return;
        }
        if self.check_victory(Some(&target), out) {
            return;
        }
        match revenge {
            Some(shooter) => {
                self.pending_intents.clear();
                self.pending_revenge = Some(shooter.clone());
                let after = self.config.duration(TimerKind::Revenge);
                self.timers.schedule(TimerKind::Revenge, after, &mut out.timers);
                out.events.push(GameEvent::LastStandPending { player: shooter });
            }
            None => self.enter_night(out),
        }
    }

    fn publish_day(&mut self, resolution: DayResolution, out: &mut StepOutcome) {
        self.bonus_kill |= resolution.bonus_kill_next;
        self.publish(resolution.events, resolution.notices, out);
        for (player, role) in resolution.exposed {
            out.events.push(GameEvent::Exposed { player, role });
        }
    }

    /// Turns resolution records into table events, applying the revelation policy.
    fn publish(&self, events: Vec<Event>, notices: Vec<(PlayerId, Notice)>, out: &mut StepOutcome) {
        for event in events {
            match (event.is_death(), event.cause, self.roster.get(&event.subject)) {
                (true, Some(cause), Some(player)) => out.events.push(GameEvent::Died {
                    player: event.subject.clone(),
                    cause,
                    disclosure: disclose(self.revelation_mode, self.day, player),
                }),
                _ => out.events.push(GameEvent::Resolved(event)),
            }
        }
        out.events.extend(
            notices
                .into_iter()
                .map(|(to, notice)| GameEvent::Notice { to, notice }),
        );
    }

    fn check_victory(&mut self, lynched: Option<&PlayerId>, out: &mut StepOutcome) -> bool {
        match evaluate(&self.roster, lynched) {
            Some(victory) => {
                self.finish(Some(victory), out);
                true
            }
            None => false,
        }
    }

    fn finish(&mut self, victory: Option<Victory>, out: &mut StepOutcome) {
        self.timers.cancel(&mut out.timers);
        self.phase = GamePhase::Ended;
        self.pending_intents.clear();
        self.pending_revenge = None;
        self.pending_judge = None;
        match &victory {
            Some(victory) => info!(party = %victory.party, day = self.day, "game over"),
            None => info!(day = self.day, "game ended without a winner"),
        }
        out.events.push(GameEvent::PhaseChanged {
            phase: GamePhase::Ended,
            day: self.day,
        });
        out.events.push(GameEvent::GameEnded {
            victory: victory.clone(),
        });
        self.victory = victory;
    }
}
