//! One tokio task per game. The task owns the `GameState`; every call and
//! every timer expiry arrives through its command channel, so the state is
//! never touched concurrently. Outbound messages go through a second task,
//! the outbox, so a slow transport never holds up the game.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::game::reveal::RosterEntry;
use crate::game::{
    GameConfig, GameError, GamePhase, GameState, IntentPayload, PhaseKind, StepOutcome,
    TimerCommand, TimerToken, Victory,
};
use crate::session::SessionId;
use crate::session::messenger::Messenger;
use crate::session::render::{Delivery, render};
use crate::types::{PlayerId, RevelationMode};

const COMMAND_BUFFER: usize = 64;
/// Longest wait for a single `notify`/`announce` before it is dropped.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub enum Operation {
    Join { player: PlayerId, name: String },
    Leave { player: PlayerId },
    ForceStart { caller: PlayerId },
    ForceEnd { caller: PlayerId },
    SetRevelationMode { caller: PlayerId, mode: RevelationMode },
    ExtendLobby { caller: PlayerId },
    Submit {
        player: PlayerId,
        phase: PhaseKind,
        payload: IntentPayload,
    },
}

impl Operation {
    fn actor(&self) -> &PlayerId {
        match self {
            Operation::Join { player, .. }
            | Operation::Leave { player }
            | Operation::Submit { player, .. } => player,
            Operation::ForceStart { caller }
            | Operation::ForceEnd { caller }
            | Operation::SetRevelationMode { caller, .. }
            | Operation::ExtendLobby { caller } => caller,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub day: u32,
    pub roster: Vec<RosterEntry>,
    pub victory: Option<Victory>,
}

type Reply = oneshot::Sender<Result<StepOutcome, GameError>>;

enum Command {
    Apply { op: Operation, reply: Reply },
    Timer(TimerToken),
    Legal {
        player: PlayerId,
        reply: oneshot::Sender<Vec<(PhaseKind, IntentPayload)>>,
    },
    Snapshot(oneshot::Sender<Snapshot>),
}

/// Cheap, cloneable access to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// True once the game has ended and its task has exited.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub async fn join(&self, player: PlayerId, name: impl Into<String>) -> Result<StepOutcome, GameError> {
        self.apply(Operation::Join {
            player,
            name: name.into(),
        })
        .await
    }

    pub async fn leave(&self, player: PlayerId) -> Result<StepOutcome, GameError> {
        self.apply(Operation::Leave { player }).await
    }

    pub async fn force_start(&self, caller: PlayerId) -> Result<StepOutcome, GameError> {
        self.apply(Operation::ForceStart { caller }).await
    }

    pub async fn force_end(&self, caller: PlayerId) -> Result<StepOutcome, GameError> {
        self.apply(Operation::ForceEnd { caller }).await
    }

    pub async fn set_revelation_mode(
        &self,
        caller: PlayerId,
        mode: RevelationMode,
    ) -> Result<StepOutcome, GameError> {
        self.apply(Operation::SetRevelationMode { caller, mode }).await
    }

    pub async fn extend_lobby(&self, caller: PlayerId) -> Result<StepOutcome, GameError> {
        self.apply(Operation::ExtendLobby { caller }).await
    }

    pub async fn submit_intent(
        &self,
        player: PlayerId,
        phase: PhaseKind,
        payload: IntentPayload,
    ) -> Result<StepOutcome, GameError> {
        self.apply(Operation::Submit {
            player,
            phase,
            payload,
        })
        .await
    }

    pub async fn apply(&self, op: Operation) -> Result<StepOutcome, GameError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Apply { op, reply })
            .await
            .map_err(|_| GameError::GameFinished)?;
        rx.await.map_err(|_| GameError::GameFinished)?
    }

    pub async fn legal_intents(&self, player: PlayerId) -> Vec<(PhaseKind, IntentPayload)> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Legal { player, reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// `None` once the session has shut down.
    pub async fn snapshot(&self) -> Option<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Snapshot(reply)).await.ok()?;
        rx.await.ok()
    }
}

struct SessionActor {
    id: SessionId,
    state: GameState,
    outbox: mpsc::UnboundedSender<Delivery>,
    commands: mpsc::Receiver<Command>,
    timer_tx: mpsc::WeakSender<Command>,
    timers: HashMap<TimerToken, JoinHandle<()>>,
}

/// Opens a lobby hosted by `host` and spawns the task that runs it.
pub fn spawn_session(
    id: SessionId,
    config: GameConfig,
    host: PlayerId,
    host_name: String,
    messenger: Arc<dyn Messenger>,
) -> SessionHandle {
    let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
    let now = tokio::time::Instant::now().into_std();
    let (state, opened) = GameState::open(config, host, host_name, now);
    let (outbox, pending) = mpsc::unbounded_channel();
    tokio::spawn(run_outbox(id.clone(), messenger, pending));
    let actor = SessionActor {
        id: id.clone(),
        state,
        outbox,
        commands,
        timer_tx: tx.downgrade(),
        timers: HashMap::new(),
    };
    tokio::spawn(actor.run(opened));
    SessionHandle { id, tx }
}

impl SessionActor {
    async fn run(mut self, opened: StepOutcome) {
        info!(session = %self.id, host = %self.state.host(), "session opened");
        self.apply_timers(&opened.timers);

        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Apply { op, reply } => {
                    let actor = op.actor().clone();
                    let result = self.apply(op);
                    match &result {
                        Ok(outcome) => self.handle_outcome(outcome),
                        Err(err) => self.reject(&actor, err),
                    }
                    let _ = reply.send(result);
                }
                Command::Timer(token) => {
                    self.timers.remove(&token);
                    match self.state.fire_timer(token) {
                        Ok(outcome) => self.handle_outcome(&outcome),
                        Err(err) => warn!(session = %self.id, %err, "timer could not advance the game"),
                    }
                }
                Command::Legal { player, reply } => {
                    let _ = reply.send(self.state.legal_intents(&player));
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(Snapshot {
                        phase: self.state.phase,
                        day: self.state.day,
                        roster: self.state.public_roster(),
                        victory: self.state.victory().cloned(),
                    });
                }
            }
            if self.state.is_finished() {
                break;
            }
        }

        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        info!(session = %self.id, "session closed");
    }

    fn apply(&mut self, op: Operation) -> Result<StepOutcome, GameError> {
        match op {
            Operation::Join { player, name } => self.state.join(player, name),
            Operation::Leave { player } => self.state.leave(&player),
            Operation::ForceStart { caller } => self.state.force_start(&caller),
            Operation::ForceEnd { caller } => self.state.force_end(&caller),
            Operation::SetRevelationMode { caller, mode } => {
                self.state.set_revelation_mode(&caller, mode)
            }
            Operation::ExtendLobby { caller } => {
                let now = tokio::time::Instant::now().into_std();
                self.state.extend_lobby(&caller, now)
            }
            Operation::Submit {
                player,
                phase,
                payload,
            } => self.state.submit_intent(&player, phase, payload),
        }
    }

    fn handle_outcome(&mut self, outcome: &StepOutcome) {
        self.apply_timers(&outcome.timers);
        for event in &outcome.events {
            if let Some(delivery) = render(&self.state, event) {
                self.deliver(delivery);
            }
        }
    }

    fn apply_timers(&mut self, commands: &[TimerCommand]) {
        for command in commands {
            match *command {
                TimerCommand::Schedule { token, after } => {
                    let tx = self.timer_tx.clone();
                    let handle = tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        if let Some(tx) = tx.upgrade() {
                            let _ = tx.send(Command::Timer(token)).await;
                        }
                    });
                    debug!(session = %self.id, ?token, ?after, "timer scheduled");
                    self.timers.insert(token, handle);
                }
                TimerCommand::Cancel(token) => {
                    if let Some(handle) = self.timers.remove(&token) {
                        handle.abort();
                        debug!(session = %self.id, ?token, "timer cancelled");
                    }
                }
            }
        }
    }

    fn reject(&self, player: &PlayerId, err: &GameError) {
        self.deliver(Delivery::Notify(player.clone(), format!("Rejected: {err}")));
    }

    fn deliver(&self, delivery: Delivery) {
        if self.outbox.send(delivery).is_err() {
            warn!(session = %self.id, "outbox closed, message dropped");
        }
    }
}

/// Sends queued messages in order. Failures and timeouts are logged and
/// dropped; game state never depends on delivery. Ends once the session's
/// actor is gone and the queue is drained.
async fn run_outbox(
    id: SessionId,
    messenger: Arc<dyn Messenger>,
    mut pending: mpsc::UnboundedReceiver<Delivery>,
) {
    while let Some(delivery) = pending.recv().await {
        let send = async {
            match &delivery {
                Delivery::Announce(text) => messenger.announce(&id, text).await,
                Delivery::Notify(to, text) => messenger.notify(to, text).await,
            }
        };
        match tokio::time::timeout(DELIVERY_TIMEOUT, send).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(session = %id, %err, "message delivery failed"),
            Err(_) => warn!(session = %id, timeout = ?DELIVERY_TIMEOUT, "message delivery timed out"),
        }
    }
    debug!(session = %id, "outbox drained");
}
