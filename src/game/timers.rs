use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::TimerKind;

/// Identifies one scheduled timer. Tokens are never reused within a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken {
    pub id: u64,
    pub kind: TimerKind,
}

/// Instructions for whoever owns the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Schedule { token: TimerToken, after: Duration },
    Cancel(TimerToken),
}

/// At most one phase timer is live at any time.
#[derive(Debug, Clone, Default)]
pub struct TimerBook {
    next_id: u64,
    active: Option<(TimerToken, Duration)>,
}

impl TimerBook {
    /// Replaces the live timer, cancelling the previous one.
    pub fn schedule(&mut self, kind: TimerKind, after: Duration, out: &mut Vec<TimerCommand>) -> TimerToken {
        self.cancel(out);
        self.next_id += 1;
        let token = TimerToken {
            id: self.next_id,
            kind,
        };
        self.active = Some((token, after));
        out.push(TimerCommand::Schedule { token, after });
        token
    }

    pub fn cancel(&mut self, out: &mut Vec<TimerCommand>) {
        if let Some((token, _)) = self.active.take() {
            out.push(TimerCommand::Cancel(token));
        }
    }

    /// Consumes `token` if it is the live timer. Stale tokens return false.
    pub fn claim(&mut self, token: TimerToken) -> bool {
        match self.active {
            Some((live, _)) if live == token => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    pub fn active(&self) -> Option<(TimerToken, Duration)> {
        self.active
    }
}
