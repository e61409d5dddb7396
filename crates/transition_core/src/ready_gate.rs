use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use shared::domain::ReadyToken;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    Signaled,
    TimedOut,
}

struct GateState {
    token: ReadyToken,
    resolved: bool,
    sender: Option<watch::Sender<bool>>,
}

pub struct ReadinessGate {
    state: Mutex<GateState>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                token: ReadyToken(0),
                resolved: false,
                sender: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self) -> GateWait {
        let mut state = self.state();
        state.token = ReadyToken(state.token.0 + 1);
        state.resolved = false;
        let (sender, receiver) = watch::channel(false);
        state.sender = Some(sender);
        GateWait {
            token: state.token,
            receiver: Some(receiver),
        }
    }

    pub fn token(&self) -> ReadyToken {
        self.state().token
    }

    pub fn is_resolved(&self) -> bool {
        self.state().resolved
    }

    /// Resolve the live gate. Returns `false` (and does nothing) when the gate already
    /// resolved or `token` belongs to an older gate.
    pub fn signal(&self, token: Option<ReadyToken>) -> bool {
        let mut state = self.state();
        if state.resolved {
            return false;
        }
        if let Some(token) = token {
            if token != state.token {
                debug!(
                    stale = token.0,
                    live = state.token.0,
                    "ready gate: ignoring signal for superseded navigation"
                );
                return false;
            }
        }
        state.resolved = true;
        if let Some(sender) = &state.sender {
            sender.send_replace(true);
        }
        true
    }

    pub fn current_wait(&self) -> GateWait {
        let state = self.state();
        let receiver = match (&state.sender, state.resolved) {
            (Some(sender), false) => Some(sender.subscribe()),
            _ => None,
        };
        GateWait {
            token: state.token,
            receiver,
        }
    }

    pub async fn wait_with_timeout(&self, timeout: Duration) -> ReadyOutcome {
        let wait = self.current_wait();
        match tokio::time::timeout(timeout, wait.wait()).await {
            Ok(()) => ReadyOutcome::Signaled,
            Err(_) => ReadyOutcome::TimedOut,
        }
    }

    pub fn handle(self: &Arc<Self>) -> ReadySignal {
        ReadySignal {
            gate: Arc::clone(self),
            token: self.token(),
        }
    }
}

pub struct GateWait {
    token: ReadyToken,
    receiver: Option<watch::Receiver<bool>>,
}

impl GateWait {
    pub fn token(&self) -> ReadyToken {
        self.token
    }

    pub async fn wait(self) {
        let Some(mut receiver) = self.receiver else {
            return;
        };
        if receiver.wait_for(|ready| *ready).await.is_err() {
            // Superseded before it resolved: this gate can no longer be satisfied.
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Clone)]
pub struct ReadySignal {
    gate: Arc<ReadinessGate>,
    token: ReadyToken,
}

impl ReadySignal {
    pub fn token(&self) -> ReadyToken {
        self.token
    }

    pub fn signal(&self) -> bool {
        self.gate.signal(Some(self.token))
    }

    pub fn signal_latest(&self) -> bool {
        self.gate.signal(None)
    }
}

#[cfg(test)]
#[path = "tests/ready_gate_tests.rs"]
mod tests;
