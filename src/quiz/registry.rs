use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::quiz::ChatKey;

/// Where a chat key currently stands. Absent from the table means Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    CancelRequested,
}

/// What a cancel request achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    NotRunning,
    AlreadyCancelling,
    CancelAccepted,
}

/// Process-wide table of quiz sessions, one slot per chat key.
///
/// This is the only mutable state sessions share. Every transition goes
/// through one of the methods below under a single lock, which is what
/// makes concurrent starts for the same chat collapse to exactly one
/// winner. The old way of doing this was a bare dict with `True` and
/// `"cancel"` markers poked from several places.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    states: Mutex<HashMap<ChatKey, SessionState>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // The critical sections never await or call back out, so the lock is
    // only ever held for a few instructions
    fn table(&self) -> MutexGuard<'_, HashMap<ChatKey, SessionState>> {
        self.states.lock().unwrap()
    }

    pub fn state(&self, chat: ChatKey) -> SessionState {
        self.table()
            .get(&chat)
            .copied()
            .unwrap_or(SessionState::Idle)
    }

    /// Claim the chat key for a new session. Only an Idle (or absent) key
    /// can be claimed; exactly one of any number of concurrent callers
    /// gets `true`.
    pub fn try_start(&self, chat: ChatKey) -> bool {
        let mut states = self.table();
        match states.get(&chat) {
            None | Some(SessionState::Idle) => {
                states.insert(chat, SessionState::Running);
                true
            }
            Some(_) => false,
        }
    }

    /// Flag a running session to stop at its next cancellation check.
    pub fn request_cancel(&self, chat: ChatKey) -> CancelOutcome {
        let mut states = self.table();
        match states.get_mut(&chat) {
            None | Some(SessionState::Idle) => CancelOutcome::NotRunning,
            Some(SessionState::CancelRequested) => CancelOutcome::AlreadyCancelling,
            Some(state) => {
                *state = SessionState::CancelRequested;
                CancelOutcome::CancelAccepted
            }
        }
    }

    /// Return the key to Idle. Called by the session loop on natural
    /// completion and after honoring a cancellation; safe to call when
    /// the key is already Idle.
    pub fn finish(&self, chat: ChatKey) {
        self.table().remove(&chat);
    }

    /// Non-blocking poll used between questions and inside every wait.
    pub fn is_cancelling(&self, chat: ChatKey) -> bool {
        matches!(
            self.table().get(&chat),
            Some(SessionState::CancelRequested)
        )
    }
}
