//! Local typing state
//!
//! Debounces the local typing signal: `typing_start` goes out only on the
//! rising edge, while the auto-stop deadline re-arms on every keystroke.
//! The session's event loop watches the deadline and expires it.

use std::time::Duration;

use tokio::time::Instant;

/// Tracks the local typing flag and its single auto-stop deadline
#[derive(Debug)]
pub struct TypingTracker {
    is_typing: bool,
    deadline: Option<Instant>,
    auto_stop: Duration,
}

impl TypingTracker {
    pub fn new(auto_stop: Duration) -> Self {
        Self {
            is_typing: false,
            deadline: None,
            auto_stop,
        }
    }

    /// Register typing activity
    ///
    /// Re-arms the auto-stop deadline on every call. Returns true when a
    /// `typing_start` frame should be sent (rising edge only).
    pub fn start(&mut self) -> bool {
        let rising_edge = !self.is_typing;
        self.is_typing = true;
        self.deadline = Some(Instant::now() + self.auto_stop);
        rising_edge
    }

    /// Explicitly stop typing
    ///
    /// Cancels the pending deadline. Returns true when a `typing_stop`
    /// frame should be sent (only if typing was active).
    pub fn stop(&mut self) -> bool {
        self.deadline = None;
        let was_typing = self.is_typing;
        self.is_typing = false;
        was_typing
    }

    /// Clear the local flag without emitting any frame
    ///
    /// Used when a chat message is sent; the server infers the stop.
    pub fn clear_local(&mut self) {
        self.is_typing = false;
        self.deadline = None;
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    /// Deadline the session loop should sleep until, if one is armed
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
