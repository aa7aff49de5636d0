//! Device session lifecycle

use super::events::SessionEvent;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    #[default]
    Closed,
    /// Detecting the port and running the self-test
    Opening,
    /// Accepting frames
    Open,
    /// Draining transfers and parking the beam
    Closing,
}

impl SessionState {
    /// Check if frames may be submitted
    pub fn accepts_frames(&self) -> bool {
        matches!(self, SessionState::Open)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: SessionEvent) -> Self {
        use SessionEvent::*;
        use SessionState::*;

        match (self, event) {
            (Closed, OpenRequested) => Opening,
            (Opening, OpenComplete) => Open,
            (Opening, OpenFailed) => Closed,
            (Open, CloseRequested) => Closing,
            (Closing, CloseComplete) => Closed,

            // Default: stay in current state
            _ => self,
        }
    }
}
