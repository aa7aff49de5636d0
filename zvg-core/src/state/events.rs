//! Events that trigger state transitions

use super::link::NegotiationMode;

/// Events driving the IEEE-1284 link state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// Host wrote the extensibility byte and raised 1284Active
    Negotiate(NegotiationMode),
    /// Peripheral completed the negotiation handshake
    Accepted,
    /// A negotiation phase timed out or the mode was refused
    Refused,
    /// Termination handshake finished (or was forced)
    Terminated,
    /// Status lines in a combination the protocol forbids
    Breach,
    /// Control lines driven straight back to compatibility mode
    ForceCompatibility,
}

impl LinkEvent {
    /// Check if this event indicates a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, LinkEvent::Refused | LinkEvent::Breach)
    }
}

/// Events driving the session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEvent {
    /// Caller asked to open the device
    OpenRequested,
    /// Detection and self-test passed
    OpenComplete,
    /// Detection, allocation or self-test failed
    OpenFailed,
    /// Caller asked to close the device
    CloseRequested,
    /// Beam parked and link terminated
    CloseComplete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_events() {
        assert!(LinkEvent::Refused.is_failure());
        assert!(LinkEvent::Breach.is_failure());
        assert!(!LinkEvent::Accepted.is_failure());
        assert!(!LinkEvent::Negotiate(NegotiationMode::Ecp).is_failure());
    }
}
