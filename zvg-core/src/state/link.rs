//! IEEE-1284 link state

use super::events::LinkEvent;

/// Extensibility request sent during negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NegotiationMode {
    /// Reverse nibble transfers
    Nibble,
    /// Reverse nibble transfer of the device ID record
    DeviceId,
    /// Extended capabilities port
    Ecp,
}

impl NegotiationMode {
    /// Extensibility byte placed on the data lines
    pub fn to_byte(self) -> u8 {
        match self {
            NegotiationMode::Nibble => 0x00,
            NegotiationMode::DeviceId => 0x04,
            NegotiationMode::Ecp => 0x10,
        }
    }
}

/// Negotiated link mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Plain compatibility (SPP) mode; the only state safe to power down in
    #[default]
    Compatibility,
    /// Negotiation handshake in progress
    Negotiating(NegotiationMode),
    /// ECP forward transfers
    ForwardBlock,
    /// Nibble-mode reverse transfers
    ReverseNibble,
}

impl LinkState {
    pub fn is_ecp(&self) -> bool {
        matches!(self, LinkState::ForwardBlock)
    }

    pub fn is_nibble(&self) -> bool {
        matches!(self, LinkState::ReverseNibble)
    }

    /// Check if an IEEE-1284 mode is active and must be terminated
    pub fn is_negotiated(&self) -> bool {
        matches!(self, LinkState::ForwardBlock | LinkState::ReverseNibble)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: LinkEvent) -> Self {
        use LinkEvent::*;
        use LinkState::*;

        match (self, event) {
            (Compatibility, Negotiate(mode)) => Negotiating(mode),

            (Negotiating(NegotiationMode::Ecp), Accepted) => ForwardBlock,
            (Negotiating(_), Accepted) => ReverseNibble,
            (Negotiating(_), Refused) => Compatibility,

            (ForwardBlock | ReverseNibble, Terminated) => Compatibility,
            (ForwardBlock, Breach) => Compatibility,

            (_, ForceCompatibility) => Compatibility,

            // Default: stay in current state
            _ => self,
        }
    }
}
