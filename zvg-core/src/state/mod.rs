//! Link and session state machines
//!
//! Both machines are explicit, finite and deterministic: the next state is
//! a pure function of the current state and an event. Events that make no
//! sense in the current state leave it unchanged.

pub mod events;
pub mod link;
pub mod session;

pub use events::{LinkEvent, SessionEvent};
pub use link::{LinkState, NegotiationMode};
pub use session::SessionState;
