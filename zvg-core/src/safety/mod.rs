//! Monitor protection logic
//!
//! Analog X-Y monitors carry a spot killer: a circuit that blanks the beam
//! when it has not been deflected far enough for a while. The monitor here
//! tracks how far each frame actually deflected so the encoder can prove
//! deflection with two off-screen dots when a frame did not.

mod spot_killer;

pub use spot_killer::*;
