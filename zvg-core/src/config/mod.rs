//! Configuration
//!
//! A port configuration string (the `ZVGPORT` syntax) is parsed into a
//! [`PortConfig`], then resolved against what the parallel port chipset
//! reports into the [`SessionConfig`] a session runs with. Reading the
//! environment is left to the application.

pub mod env;
pub mod types;

pub use env::parse_port_config;
pub use types::*;
