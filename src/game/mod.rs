//! Game domain: session state, phase machine, chain assignment and scoring.
//!
//! Nothing in here knows about actors or sockets; the server layer drives it.

pub mod assignment;
pub mod error;
pub mod scoring;
pub mod state;
pub mod types;
