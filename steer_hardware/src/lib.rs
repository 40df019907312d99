//! Device implementations behind the `steer_traits` seams.
//!
//! Only the scripted participant ships here; a tablet driver plugs in by
//! implementing `Digitizer` and reporting failures as [`error::HwError`].

pub mod error;
pub mod sim;

pub use sim::{SimProfile, SimulatedCue, SimulatedParticipant, simulated_pair};
