//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Runtime helpers supporting the simulator."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Deterministic timer bookkeeping and real-time pacing for the trainer runtime.

pub mod scheduling;
pub mod timers;

pub use scheduling::RateLimiter;
pub use timers::{Fired, PendingTimer, TimerSet};
