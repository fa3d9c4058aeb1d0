//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation core module exports and shared types."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Simulation core for the MP120 emergency generator dead-ship start.
//!
//! The [`Simulator`] owns every piece of mutable plant state (inputs,
//! resources, engine state, alarms, derived outputs) together with the timers
//! that drive it on a virtual clock. Operators and scripted scenarios interact
//! with it only through [`Command`]s and read it back through
//! [`EngineSnapshot`]s.

pub mod command;
pub mod journal;
pub mod params;
pub mod ramp;
pub mod resources;
pub mod simulator;
pub mod snapshot;
pub mod state;

pub use command::{Command, CommandOutcome, InputPatch, Rejection};
pub use journal::{Journal, JournalEntry, JournalKind};
pub use params::PlantParticulars;
pub use ramp::{RampPoint, RampSample};
pub use resources::{BatteryBand, ResourceSimulator, ResourceState};
pub use simulator::{SimTimer, Simulator};
pub use snapshot::{EngineSnapshot, Indications};
pub use state::{AlarmState, EngineState, OutputState, StartPath, SystemInputs, Valve};
