//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Read-only snapshot handed to the presentation layer."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use serde::Serialize;

use crate::params::PlantParticulars;
use crate::resources::{BatteryBand, ResourceState};
use crate::state::{AlarmState, EngineState, OutputState, StartPath, SystemInputs};

/// Lamp and panel indications derived from the resources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Indications {
    pub battery_band: BatteryBand,
    pub can_start_on_battery: bool,
    pub low_battery: bool,
    pub fuel_critical: bool,
    pub fuel_fraction: f64,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub sim_time_ms: u64,
    pub engine_state: EngineState,
    pub start_path: Option<StartPath>,
    /// Seconds since the current attempt began, while starting or running.
    pub attempt_elapsed_s: Option<f64>,
    pub alarms: AlarmState,
    pub resources: ResourceState,
    pub outputs: OutputState,
    pub inputs: SystemInputs,
    pub indications: Indications,
    pub particulars: PlantParticulars,
}
