//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Operator command contract for the simulation core."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use thiserror::Error;

use crate::state::{EngineState, Valve};

/// Commands accepted from the presentation boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetValve { valve: Valve, open: bool },
    /// Momentary HY31 operation: opens for a short pulse and cranks hydraulically.
    PulseHy31,
    SetTestMode(bool),
    SetShorePower(bool),
    StartBatteryPath,
    /// Stop the engine. A reason marks the stop as protective and raises the trip lamp.
    StopEngine { reason: Option<String> },
    CloseBreaker,
    OpenBreaker,
    ManualPump,
    Reset,
}

/// Scripted overrides applied by a scenario's set-state step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputPatch {
    pub fuel_valve: Option<bool>,
    pub drain_valve: Option<bool>,
    pub test_mode: Option<bool>,
    pub battery_v: Option<f64>,
    pub hydraulic_psi: Option<f64>,
}

/// Why a command left the plant unchanged (apart from any alarm it raised).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("fill valve DO33 cannot open while fuel is critical ({fuel_m3:.3} m³)")]
    FuelCritical { fuel_m3: f64 },
    #[error("battery at {battery_v:.1} V is below the start threshold; use the hydraulic start")]
    BatteryLow { battery_v: f64 },
    #[error("start ignored: engine is already {0}")]
    EngineBusy(EngineState),
    #[error("stop ignored: engine is {0}")]
    NotRunning(EngineState),
    #[error("scenario {0} is running; only reset is accepted")]
    ScenarioBusy(u8),
}

/// Result of a command. Failures are alarms or rejections, never errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Accepted,
    Rejected(Rejection),
}

impl CommandOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CommandOutcome::Accepted)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            CommandOutcome::Accepted => None,
            CommandOutcome::Rejected(rejection) => Some(rejection),
        }
    }
}

impl From<Rejection> for CommandOutcome {
    fn from(rejection: Rejection) -> Self {
        CommandOutcome::Rejected(rejection)
    }
}
