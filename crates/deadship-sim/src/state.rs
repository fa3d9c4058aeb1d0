//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Engine state, operator inputs, alarms and derived outputs."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::params::{
    NO_LOAD_AMPS, NO_LOAD_KW, ON_LOAD, RPM_PER_HZ, RUNNING_COOLING_WATER_BAR,
    RUNNING_FUEL_OIL_BAR, RUNNING_LUBE_OIL_BAR,
};
use crate::ramp::RampSample;

/// Supervisory engine state. Exactly one is active at a time.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EngineState {
    #[default]
    Stopped,
    Starting,
    Running,
    Tripped,
    Failed,
}

impl EngineState {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Starting or running: the engine is turning and the update tick is live.
    pub fn is_active(self) -> bool {
        matches!(self, EngineState::Starting | EngineState::Running)
    }

    /// States from which a new start attempt may be made.
    pub fn accepts_start(self) -> bool {
        matches!(
            self,
            EngineState::Stopped | EngineState::Tripped | EngineState::Failed
        )
    }
}

/// How the current start attempt cranks the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StartPath {
    Battery,
    Hydraulic,
}

impl StartPath {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Operator-settable valves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Valve {
    /// DO32, fuel to engine.
    #[strum(serialize = "DO32")]
    #[serde(rename = "DO32")]
    FuelToEngine,
    /// DO33, fill to the emergency generator service tank.
    #[strum(serialize = "DO33")]
    #[serde(rename = "DO33")]
    FillAuxTank,
    /// DO44, drain to storage.
    #[strum(serialize = "DO44")]
    #[serde(rename = "DO44")]
    DrainToStorage,
}

/// Operator inputs. All valves and the breaker start closed (false).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemInputs {
    #[serde(rename = "do32_fuel_valve")]
    pub fuel_valve: bool,
    #[serde(rename = "do33_fill_valve")]
    pub fill_valve: bool,
    #[serde(rename = "do44_drain_valve")]
    pub drain_valve: bool,
    #[serde(rename = "hy31_start_valve")]
    pub hy31: bool,
    pub test_mode: bool,
    pub breaker_closed: bool,
    pub shore_power_connected: bool,
}

impl Default for SystemInputs {
    fn default() -> Self {
        Self {
            fuel_valve: false,
            fill_valve: false,
            drain_valve: false,
            hy31: false,
            test_mode: true,
            breaker_closed: false,
            shore_power_connected: false,
        }
    }
}

impl SystemInputs {
    pub(crate) fn valve_mut(&mut self, valve: Valve) -> &mut bool {
        match valve {
            Valve::FuelToEngine => &mut self.fuel_valve,
            Valve::FillAuxTank => &mut self.fill_valve,
            Valve::DrainToStorage => &mut self.drain_valve,
        }
    }

    /// Whether the generator should carry load this tick.
    pub fn on_load(&self, state: EngineState) -> bool {
        self.breaker_closed && !self.test_mode && state == EngineState::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AlarmState {
    pub trip: bool,
    pub fail_to_start: bool,
    pub stabilized: bool,
}

impl AlarmState {
    /// Clear the operator-acknowledgeable alarms at the start of an attempt.
    pub fn clear_faults(&mut self) {
        self.trip = false;
        self.fail_to_start = false;
    }
}

/// Derived generator readings. Zero whenever the engine is not turning.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OutputState {
    pub rpm: f64,
    pub voltage_v: f64,
    pub frequency_hz: f64,
    pub power_kw: f64,
    pub current_a: f64,
    pub lube_oil_bar: f64,
    pub fuel_oil_bar: f64,
    pub cooling_water_bar: f64,
}

impl OutputState {
    /// Recompute readings for one update tick.
    pub(crate) fn derive(sample: RampSample, state: EngineState, on_load: bool) -> Self {
        let mut outputs = OutputState {
            rpm: (sample.frequency_hz * RPM_PER_HZ).trunc(),
            voltage_v: sample.voltage_v,
            frequency_hz: sample.frequency_hz,
            ..OutputState::default()
        };
        if state == EngineState::Running {
            outputs.lube_oil_bar = RUNNING_LUBE_OIL_BAR;
            outputs.fuel_oil_bar = RUNNING_FUEL_OIL_BAR;
            outputs.cooling_water_bar = RUNNING_COOLING_WATER_BAR;
        }
        if on_load {
            outputs.voltage_v = ON_LOAD.voltage_v;
            outputs.frequency_hz = ON_LOAD.frequency_hz;
            outputs.power_kw = ON_LOAD.power_kw;
            outputs.current_a = ON_LOAD.current_a;
            outputs.rpm = ON_LOAD.rpm;
        } else {
            outputs.power_kw = NO_LOAD_KW;
            outputs.current_a = NO_LOAD_AMPS;
        }
        outputs
    }
}
