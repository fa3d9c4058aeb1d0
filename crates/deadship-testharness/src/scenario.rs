//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Canonical demonstration scripts and their catalogue metadata."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Scripts are data: an ordered list of actions, each with a delay measured
//! from the completion of the previous one.
use std::str::FromStr;
use std::time::Duration;

use deadship_sim::InputPatch;
use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    #[error("unknown scenario {0}; expected 1 to 5")]
    UnknownScenario(u8),
    #[error("unrecognised scenario `{0}`")]
    UnknownName(String),
}

/// The five canonical demonstration scenarios.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScenarioId {
    DirectStartFailure = 1,
    NormalStart = 2,
    TestModeOffFailure = 3,
    FuelDrain = 4,
    HydraulicStart = 5,
}

impl ScenarioId {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn script(self) -> ScenarioScript {
        match self {
            ScenarioId::DirectStartFailure => direct_start_failure(),
            ScenarioId::NormalStart => normal_start(),
            ScenarioId::TestModeOffFailure => test_mode_off_failure(),
            ScenarioId::FuelDrain => fuel_drain(),
            ScenarioId::HydraulicStart => hydraulic_start(),
        }
    }
}

impl TryFrom<u8> for ScenarioId {
    type Error = ScenarioError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ScenarioId::iter()
            .find(|id| id.number() == value)
            .ok_or(ScenarioError::UnknownScenario(value))
    }
}

/// Accepts either the scenario number or its snake_case name.
impl FromStr for ScenarioId {
    type Err = ScenarioError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if let Ok(number) = trimmed.parse::<u8>() {
            return ScenarioId::try_from(number);
        }
        ScenarioId::iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ScenarioError::UnknownName(trimmed.to_owned()))
    }
}

/// One scripted action.
#[derive(Debug, Clone, Copy, PartialEq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ScenarioAction {
    SetState(InputPatch),
    StartBattery,
    /// Hydraulic start path without the HY31 pulse.
    StartHydraulic,
    CloseBreaker,
    /// Close the breaker if the hydraulic auto-close has not done so.
    ForceBreakerClose,
    Diagnostic(&'static str),
    Complete,
}

impl ScenarioAction {
    pub fn label(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioStep {
    /// Wait after the previous step before performing this one.
    pub delay: Duration,
    pub action: ScenarioAction,
}

fn step(delay_ms: u64, action: ScenarioAction) -> ScenarioStep {
    ScenarioStep {
        delay: Duration::from_millis(delay_ms),
        action,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioScript {
    pub id: ScenarioId,
    pub name: &'static str,
    pub description: &'static str,
    /// Nominal running time, for display.
    pub duration: &'static str,
    /// Operator-facing outline of what the script does.
    pub outline: &'static [&'static str],
    pub steps: Vec<ScenarioStep>,
}

impl ScenarioScript {
    /// Virtual time from load to the last step.
    pub fn total_delay(&self) -> Duration {
        self.steps.iter().map(|step| step.delay).sum()
    }
}

/// Every canonical script in scenario-number order.
pub fn catalogue() -> Vec<ScenarioScript> {
    ScenarioId::iter().map(ScenarioId::script).collect()
}

/// Five battery presses 3.5 to 12.5 s apart: enough time for each to trip.
fn repeated_battery_presses(patch: InputPatch) -> Vec<ScenarioStep> {
    vec![
        step(100, ScenarioAction::SetState(patch)),
        step(500, ScenarioAction::StartBattery),
        step(3_500, ScenarioAction::StartBattery),
        step(6_500, ScenarioAction::StartBattery),
        step(9_500, ScenarioAction::StartBattery),
        step(12_500, ScenarioAction::StartBattery),
        step(15_000, ScenarioAction::Complete),
    ]
}

fn direct_start_failure() -> ScenarioScript {
    ScenarioScript {
        id: ScenarioId::DirectStartFailure,
        name: "Mode 1: Direct Start Failure",
        description: "Trip with DO32 closed, battery drained to failure",
        duration: "~48 seconds",
        outline: &[
            "Reset simulator",
            "DO32: closed",
            "Press START five times",
            "Watch each attempt trip and drain the battery",
            "Fail to start raised at 14 V",
        ],
        steps: repeated_battery_presses(InputPatch {
            fuel_valve: Some(false),
            ..InputPatch::default()
        }),
    }
}

fn normal_start() -> ScenarioScript {
    ScenarioScript {
        id: ScenarioId::NormalStart,
        name: "Mode 2: Normal Start",
        description: "Ramp up with DO32 open, manual breaker close",
        duration: "~106 seconds",
        outline: &[
            "Reset simulator",
            "DO32: open",
            "Start on battery",
            "Watch the ramp stabilise at 45 s",
            "Close the breaker 50 s after the start",
        ],
        steps: vec![
            step(
                100,
                ScenarioAction::SetState(InputPatch {
                    fuel_valve: Some(true),
                    ..InputPatch::default()
                }),
            ),
            step(500, ScenarioAction::StartBattery),
            step(50_000, ScenarioAction::CloseBreaker),
            step(55_000, ScenarioAction::Complete),
        ],
    }
}

fn test_mode_off_failure() -> ScenarioScript {
    ScenarioScript {
        id: ScenarioId::TestModeOffFailure,
        name: "Mode 3: Test Mode OFF Failure",
        description: "Battery drained to failure with test mode off",
        duration: "~48 seconds",
        outline: &[
            "Reset simulator",
            "Test mode: off",
            "DO32: closed",
            "Press START five times",
            "Battery drained to failure",
        ],
        steps: repeated_battery_presses(InputPatch {
            fuel_valve: Some(false),
            test_mode: Some(false),
            ..InputPatch::default()
        }),
    }
}

fn fuel_drain() -> ScenarioScript {
    ScenarioScript {
        id: ScenarioId::FuelDrain,
        name: "Mode 4: Fuel Drain",
        description: "DO44 drain until the engine stops on low fuel",
        duration: "~48 minutes of plant time",
        outline: &[
            "Reset simulator",
            "DO44: open",
            "DO32: open",
            "Start on battery",
            "Monitor the drain until the low-fuel auto-stop",
        ],
        steps: vec![
            step(
                100,
                ScenarioAction::SetState(InputPatch {
                    fuel_valve: Some(true),
                    drain_valve: Some(true),
                    ..InputPatch::default()
                }),
            ),
            step(1_000, ScenarioAction::StartBattery),
            step(60_000, ScenarioAction::Diagnostic("one minute of drain")),
            // The 116th drain step lands one second before this.
            step(2_840_000, ScenarioAction::Complete),
        ],
    }
}

fn hydraulic_start() -> ScenarioScript {
    ScenarioScript {
        id: ScenarioId::HydraulicStart,
        name: "Mode 5: Hydraulic Start",
        description: "Low-battery hydraulic start with breaker auto-close",
        duration: "~122 seconds",
        outline: &[
            "Reset simulator",
            "Battery: 14 V",
            "DO32: open",
            "Hydraulic: 120 psi",
            "Start via the hydraulic path",
            "Watch for the breaker auto-close",
        ],
        steps: vec![
            step(
                100,
                ScenarioAction::SetState(InputPatch {
                    fuel_valve: Some(true),
                    battery_v: Some(14.0),
                    hydraulic_psi: Some(120.0),
                    ..InputPatch::default()
                }),
            ),
            step(200, ScenarioAction::Diagnostic("before hydraulic start")),
            step(500, ScenarioAction::StartHydraulic),
            step(1_000, ScenarioAction::Diagnostic("after hydraulic start, expect starting")),
            step(10_000, ScenarioAction::Diagnostic("10 s mark, breaker should close soon")),
            step(20_000, ScenarioAction::Diagnostic("breaker auto-close window has passed")),
            step(25_000, ScenarioAction::Diagnostic("checking breaker status")),
            step(30_000, ScenarioAction::ForceBreakerClose),
            step(35_000, ScenarioAction::Complete),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_numbers_and_names() {
        for id in ScenarioId::iter() {
            assert_eq!(ScenarioId::try_from(id.number()), Ok(id));
            assert_eq!(id.as_str().parse::<ScenarioId>(), Ok(id));
        }
        assert_eq!("4".parse::<ScenarioId>(), Ok(ScenarioId::FuelDrain));
        assert_eq!(
            ScenarioId::try_from(6),
            Err(ScenarioError::UnknownScenario(6))
        );
        assert!("warp_drive".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn every_script_ends_with_complete() {
        let scripts = catalogue();
        assert_eq!(scripts.len(), 5);
        for script in scripts {
            assert_eq!(
                script.steps.last().map(|step| step.action),
                Some(ScenarioAction::Complete),
                "{}",
                script.name
            );
            assert!(!script.outline.is_empty());
        }
    }

    #[test]
    fn total_delays_match_timelines() {
        assert_eq!(
            ScenarioId::DirectStartFailure.script().total_delay(),
            Duration::from_millis(47_600)
        );
        assert_eq!(
            ScenarioId::NormalStart.script().total_delay(),
            Duration::from_millis(105_600)
        );
        assert_eq!(
            ScenarioId::HydraulicStart.script().total_delay(),
            Duration::from_millis(121_800)
        );
    }

    #[test]
    fn action_labels() {
        assert_eq!(ScenarioAction::ForceBreakerClose.label(), "force_breaker_close");
        assert_eq!(ScenarioAction::Diagnostic("x").label(), "diagnostic");
    }
}
