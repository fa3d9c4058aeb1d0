//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Battery, fuel and hydraulic resource bookkeeping."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Discrete resource steps. Timer scheduling lives with the [`crate::Simulator`];
//! this module only knows how a single drain, fill, attempt or pump stroke
//! changes the plant and which bounds it must respect.
use serde::Serialize;
use strum::{Display, IntoStaticStr};

use crate::params::{
    round_to, BATTERY_ATTEMPT_COST_V, BATTERY_INITIAL_V, BATTERY_MED_THRESHOLD_V,
    BATTERY_START_THRESHOLD_V, FUEL_CRITICAL_M3, FUEL_DECIMALS, FUEL_DRAIN_STEP_M3,
    FUEL_FILL_STEP_M3, FUEL_INITIAL_FRACTION, FUEL_TANK_CAPACITY_M3, HYDRAULIC_MAX_PSI,
    HYDRAULIC_PUMP_STEP_PSI,
};

/// Stored energy available to the start system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceState {
    pub battery_v: f64,
    pub fuel_m3: f64,
    pub hydraulic_psi: f64,
}

impl Default for ResourceState {
    fn default() -> Self {
        Self {
            battery_v: BATTERY_INITIAL_V,
            fuel_m3: round_to(FUEL_TANK_CAPACITY_M3 * FUEL_INITIAL_FRACTION, FUEL_DECIMALS),
            hydraulic_psi: 0.0,
        }
    }
}

/// Battery condition band shown on the status panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE")]
pub enum BatteryBand {
    Ok,
    Med,
    Low,
}

/// Result of one refill step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStep {
    Filling,
    Full,
}

/// Applies bounded resource mutations to a [`ResourceState`].
#[derive(Debug, Clone, Default)]
pub struct ResourceSimulator {
    state: ResourceState,
}

impl ResourceSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = ResourceState::default();
    }

    /// Debit the per-attempt start cost from the battery, floored at zero.
    pub fn drain_battery_for_attempt(&mut self) -> f64 {
        self.state.battery_v = round_to((self.state.battery_v - BATTERY_ATTEMPT_COST_V).max(0.0), 1);
        self.state.battery_v
    }

    /// One drain-valve interval: remove a fixed volume, floored at zero.
    pub fn drain_fuel_step(&mut self) -> f64 {
        self.state.fuel_m3 = round_to(
            (self.state.fuel_m3 - FUEL_DRAIN_STEP_M3).max(0.0),
            FUEL_DECIMALS,
        );
        self.state.fuel_m3
    }

    /// One fill-valve interval: add a fixed volume, capped at tank capacity.
    pub fn fill_fuel_step(&mut self) -> FillStep {
        self.state.fuel_m3 = round_to(
            (self.state.fuel_m3 + FUEL_FILL_STEP_M3).min(FUEL_TANK_CAPACITY_M3),
            FUEL_DECIMALS,
        );
        if self.state.fuel_m3 >= FUEL_TANK_CAPACITY_M3 {
            FillStep::Full
        } else {
            FillStep::Filling
        }
    }

    /// One hand-pump stroke.
    pub fn pump(&mut self) -> f64 {
        self.state.hydraulic_psi =
            (self.state.hydraulic_psi + HYDRAULIC_PUMP_STEP_PSI).min(HYDRAULIC_MAX_PSI);
        self.state.hydraulic_psi
    }

    /// Force the battery voltage, as scripted scenarios do to stage a flat battery.
    pub fn set_battery(&mut self, volts: f64) {
        self.state.battery_v = round_to(volts.max(0.0), 1);
    }

    /// Force the accumulator pressure, clamped to the gauge range.
    pub fn set_hydraulic(&mut self, psi: f64) {
        self.state.hydraulic_psi = psi.clamp(0.0, HYDRAULIC_MAX_PSI);
    }

    pub fn fuel_critical(&self) -> bool {
        self.state.fuel_m3 < FUEL_CRITICAL_M3
    }

    pub fn fuel_fraction(&self) -> f64 {
        self.state.fuel_m3 / FUEL_TANK_CAPACITY_M3
    }

    pub fn can_start_on_battery(&self) -> bool {
        self.state.battery_v >= BATTERY_START_THRESHOLD_V
    }

    pub fn battery_band(&self) -> BatteryBand {
        if self.state.battery_v < BATTERY_START_THRESHOLD_V {
            BatteryBand::Low
        } else if self.state.battery_v < BATTERY_MED_THRESHOLD_V {
            BatteryBand::Med
        } else {
            BatteryBand::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_conditions() {
        let state = ResourceState::default();
        assert_eq!(state.battery_v, 24.0);
        assert_eq!(state.fuel_m3, 1.2);
        assert_eq!(state.hydraulic_psi, 0.0);
    }

    #[test]
    fn battery_attempts_step_down_by_two_volts() {
        let mut sim = ResourceSimulator::new();
        let readings: Vec<f64> = (0..5).map(|_| sim.drain_battery_for_attempt()).collect();
        assert_eq!(readings, vec![22.0, 20.0, 18.0, 16.0, 14.0]);

        sim.set_battery(1.3);
        assert_eq!(sim.drain_battery_for_attempt(), 0.0);
    }

    #[test]
    fn fuel_drain_floors_at_zero() {
        let mut sim = ResourceSimulator::new();
        assert_eq!(sim.drain_fuel_step(), 1.19);
        for _ in 0..200 {
            sim.drain_fuel_step();
        }
        assert_eq!(sim.state().fuel_m3, 0.0);
    }

    #[test]
    fn fuel_drain_crosses_critical_threshold_on_step_116() {
        let mut sim = ResourceSimulator::new();
        for _ in 0..115 {
            sim.drain_fuel_step();
        }
        assert_eq!(sim.state().fuel_m3, 0.05);
        assert!(!sim.fuel_critical());
        sim.drain_fuel_step();
        assert!(sim.fuel_critical());
    }

    #[test]
    fn fill_caps_at_capacity() {
        let mut sim = ResourceSimulator::new();
        let mut steps = 0;
        while sim.fill_fuel_step() == FillStep::Filling {
            steps += 1;
        }
        assert_eq!(steps, 59);
        assert_eq!(sim.state().fuel_m3, FUEL_TANK_CAPACITY_M3);
        assert_eq!(sim.fill_fuel_step(), FillStep::Full);
        assert_eq!(sim.state().fuel_m3, FUEL_TANK_CAPACITY_M3);
    }

    #[test]
    fn pump_caps_at_gauge_limit() {
        let mut sim = ResourceSimulator::new();
        for _ in 0..12 {
            sim.pump();
        }
        assert_eq!(sim.state().hydraulic_psi, 200.0);
        sim.set_hydraulic(-5.0);
        assert_eq!(sim.state().hydraulic_psi, 0.0);
    }

    #[test]
    fn battery_bands() {
        let mut sim = ResourceSimulator::new();
        assert_eq!(sim.battery_band(), BatteryBand::Ok);
        sim.set_battery(17.0);
        assert_eq!(sim.battery_band(), BatteryBand::Med);
        assert!(sim.can_start_on_battery());
        sim.set_battery(14.0);
        assert_eq!(sim.battery_band(), BatteryBand::Low);
        assert!(!sim.can_start_on_battery());
        assert_eq!(sim.battery_band().to_string(), "LOW");
    }
}
