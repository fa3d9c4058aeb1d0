//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Plant design constants for the MP120 emergency generator."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Fixed plant constants. These are design values of the trainer, not
//! configuration.
use std::time::Duration;

use serde::Serialize;

pub const BATTERY_INITIAL_V: f64 = 24.0;
pub const BATTERY_ATTEMPT_COST_V: f64 = 2.0;
/// Minimum voltage for a battery-path start attempt.
pub const BATTERY_START_THRESHOLD_V: f64 = 16.0;
/// Post-attempt voltage below which a failed attempt also raises fail-to-start.
pub const BATTERY_FAIL_THRESHOLD_V: f64 = 15.8;
/// Upper bound of the "medium" battery band.
pub const BATTERY_MED_THRESHOLD_V: f64 = 18.0;

pub const FUEL_TANK_CAPACITY_M3: f64 = 1.5;
pub const FUEL_INITIAL_FRACTION: f64 = 0.8;
pub const FUEL_CRITICAL_M3: f64 = 0.05;
pub const FUEL_DRAIN_STEP_M3: f64 = 0.01;
pub const FUEL_DRAIN_PERIOD: Duration = Duration::from_secs(25);
pub const FUEL_FILL_STEP_M3: f64 = 0.005;
pub const FUEL_FILL_PERIOD: Duration = Duration::from_secs(1);
/// Fuel volume is kept at micro-m³ resolution so repeated steps do not drift.
pub const FUEL_DECIMALS: i32 = 6;

pub const HYDRAULIC_PUMP_STEP_PSI: f64 = 20.0;
pub const HYDRAULIC_MAX_PSI: f64 = 200.0;
pub const HYDRAULIC_START_THRESHOLD_PSI: f64 = 100.0;

pub const ATTEMPT_TRIP_DELAY: Duration = Duration::from_secs(2);
pub const STABILIZATION_DELAY: Duration = Duration::from_secs(45);
pub const STABILIZED_AFTER_S: f64 = 45.0;
/// Auto-close window for the breaker after a hydraulic start, `[min, max)`.
pub const AUTO_BREAKER_MIN: Duration = Duration::from_secs(20);
pub const AUTO_BREAKER_MAX: Duration = Duration::from_secs(28);
pub const HY31_PULSE: Duration = Duration::from_millis(400);

pub const RUNNING_LUBE_OIL_BAR: f64 = 2.5;
pub const RUNNING_FUEL_OIL_BAR: f64 = 1.8;
pub const RUNNING_COOLING_WATER_BAR: f64 = 3.2;

pub const NO_LOAD_KW: f64 = 0.5;
pub const NO_LOAD_AMPS: f64 = 1.0;
pub const RPM_PER_HZ: f64 = 10.0;

/// Generator readings once the breaker carries load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnLoadParams {
    pub voltage_v: f64,
    pub frequency_hz: f64,
    pub power_kw: f64,
    pub current_a: f64,
    pub rpm: f64,
}

pub const ON_LOAD: OnLoadParams = OnLoadParams {
    voltage_v: 440.0,
    frequency_hz: 60.0,
    power_kw: 6.1,
    current_a: 10.0,
    rpm: 600.0,
};

pub const FUEL_DEPLETION_REASON: &str = "fuel level below 0.05 m³, engine stopped";

/// Static particulars of the dead-ship condition shown alongside the live readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlantParticulars {
    pub jacket_water_temp_c: f64,
    pub exhaust_gas_temp_c: f64,
    pub lube_sump_fraction: f64,
    pub lube_sump_capacity_m3: f64,
    pub fuel_tank_capacity_m3: f64,
    pub hydraulic_reservoir_full: bool,
}

pub const PLANT_PARTICULARS: PlantParticulars = PlantParticulars {
    jacket_water_temp_c: 36.1,
    exhaust_gas_temp_c: 37.0,
    lube_sump_fraction: 0.6,
    lube_sump_capacity_m3: 0.2,
    fuel_tank_capacity_m3: FUEL_TANK_CAPACITY_M3,
    hydraulic_reservoir_full: true,
};

/// Round `value` to `decimals` places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
