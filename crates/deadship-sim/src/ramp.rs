//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Generator voltage and frequency start-up ramp."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use serde::Serialize;

/// One keyframe of the start-up ramp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RampPoint {
    pub t_s: f64,
    pub voltage_v: f64,
    pub frequency_hz: f64,
}

/// Interpolated generator reading at a given elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RampSample {
    pub voltage_v: f64,
    pub frequency_hz: f64,
}

impl RampPoint {
    const fn new(t_s: f64, voltage_v: f64, frequency_hz: f64) -> Self {
        Self {
            t_s,
            voltage_v,
            frequency_hz,
        }
    }

    pub fn sample(&self) -> RampSample {
        RampSample {
            voltage_v: self.voltage_v,
            frequency_hz: self.frequency_hz,
        }
    }
}

/// Keyframes are strictly increasing in time, voltage and frequency.
pub const RAMP_TABLE: [RampPoint; 7] = [
    RampPoint::new(0.0, 220.0, 56.0),
    RampPoint::new(20.0, 240.0, 56.5),
    RampPoint::new(40.0, 300.0, 57.0),
    RampPoint::new(80.0, 340.0, 58.0),
    RampPoint::new(100.0, 380.0, 58.5),
    RampPoint::new(120.0, 420.0, 59.0),
    RampPoint::new(200.0, 440.0, 60.0),
];

/// Generator voltage and frequency `elapsed_s` seconds into a start attempt.
///
/// Holds the first keyframe at or before its time, clamps to the last keyframe
/// beyond it, and returns keyframe values exactly when `elapsed_s` lands on one.
pub fn interpolate(elapsed_s: f64) -> RampSample {
    let first = RAMP_TABLE[0];
    // Negated comparison also routes NaN to the first keyframe.
    if !(elapsed_s > first.t_s) {
        return first.sample();
    }
    for pair in RAMP_TABLE.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if elapsed_s > b.t_s {
            continue;
        }
        if elapsed_s == b.t_s {
            return b.sample();
        }
        let k = (elapsed_s - a.t_s) / (b.t_s - a.t_s);
        return RampSample {
            voltage_v: a.voltage_v + k * (b.voltage_v - a.voltage_v),
            frequency_hz: a.frequency_hz + k * (b.frequency_hz - a.frequency_hz),
        };
    }
    RAMP_TABLE[RAMP_TABLE.len() - 1].sample()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_monotonic() {
        for pair in RAMP_TABLE.windows(2) {
            assert!(pair[1].t_s > pair[0].t_s);
            assert!(pair[1].voltage_v > pair[0].voltage_v);
            assert!(pair[1].frequency_hz > pair[0].frequency_hz);
        }
    }

    #[test]
    fn start_and_end_are_exact() {
        assert_eq!(interpolate(0.0), RAMP_TABLE[0].sample());
        assert_eq!(interpolate(-3.0), RAMP_TABLE[0].sample());
        assert_eq!(interpolate(f64::NAN), RAMP_TABLE[0].sample());
        assert_eq!(interpolate(200.0), RAMP_TABLE[6].sample());
        assert_eq!(interpolate(1_000.0), RAMP_TABLE[6].sample());
    }

    #[test]
    fn keyframes_are_returned_exactly() {
        for point in RAMP_TABLE {
            assert_eq!(interpolate(point.t_s), point.sample(), "at t={}", point.t_s);
        }
    }

    #[test]
    fn interpolates_between_keyframes() {
        let mid = interpolate(10.0);
        assert!((mid.voltage_v - 230.0).abs() < 1e-9);
        assert!((mid.frequency_hz - 56.25).abs() < 1e-9);

        let at_45 = interpolate(45.0);
        assert!((at_45.voltage_v - 305.0).abs() < 1e-9);
        assert!((at_45.frequency_hz - 57.125).abs() < 1e-9);
    }

    #[test]
    fn output_never_decreases() {
        let mut previous = interpolate(0.0);
        for step in 1..=2_100 {
            let sample = interpolate(step as f64 * 0.1);
            assert!(sample.voltage_v >= previous.voltage_v);
            assert!(sample.frequency_hz >= previous.frequency_hz);
            previous = sample;
        }
    }
}
