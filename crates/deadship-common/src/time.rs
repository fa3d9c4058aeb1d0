//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the trainer runtime."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Virtual time is a [`Duration`] measured from simulation start.
use std::time::Duration;

/// Convert a virtual instant into whole milliseconds, saturating at `u64::MAX`.
pub fn millis(at: Duration) -> u64 {
    u64::try_from(at.as_millis()).unwrap_or(u64::MAX)
}

/// Render a virtual instant as `T+SSS.mmms` for console and log output.
pub fn format_sim_time(at: Duration) -> String {
    format!("T+{:03}.{:03}s", at.as_secs(), at.subsec_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_virtual_instants() {
        assert_eq!(format_sim_time(Duration::from_millis(45_600)), "T+045.600s");
        assert_eq!(format_sim_time(Duration::ZERO), "T+000.000s");
    }

    #[test]
    fn millis_saturates() {
        assert_eq!(millis(Duration::from_secs(2)), 2_000);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
