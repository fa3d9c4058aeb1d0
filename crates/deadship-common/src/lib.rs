//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the trainer runtime."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Shared primitives for the dead-ship trainer workspace.
//! This crate exposes configuration loading, tracing initialisation and the
//! virtual-time helpers consumed by the simulator, harness and daemon.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{AppConfig, LoadedAppConfig, LoggingConfig, RuntimeConfig, SimulationConfig};
pub use logging::{init_tracing, LogFormat};
pub use time::{format_sim_time, millis};
