//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the trainer runtime."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Bounds on the wall-clock frame period during paced playback.
pub const MIN_PLAYBACK_PERIOD: Duration = Duration::from_millis(1);
pub const MAX_PLAYBACK_PERIOD: Duration = Duration::from_secs(60);

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_session_file() -> bool {
    true
}

fn default_frame_period() -> Duration {
    Duration::from_millis(100)
}

fn default_notice_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_snapshot_period() -> Duration {
    Duration::from_secs(1)
}

/// Primary configuration object for the trainer runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when built-in defaults were used.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "DEADSHIP_CONFIG";

    /// Load configuration from disk together with the effective source path,
    /// respecting the `DEADSHIP_CONFIG` override.
    ///
    /// Fails when neither the environment override nor any candidate exists.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Some(loaded) = Self::try_load(candidates)? {
            return Ok(loaded);
        }
        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Like [`AppConfig::load_with_source`] but falls back to defaults when no file exists.
    pub fn load_or_default<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        match Self::try_load(candidates)? {
            Some(loaded) => Ok(loaded),
            None => {
                debug!("no configuration file found; using built-in defaults");
                Ok(LoadedAppConfig {
                    config: AppConfig::default(),
                    source: None,
                })
            }
        }
    }

    fn try_load<P: AsRef<Path>>(candidates: &[P]) -> Result<Option<LoadedAppConfig>> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(Some(LoadedAppConfig {
                    config,
                    source: Some(path),
                }));
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(Some(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                }));
            }
        }
        Ok(None)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.runtime.validate()?;
        self.playback_period()?;
        Ok(())
    }

    /// Wall-clock time between two frames of paced playback.
    pub fn playback_period(&self) -> Result<Duration> {
        let scaled = self.simulation.frame_period.as_secs_f64() / self.runtime.time_scale;
        Duration::try_from_secs_f64(scaled)
            .ok()
            .filter(|period| (MIN_PLAYBACK_PERIOD..=MAX_PLAYBACK_PERIOD).contains(period))
            .ok_or_else(|| {
                anyhow!(
                    "runtime.time_scale {} gives a playback period of {:.6}s; \
                     frame_period_ms / time_scale must stay between {:?} and {:?}",
                    self.runtime.time_scale,
                    scaled,
                    MIN_PLAYBACK_PERIOD,
                    MAX_PLAYBACK_PERIOD
                )
            })
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Also write a daily JSON log under `directory`.
    #[serde(default = "default_session_file")]
    pub session_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            session_file: default_session_file(),
        }
    }
}

/// Knobs for the simulation core. Plant constants are not configurable.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for the auto-breaker delay; `None` draws from entropy.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Period of the output update tick while the engine is starting or running.
    #[serde(rename = "frame_period_ms", default = "default_frame_period")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub frame_period: Duration,
    /// Delay between scenario completion and its completion notice.
    #[serde(rename = "notice_delay_ms", default = "default_notice_delay")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub notice_delay: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            random_seed: None,
            frame_period: default_frame_period(),
            notice_delay: default_notice_delay(),
        }
    }
}

impl SimulationConfig {
    /// Convenience constructor used by tests and deterministic playback.
    pub fn seeded(seed: u64) -> Self {
        Self {
            random_seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_period.is_zero() {
            return Err(anyhow!("simulation.frame_period_ms must be greater than zero"));
        }
        Ok(())
    }
}

/// Pacing of the daemon when it plays the simulation against the wall clock.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Virtual seconds advanced per wall-clock second.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
    /// How often the console prints a status line in real-time mode.
    #[serde(rename = "snapshot_period_ms", default = "default_snapshot_period")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub snapshot_period: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            snapshot_period: default_snapshot_period(),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.time_scale.is_finite() && self.time_scale > 0.0) {
            return Err(anyhow!(
                "runtime.time_scale must be a positive number, got {}",
                self.time_scale
            ));
        }
        if self.snapshot_period.is_zero() {
            return Err(anyhow!("runtime.snapshot_period_ms must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_yields_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.simulation.frame_period, Duration::from_millis(100));
        assert_eq!(config.simulation.notice_delay, Duration::from_millis(500));
        assert!(config.simulation.random_seed.is_none());
        assert_eq!(config.runtime.time_scale, 1.0);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.session_file);
    }

    #[test]
    fn parses_simulation_section() {
        let config: AppConfig = r#"
            [simulation]
            random_seed = 7
            frame_period_ms = 50

            [runtime]
            time_scale = 10.0
        "#
        .parse()
        .unwrap();
        assert_eq!(config.simulation.random_seed, Some(7));
        assert_eq!(config.simulation.frame_period, Duration::from_millis(50));
        assert_eq!(config.runtime.time_scale, 10.0);
    }

    #[test]
    fn rejects_zero_frame_period() {
        let err = "[simulation]\nframe_period_ms = 0\n"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("frame_period_ms"));
    }

    #[test]
    fn rejects_non_positive_time_scale() {
        assert!("[runtime]\ntime_scale = 0.0\n".parse::<AppConfig>().is_err());
        assert!("[runtime]\ntime_scale = -2.0\n".parse::<AppConfig>().is_err());
    }

    #[test]
    fn rejects_time_scale_outside_playback_bounds() {
        let err = "[runtime]\ntime_scale = 1e-12\n"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("playback period"));
        assert!("[runtime]\ntime_scale = 1000.0\n".parse::<AppConfig>().is_err());
        assert!("[runtime]\ntime_scale = 1e300\n".parse::<AppConfig>().is_err());

        let config: AppConfig = "[runtime]\ntime_scale = 50.0\n".parse().unwrap();
        assert_eq!(config.playback_period().unwrap(), Duration::from_millis(2));
    }

    #[test]
    fn loads_first_existing_candidate() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[simulation]\nrandom_seed = 42")?;
        file.flush()?;
        let missing = PathBuf::from("does/not/exist.toml");
        let candidates = vec![missing, file.path().to_path_buf()];
        let loaded = AppConfig::load_with_source(&candidates)?;
        assert_eq!(loaded.source.as_deref(), Some(file.path()));
        assert_eq!(loaded.config.simulation.random_seed, Some(42));
        Ok(())
    }

    #[test]
    fn missing_candidates_fall_back_to_defaults() -> Result<()> {
        let candidates = vec![PathBuf::from("does/not/exist.toml")];
        assert!(AppConfig::load_with_source(&candidates).is_err());
        let loaded = AppConfig::load_or_default(&candidates)?;
        assert!(loaded.source.is_none());
        Ok(())
    }
}
