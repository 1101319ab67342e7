//! Run configuration loading and validation.
//!
//! A run is described by a single `RunConfig`, loaded from an optional TOML
//! file (with `EL_SWEEP_*` environment overrides) and validated before any
//! instrument communication starts. Defaults mirror the lab's usual
//! starting values for a QLED check.
//!
//! ## Configuration Example
//!
//! ```toml
//! sample_name = "QLEDcheng"
//! save_files = true
//! output_dir = "IV+Spectra"
//! settle_time_s = 0.5
//! compliance_a = 1.0
//! start_v = 0.0
//! stop_v = 5.0
//! points = 21
//! reverse = false
//! baseline = "subtract"
//! device_area_cm2 = 0.04
//! integration_time_us = 1000000.0
//! smu_resource = "GPIB0::24::INSTR"
//! photodiode_resource = "GPIB1::24::INSTR"
//!
//! # Optional second ramp: fine steps up to the transition, coarser after.
//! # transition_v = 2.5
//! # transition_points = 23
//! ```
//!
//! - `points` is the point count of the whole sweep, or of the first
//!   segment when `transition_v` is set.
//! - `baseline` selects whether the dark reading captured at V=0 is
//!   subtracted from subsequent secondary readings (`"subtract"`) or only
//!   recorded (`"record-only"`).

use crate::error::{AppResult, SweepError};
use crate::sweep::SweepPlan;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Whether the dark reading captured at V=0 is applied to later readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselineMode {
    /// Report secondary readings as (raw - dark baseline).
    Subtract,
    /// Capture the baseline but report raw readings unmodified.
    RecordOnly,
}

/// Parameters for one acquisition run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Sample identifier, used only for output labeling.
    pub sample_name: String,
    /// Persist result tables to disk, or only log them.
    pub save_files: bool,
    /// Directory the result tables are written into.
    pub output_dir: PathBuf,
    /// Settle delay between setting a voltage and reading, in seconds.
    pub settle_time_s: f64,
    /// Compliance (maximum) current of the source SMU, in amps.
    pub compliance_a: f64,
    /// First voltage of the sweep.
    pub start_v: f64,
    /// Last voltage of the sweep.
    pub stop_v: f64,
    /// Point count of the sweep (first segment when `transition_v` is set).
    pub points: usize,
    /// Transition voltage of a two-segment sweep.
    pub transition_v: Option<f64>,
    /// Point count of the second segment (transition to stop).
    pub transition_points: Option<usize>,
    /// Run a mirrored return pass over the same voltages.
    pub reverse: bool,
    /// Dark-baseline handling for the secondary reading.
    pub baseline: BaselineMode,
    /// Device active area in cm², for current-density conversion.
    pub device_area_cm2: f64,
    /// Spectrometer integration time in microseconds (spectra runs only).
    pub integration_time_us: f64,
    /// VISA resource string of the source SMU, or "mock".
    pub smu_resource: String,
    /// VISA resource string of the photocurrent SMU, or "mock".
    pub photodiode_resource: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sample_name: "sample".to_string(),
            save_files: true,
            output_dir: PathBuf::from("IV+Spectra"),
            settle_time_s: 0.5,
            compliance_a: 1.0,
            start_v: 0.0,
            stop_v: 5.0,
            points: 21,
            transition_v: None,
            transition_points: None,
            reverse: false,
            baseline: BaselineMode::Subtract,
            device_area_cm2: 0.04,
            integration_time_us: 1_000_000.0,
            smu_resource: "GPIB0::24::INSTR".to_string(),
            photodiode_resource: "GPIB1::24::INSTR".to_string(),
        }
    }
}

impl RunConfig {
    /// Loads the configuration from an optional TOML file, with environment
    /// variables prefixed `EL_SWEEP_` taking precedence.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("EL_SWEEP"))
            .build()?;
        let cfg: RunConfig = settings.try_deserialize()?;
        Ok(cfg)
    }

    /// Rejects logically invalid parameters. Runs before any instrument
    /// contact so a bad configuration never drives hardware.
    pub fn validate(&self) -> AppResult<()> {
        if self.settle_time_s <= 0.0 {
            return Err(SweepError::Configuration(format!(
                "settle_time_s must be positive, got {}",
                self.settle_time_s
            )));
        }
        if self.compliance_a <= 0.0 {
            return Err(SweepError::Configuration(format!(
                "compliance_a must be positive, got {}",
                self.compliance_a
            )));
        }
        if self.device_area_cm2 <= 0.0 {
            return Err(SweepError::Configuration(format!(
                "device_area_cm2 must be positive, got {}",
                self.device_area_cm2
            )));
        }
        if self.integration_time_us <= 0.0 {
            return Err(SweepError::Configuration(format!(
                "integration_time_us must be positive, got {}",
                self.integration_time_us
            )));
        }
        if self.transition_v.is_some() != self.transition_points.is_some() {
            return Err(SweepError::Configuration(
                "transition_v and transition_points must be set together".to_string(),
            ));
        }
        // Point-count and transition-range checks live in the planner;
        // building the plan here surfaces them at validation time.
        self.plan()?;
        Ok(())
    }

    /// Builds the sweep plan described by this configuration.
    pub fn plan(&self) -> AppResult<SweepPlan> {
        let plan = match (self.transition_v, self.transition_points) {
            (Some(transition), Some(points2)) => SweepPlan::two_segment(
                self.start_v,
                transition,
                self.points,
                self.stop_v,
                points2,
            )?,
            _ => SweepPlan::single(self.start_v, self.stop_v, self.points)?,
        };
        Ok(plan.mirrored(self.reverse))
    }
}
