//! The acquisition session: sweep execution and instrument synchronization.
//!
//! One session owns its instrument handles, its dark-baseline state, and
//! its result buffers; nothing is shared across runs. Execution is strictly
//! sequential and blocking per voltage step: command the source, wait the
//! settle interval, query the source, query the secondary instrument. Any
//! malformed response aborts the run with no retry, but the source SMU is
//! still parked (output off, local control) on every exit path as a
//! best-effort teardown.

use crate::config::{BaselineMode, RunConfig};
use crate::error::AppResult;
use crate::instrument::{ParkMode, ScpiTransport, SmuRole, SourceMeter, Spectrometer};
use crate::results::{Reading, SpectraMatrix, SpectrumFrame, SweepResult};
use log::{info, warn};
use std::time::Duration;

/// A secondary reading the dark baseline can be subtracted from.
pub trait BaselineSample: Clone {
    fn corrected(&self, dark: &Self) -> Self;
}

impl BaselineSample for f64 {
    fn corrected(&self, dark: &Self) -> Self {
        self - dark
    }
}

impl BaselineSample for Vec<f64> {
    fn corrected(&self, dark: &Self) -> Self {
        self.iter().zip(dark).map(|(raw, d)| raw - d).collect()
    }
}

/// Captures the secondary reading at the step where the planned voltage is
/// exactly 0 and, when subtraction is enabled, applies it to every reading
/// from that step on. Scoped to one pass; a return pass recaptures its own
/// baseline. If 0 V is never planned, readings pass through raw.
pub struct BaselineTracker<V: BaselineSample> {
    mode: BaselineMode,
    dark: Option<V>,
}

impl<V: BaselineSample> BaselineTracker<V> {
    pub fn new(mode: BaselineMode) -> Self {
        Self { mode, dark: None }
    }

    /// Feeds one raw reading through the tracker, returning the value to
    /// report.
    pub fn observe(&mut self, planned_voltage: f64, raw: V) -> V {
        if planned_voltage == 0.0 && self.dark.is_none() {
            self.dark = Some(raw.clone());
        }
        match (&self.mode, &self.dark) {
            (BaselineMode::Subtract, Some(dark)) => raw.corrected(dark),
            _ => raw,
        }
    }

    pub fn captured(&self) -> bool {
        self.dark.is_some()
    }
}

/// Runs the electroluminescence variant: a voltage sweep on the source SMU
/// with a second SMU reading photocurrent at each step.
pub fn run_el_sweep<S, P>(
    cfg: &RunConfig,
    smu: &mut SourceMeter<S>,
    photodiode: &mut SourceMeter<P>,
) -> AppResult<SweepResult>
where
    S: ScpiTransport,
    P: ScpiTransport,
{
    cfg.validate()?;
    let plan = cfg.plan()?;
    let settle = Duration::from_secs_f64(cfg.settle_time_s);

    // Setup runs inside the guarded block: once the source SMU has been
    // touched, teardown must happen even if the second instrument fails
    // to come up.
    let outcome: AppResult<(Vec<Reading>, Option<Vec<Reading>>)> = (|| {
        smu.initialize(SmuRole::VoltageSource, cfg.compliance_a)?;
        photodiode.initialize(SmuRole::CurrentMonitor, cfg.compliance_a)?;
        let forward = el_pass(plan.forward(), settle, cfg.baseline, smu, photodiode)?;
        let backward = match plan.backward() {
            Some(voltages) => {
                info!("Starting return pass");
                Some(el_pass(&voltages, settle, cfg.baseline, smu, photodiode)?)
            }
            None => None,
        };
        Ok((forward, backward))
    })();

    // Teardown runs whether the sweep finished, died mid-pass, or never
    // got past setup.
    if let Err(e) = smu.shutdown(ParkMode::OutputOff) {
        warn!("Source SMU teardown failed: {e}");
    }
    if let Err(e) = photodiode.shutdown(ParkMode::OutputOff) {
        warn!("Photodiode SMU teardown failed: {e}");
    }

    let (forward, backward) = outcome?;
    SweepResult::assemble(forward, backward, plan.len())
}

fn el_pass<S, P>(
    voltages: &[f64],
    settle: Duration,
    baseline: BaselineMode,
    smu: &mut SourceMeter<S>,
    photodiode: &mut SourceMeter<P>,
) -> AppResult<Vec<Reading>>
where
    S: ScpiTransport,
    P: ScpiTransport,
{
    let mut tracker = BaselineTracker::new(baseline);
    let mut readings = Vec::with_capacity(voltages.len());
    for &v in voltages {
        smu.set_voltage(v)?;
        std::thread::sleep(settle);
        let main = smu.read()?;
        info!("Voltage set to: {v} V --> Current = {} mA", main.current_ma());
        let photocurrent_ma = tracker.observe(v, photodiode.read()?.current_ma());
        info!("--> Photocurrent = {photocurrent_ma} mA");
        readings.push(Reading {
            voltage: main.voltage,
            current_ma: main.current_ma(),
            photocurrent_ma: Some(photocurrent_ma),
        });
    }
    Ok(readings)
}

/// Runs the spectra variant: a voltage sweep on the source SMU with a
/// spectrometer frame captured at each step. Returns the aligned I-V
/// result and the wavelength-by-step intensity matrix (one column per
/// acquired step, return pass included when enabled).
pub fn run_spectra_sweep<S, Sp>(
    cfg: &RunConfig,
    smu: &mut SourceMeter<S>,
    spectrometer: &mut Sp,
) -> AppResult<(SweepResult, SpectraMatrix)>
where
    S: ScpiTransport,
    Sp: Spectrometer + ?Sized,
{
    cfg.validate()?;
    let plan = cfg.plan()?;
    let settle = Duration::from_secs_f64(cfg.settle_time_s);

    type SpectraOutcome = (Vec<Reading>, Option<Vec<Reading>>, Vec<SpectrumFrame>, Vec<f64>);
    let outcome: AppResult<SpectraOutcome> = (|| {
        spectrometer.set_integration_time_micros(cfg.integration_time_us)?;
        smu.initialize(SmuRole::VoltageSource, cfg.compliance_a)?;
        let (forward, mut frames, mut setpoints) =
            spectra_pass(plan.forward(), settle, cfg.baseline, smu, spectrometer)?;
        let backward = match plan.backward() {
            Some(voltages) => {
                info!("Starting return pass");
                let (readings, back_frames, back_setpoints) =
                    spectra_pass(&voltages, settle, cfg.baseline, smu, spectrometer)?;
                frames.extend(back_frames);
                setpoints.extend(back_setpoints);
                Some(readings)
            }
            None => None,
        };
        Ok((forward, backward, frames, setpoints))
    })();

    // The spectra rig's SMU is parked as a current source after the sweep,
    // limited at the compliance level with voltage protection at the sweep
    // maximum.
    let park = ParkMode::CurrentSource {
        compliance_a: cfg.compliance_a,
        max_voltage: plan.max_voltage(),
    };
    if let Err(e) = smu.shutdown(park) {
        warn!("Source SMU teardown failed: {e}");
    }

    let (forward, backward, frames, setpoints) = outcome?;
    let result = SweepResult::assemble(forward, backward, plan.len())?;
    let matrix = SpectraMatrix::assemble(frames, setpoints)?;
    Ok((result, matrix))
}

type SpectraPass = (Vec<Reading>, Vec<SpectrumFrame>, Vec<f64>);

fn spectra_pass<S, Sp>(
    voltages: &[f64],
    settle: Duration,
    baseline: BaselineMode,
    smu: &mut SourceMeter<S>,
    spectrometer: &mut Sp,
) -> AppResult<SpectraPass>
where
    S: ScpiTransport,
    Sp: Spectrometer + ?Sized,
{
    let mut tracker: BaselineTracker<Vec<f64>> = BaselineTracker::new(baseline);
    let mut readings = Vec::with_capacity(voltages.len());
    let mut frames = Vec::with_capacity(voltages.len());
    for &v in voltages {
        smu.set_voltage(v)?;
        std::thread::sleep(settle);
        let main = smu.read()?;
        info!("Voltage set to: {v} V --> Current = {} mA", main.current_ma());
        let intensities = tracker.observe(v, spectrometer.acquire()?);
        frames.push(SpectrumFrame::new(
            spectrometer.wavelengths().to_vec(),
            intensities,
        )?);
        readings.push(Reading {
            voltage: main.voltage,
            current_ma: main.current_ma(),
            photocurrent_ma: None,
        });
    }
    Ok((readings, frames, voltages.to_vec()))
}
