//! Command-line entry point for the el_sweep acquisition tool.

use anyhow::Context;
use clap::{Parser, Subcommand};
use el_sweep::acquisition::{run_el_sweep, run_spectra_sweep};
use el_sweep::config::RunConfig;
use el_sweep::error::AppResult;
use el_sweep::instrument::mock::MockTransport;
use el_sweep::instrument::{ScpiTransport, SmuRole, SourceMeter};
use el_sweep::instrument::spectrometer::MockSpectrometer;
use el_sweep::storage;
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "el_sweep",
    about = "Keithley I-V sweep with electroluminescence or spectra acquisition"
)]
struct Cli {
    /// Path to a TOML run configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sample name used in output file names.
    #[arg(long)]
    sample: Option<String>,

    /// VISA resource of the source SMU, or "mock".
    #[arg(long)]
    smu: Option<String>,

    /// VISA resource of the photocurrent SMU, or "mock".
    #[arg(long)]
    photodiode: Option<String>,

    /// Directory for the output tables.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Run a mirrored return pass.
    #[arg(long)]
    reverse: bool,

    /// Display results without writing files.
    #[arg(long)]
    no_save: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Voltage sweep with photocurrent measurement on a second SMU.
    El,
    /// Voltage sweep with a spectrometer frame per step.
    Spectra,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut cfg =
        RunConfig::load(cli.config.as_deref()).context("Failed to load run configuration")?;
    if let Some(sample) = cli.sample {
        cfg.sample_name = sample;
    }
    if let Some(smu) = cli.smu {
        cfg.smu_resource = smu;
    }
    if let Some(photodiode) = cli.photodiode {
        cfg.photodiode_resource = photodiode;
    }
    if let Some(output_dir) = cli.output_dir {
        cfg.output_dir = output_dir;
    }
    if cli.reverse {
        cfg.reverse = true;
    }
    if cli.no_save {
        cfg.save_files = false;
    }
    cfg.validate().context("Invalid run configuration")?;

    match cli.command {
        Command::El => run_el(&cfg)?,
        Command::Spectra => run_spectra(&cfg)?,
    }
    Ok(())
}

fn run_el(cfg: &RunConfig) -> anyhow::Result<()> {
    let mut smu = SourceMeter::new("smu", open_transport(&cfg.smu_resource, SmuRole::VoltageSource)?);
    let mut photodiode = SourceMeter::new(
        "photodiode",
        open_transport(&cfg.photodiode_resource, SmuRole::CurrentMonitor)?,
    );

    let result = run_el_sweep(cfg, &mut smu, &mut photodiode)?;

    let densities = result.current_density_ma_cm2(cfg.device_area_cm2);
    let peak = densities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    info!(
        "Sweep of '{}' complete: {} points, peak current density {peak:.3} mA/cm^2",
        cfg.sample_name,
        result.forward.len()
    );

    if cfg.save_files {
        storage::write_el_table(&storage::el_table_path(cfg), &result)?;
    } else {
        info!("save_files disabled; results not persisted");
    }
    Ok(())
}

fn run_spectra(cfg: &RunConfig) -> anyhow::Result<()> {
    let mut smu = SourceMeter::new("smu", open_transport(&cfg.smu_resource, SmuRole::VoltageSource)?);
    // No hardware spectrometer backend is wired up yet; acquisition is
    // generic over the Spectrometer trait and currently runs the mock.
    let mut spectrometer = MockSpectrometer::new();

    let (result, matrix) = run_spectra_sweep(cfg, &mut smu, &mut spectrometer)?;
    info!(
        "Spectra sweep of '{}' complete: {} points, {} pixels per frame",
        cfg.sample_name,
        result.forward.len(),
        matrix.rows()
    );

    if cfg.save_files {
        let (iv_path, spectra_path) = storage::spectra_table_paths(cfg);
        storage::write_iv_table(&iv_path, &result)?;
        storage::write_spectra_matrix(&spectra_path, &matrix, cfg.integration_time_us)?;
    } else {
        info!("save_files disabled; results not persisted");
    }
    Ok(())
}

/// Resolves a resource string to a transport: `"mock"` yields the built-in
/// synthetic instrument, anything else opens a VISA session.
fn open_transport(resource: &str, role: SmuRole) -> AppResult<Box<dyn ScpiTransport>> {
    if resource == "mock" {
        info!("Using mock transport for {role:?}");
        let mock = match role {
            SmuRole::VoltageSource => MockTransport::synthetic_smu(),
            SmuRole::CurrentMonitor => MockTransport::synthetic_photodiode(),
        };
        return Ok(Box::new(mock));
    }
    #[cfg(feature = "instrument_visa")]
    {
        use el_sweep::instrument::visa::VisaTransport;
        use std::time::Duration;
        Ok(Box::new(VisaTransport::open(
            resource,
            Duration::from_secs(1),
        )?))
    }
    #[cfg(not(feature = "instrument_visa"))]
    {
        Err(el_sweep::error::SweepError::VisaFeatureDisabled)
    }
}
