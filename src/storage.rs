//! Tab-delimited result tables on disk.
//!
//! Output artifacts mirror the lab's existing files so downstream analysis
//! notebooks keep working: a `# `-prefixed header line naming each column,
//! one row per voltage point in full floating-point precision, tab
//! delimited. File names carry the run date and sample name; spectra files
//! additionally carry the voltage range and integration time, and end with
//! a footer line recording the integration time.

use crate::config::RunConfig;
use crate::error::{AppResult, SweepError};
use crate::results::{SpectraMatrix, SweepResult};
use csv::WriterBuilder;
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Full-precision rendering used for every numeric cell, in the
/// `%.18e` form the lab's existing files carry: a signed, zero-padded
/// two-digit exponent (`2.5e+00`, not Rust's bare `2.5e0`).
fn cell(value: f64) -> String {
    let formatted = format!("{value:.18e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            format!("{mantissa}e{exponent:+03}")
        }
        None => formatted,
    }
}

fn date_string() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// `{date}{sample}_IV+photocurrent.csv`
pub fn el_table_path(cfg: &RunConfig) -> PathBuf {
    cfg.output_dir
        .join(format!("{}{}_IV+photocurrent.csv", date_string(), cfg.sample_name))
}

/// `{date}{sample}_{start}V-{stop}V_{t}s_IV.csv` and `..._spectra.csv`
pub fn spectra_table_paths(cfg: &RunConfig) -> (PathBuf, PathBuf) {
    let stem = format!(
        "{}{}_{}V-{}V_{}s",
        date_string(),
        cfg.sample_name,
        cfg.start_v,
        cfg.stop_v,
        cfg.integration_time_us / 1e6
    );
    (
        cfg.output_dir.join(format!("{stem}_IV.csv")),
        cfg.output_dir.join(format!("{stem}_spectra.csv")),
    )
}

/// Creates the output file, making the parent directory when missing, and
/// writes the `# `-prefixed header line.
fn create_with_header(path: &Path, columns: &[&str]) -> AppResult<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path)?;
    writeln!(file, "# {}", columns.join("\t"))?;
    Ok(file)
}

fn photocurrent(value: Option<f64>, row: usize) -> AppResult<f64> {
    value.ok_or_else(|| {
        SweepError::Assembly(format!("photocurrent column missing at row {row}"))
    })
}

/// Writes the EL variant's table: bias, current, photocurrent, plus the
/// reverse-direction columns when a return pass ran.
pub fn write_el_table(path: &Path, result: &SweepResult) -> AppResult<()> {
    let mut columns = vec!["Bias(V)", "Current(mA)", "Photocurrent(mA)"];
    if result.has_backward() {
        columns.push("ReverseCurrent(mA)");
        columns.push("ReversePhotocurrent(mA)");
    }
    let file = create_with_header(path, &columns)?;
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);

    for (i, fwd) in result.forward.iter().enumerate() {
        let mut record = vec![
            cell(fwd.voltage),
            cell(fwd.current_ma),
            cell(photocurrent(fwd.photocurrent_ma, i)?),
        ];
        if let Some(back) = result.backward.get(i) {
            record.push(cell(back.current_ma));
            record.push(cell(photocurrent(back.photocurrent_ma, i)?));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    info!("Wrote I-V table to '{}'", path.display());
    Ok(())
}

/// Writes the spectra variant's I-V table: bias and current only.
pub fn write_iv_table(path: &Path, result: &SweepResult) -> AppResult<()> {
    let mut columns = vec!["Bias Voltage(V)", "Current(mA)"];
    if result.has_backward() {
        columns.push("ReverseCurrent(mA)");
    }
    let file = create_with_header(path, &columns)?;
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);

    for (i, fwd) in result.forward.iter().enumerate() {
        let mut record = vec![cell(fwd.voltage), cell(fwd.current_ma)];
        if let Some(back) = result.backward.get(i) {
            record.push(cell(back.current_ma));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    info!("Wrote I-V table to '{}'", path.display());
    Ok(())
}

/// Writes the wavelength-by-step intensity matrix: wavelengths as the
/// first column, one intensity column per voltage step labeled `<V>V`, and
/// a footer line recording the integration time.
pub fn write_spectra_matrix(
    path: &Path,
    matrix: &SpectraMatrix,
    integration_time_us: f64,
) -> AppResult<()> {
    let mut columns = vec!["Wavelengths(nm)".to_string()];
    columns.extend(matrix.setpoints.iter().map(|v| format!("{v}V")));
    let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
    let file = create_with_header(path, &column_refs)?;
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);

    for (row, &wavelength) in matrix.wavelengths.iter().enumerate() {
        let mut record = vec![cell(wavelength)];
        record.extend(matrix.columns.iter().map(|col| cell(col[row])));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    let mut file = writer
        .into_inner()
        .map_err(|e| SweepError::Io(std::io::Error::other(e.to_string())))?;
    writeln!(file, "# Integration Time (us) = {integration_time_us}")?;
    info!("Wrote spectra matrix to '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{Reading, SpectrumFrame};

    fn reading(v: f64, i_ma: f64, pd_ma: f64) -> Reading {
        Reading {
            voltage: v,
            current_ma: i_ma,
            photocurrent_ma: Some(pd_ma),
        }
    }

    #[test]
    fn test_cell_matches_savetxt_form() {
        assert_eq!(cell(2.5), "2.500000000000000000e+00");
        assert_eq!(cell(0.0), "0.000000000000000000e+00");
        assert_eq!(cell(1.0e-3), "1.000000000000000000e-03");
        assert_eq!(cell(-4.2e12), "-4.200000000000000000e+12");
    }

    #[test]
    fn test_el_table_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iv.csv");
        let result = SweepResult::assemble(
            vec![reading(0.0, 0.0, 0.0), reading(1.0, 2.0, 0.5)],
            None,
            2,
        )
        .unwrap();
        write_el_table(&path, &result).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "# Bias(V)\tCurrent(mA)\tPhotocurrent(mA)");
        assert_eq!(lines.len(), 3);
        let fields: Vec<&str> = lines[2].split('\t').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].parse::<f64>().unwrap(), 2.0);
    }

    #[test]
    fn test_el_table_reverse_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iv.csv");
        let result = SweepResult::assemble(
            vec![reading(0.0, 0.0, 0.0), reading(1.0, 2.0, 0.5)],
            Some(vec![reading(1.0, 1.8, 0.4), reading(0.0, 0.1, 0.0)]),
            2,
        )
        .unwrap();
        write_el_table(&path, &result).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert!(lines[0].contains("ReversePhotocurrent(mA)"));
        let fields: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(fields.len(), 5);
        // Reverse pass restored to forward order: row 0 is V=0.
        assert_eq!(fields[3].parse::<f64>().unwrap(), 0.1);
    }

    #[test]
    fn test_spectra_matrix_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectra.csv");
        let axis = vec![400.0, 500.0];
        let frames = vec![
            SpectrumFrame::new(axis.clone(), vec![1.0, 2.0]).unwrap(),
            SpectrumFrame::new(axis, vec![3.0, 4.0]).unwrap(),
        ];
        let matrix = SpectraMatrix::assemble(frames, vec![0.0, 5.0]).unwrap();
        write_spectra_matrix(&path, &matrix, 1_000_000.0).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "# Wavelengths(nm)\t0V\t5V");
        assert_eq!(lines.len(), 4);
        assert!(lines[3].starts_with("# Integration Time (us) = 1000000"));
        let fields: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(fields[0].parse::<f64>().unwrap(), 400.0);
        assert_eq!(fields[2].parse::<f64>().unwrap(), 3.0);
    }

    #[test]
    fn test_output_paths_carry_sample_and_range() {
        let cfg = RunConfig {
            sample_name: "QLEDcheng".into(),
            start_v: 0.0,
            stop_v: 10.0,
            integration_time_us: 500_000.0,
            ..RunConfig::default()
        };
        let el = el_table_path(&cfg);
        assert!(el.to_string_lossy().contains("QLEDcheng_IV+photocurrent.csv"));
        let (iv, spectra) = spectra_table_paths(&cfg);
        assert!(iv.to_string_lossy().contains("0V-10V_0.5s_IV.csv"));
        assert!(spectra.to_string_lossy().ends_with("_spectra.csv"));
    }
}
