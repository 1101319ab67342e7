//! Result types and assembly of per-step readings into aligned series.
//!
//! The acquisition loop produces one [`Reading`] per voltage step; the
//! assembler composes them into a [`SweepResult`] whose series are all the
//! same length as the planned pass. The return pass is acquired in reverse
//! voltage order and is restored to forward order here, so each output row
//! corresponds to one nominal setpoint. Length mismatches indicate a logic
//! defect and fail loudly.

use crate::error::{AppResult, SweepError};

/// One per-step reading, immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Voltage measured by the source SMU, in volts.
    pub voltage: f64,
    /// Drive current, in milliamps.
    pub current_ma: f64,
    /// Photocurrent (baseline-corrected when enabled), in milliamps.
    /// `None` in the spectra variant, where the secondary axis is a frame.
    pub photocurrent_ma: Option<f64>,
}

/// Aligned forward (and optional backward) series for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    /// Readings in forward sweep order.
    pub forward: Vec<Reading>,
    /// Return-pass readings restored to forward order; empty when no
    /// return pass ran.
    pub backward: Vec<Reading>,
}

impl SweepResult {
    /// Composes the result from the acquisition-order series. `backward`
    /// arrives in acquisition order (reverse of forward) and is flipped
    /// back so row i of both series shares the nominal setpoint.
    pub fn assemble(
        forward: Vec<Reading>,
        backward: Option<Vec<Reading>>,
        planned_points: usize,
    ) -> AppResult<Self> {
        if forward.len() != planned_points {
            return Err(SweepError::Assembly(format!(
                "forward pass has {} readings, expected {planned_points}",
                forward.len()
            )));
        }
        let backward = match backward {
            Some(mut readings) => {
                if readings.len() != planned_points {
                    return Err(SweepError::Assembly(format!(
                        "backward pass has {} readings, expected {planned_points}",
                        readings.len()
                    )));
                }
                readings.reverse();
                readings
            }
            None => Vec::new(),
        };
        Ok(Self { forward, backward })
    }

    pub fn has_backward(&self) -> bool {
        !self.backward.is_empty()
    }

    /// Forward-pass current density in mA/cm² for the given device area.
    pub fn current_density_ma_cm2(&self, device_area_cm2: f64) -> Vec<f64> {
        self.forward
            .iter()
            .map(|r| r.current_ma / device_area_cm2)
            .collect()
    }
}

/// One spectrometer acquisition: intensities over the instrument's fixed
/// wavelength axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    pub wavelengths: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl SpectrumFrame {
    pub fn new(wavelengths: Vec<f64>, intensities: Vec<f64>) -> AppResult<Self> {
        if wavelengths.len() != intensities.len() {
            return Err(SweepError::Assembly(format!(
                "frame has {} intensities over a {}-pixel axis",
                intensities.len(),
                wavelengths.len()
            )));
        }
        Ok(Self {
            wavelengths,
            intensities,
        })
    }
}

/// Spectra assembled as a matrix: the wavelength axis plus one intensity
/// column per voltage step, column-labeled by setpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectraMatrix {
    pub wavelengths: Vec<f64>,
    /// One column per setpoint, each the length of the wavelength axis.
    pub columns: Vec<Vec<f64>>,
    /// Nominal setpoint labeling each column.
    pub setpoints: Vec<f64>,
}

impl SpectraMatrix {
    pub fn assemble(frames: Vec<SpectrumFrame>, setpoints: Vec<f64>) -> AppResult<Self> {
        if frames.len() != setpoints.len() {
            return Err(SweepError::Assembly(format!(
                "{} frames for {} setpoints",
                frames.len(),
                setpoints.len()
            )));
        }
        let mut frames = frames.into_iter();
        let first = frames.next().ok_or_else(|| {
            SweepError::Assembly("cannot assemble a spectra matrix from zero frames".to_string())
        })?;
        let wavelengths = first.wavelengths;
        let mut columns = vec![first.intensities];
        for frame in frames {
            if frame.wavelengths != wavelengths {
                return Err(SweepError::Assembly(
                    "wavelength axis changed between frames".to_string(),
                ));
            }
            columns.push(frame.intensities);
        }
        Ok(Self {
            wavelengths,
            columns,
            setpoints,
        })
    }

    /// Pixels per column.
    pub fn rows(&self) -> usize {
        self.wavelengths.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(v: f64) -> Reading {
        Reading {
            voltage: v,
            current_ma: v * 2.0,
            photocurrent_ma: Some(v * 0.1),
        }
    }

    #[test]
    fn test_assemble_forward_only() {
        let result =
            SweepResult::assemble(vec![reading(0.0), reading(1.0), reading(2.0)], None, 3)
                .unwrap();
        assert!(!result.has_backward());
        assert_eq!(result.forward.len(), 3);
    }

    #[test]
    fn test_backward_restored_to_forward_order() {
        // Acquired in order [2, 1, 0]; rows must align to [0, 1, 2].
        let forward = vec![reading(0.0), reading(1.0), reading(2.0)];
        let backward = vec![reading(2.0), reading(1.0), reading(0.0)];
        let result = SweepResult::assemble(forward, Some(backward), 3).unwrap();
        let voltages: Vec<f64> = result.backward.iter().map(|r| r.voltage).collect();
        assert_eq!(voltages, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_length_mismatch_fails_loudly() {
        let err = SweepResult::assemble(vec![reading(0.0)], None, 3).unwrap_err();
        assert!(err.to_string().contains("expected 3"));
        let err =
            SweepResult::assemble(vec![reading(0.0)], Some(vec![]), 1).unwrap_err();
        assert!(matches!(err, SweepError::Assembly(_)));
    }

    #[test]
    fn test_current_density() {
        let result = SweepResult::assemble(vec![reading(1.0)], None, 1).unwrap();
        let density = result.current_density_ma_cm2(0.04);
        assert!((density[0] - 2.0 / 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_frame_length_check() {
        assert!(SpectrumFrame::new(vec![400.0, 500.0], vec![1.0]).is_err());
    }

    #[test]
    fn test_spectra_matrix_assembly() {
        let axis = vec![400.0, 500.0, 600.0];
        let frames = vec![
            SpectrumFrame::new(axis.clone(), vec![1.0, 2.0, 3.0]).unwrap(),
            SpectrumFrame::new(axis.clone(), vec![4.0, 5.0, 6.0]).unwrap(),
        ];
        let matrix = SpectraMatrix::assemble(frames, vec![0.0, 5.0]).unwrap();
        assert_eq!(matrix.rows(), 3);
        assert_eq!(matrix.columns.len(), 2);
        assert_eq!(matrix.columns[1], vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_spectra_matrix_rejects_column_count_mismatch() {
        let axis = vec![400.0];
        let frames = vec![SpectrumFrame::new(axis, vec![1.0]).unwrap()];
        assert!(SpectraMatrix::assemble(frames, vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_spectra_matrix_rejects_axis_change() {
        let frames = vec![
            SpectrumFrame::new(vec![400.0], vec![1.0]).unwrap(),
            SpectrumFrame::new(vec![401.0], vec![2.0]).unwrap(),
        ];
        assert!(SpectraMatrix::assemble(frames, vec![0.0, 1.0]).is_err());
    }
}
