//! Fibre spectrometer interface for the spectra variant.
//!
//! The spectrometer exposes a fixed wavelength axis whose length is
//! determined by the instrument (2048 pixels on the lab's Ocean Optics
//! unit) and returns one intensity vector of the same length per
//! acquisition. Hardware access goes through this trait so the acquisition
//! loop stays backend-agnostic; [`MockSpectrometer`] serves tests and
//! hardware-free runs.

use crate::error::{AppResult, SweepError};
use std::collections::VecDeque;

pub trait Spectrometer: Send {
    /// Sets the per-frame integration time in microseconds.
    fn set_integration_time_micros(&mut self, micros: f64) -> AppResult<()>;

    /// The instrument's fixed wavelength axis, in nanometers.
    fn wavelengths(&self) -> &[f64];

    /// Acquires one intensity frame, same length as the wavelength axis.
    fn acquire(&mut self) -> AppResult<Vec<f64>>;
}

/// Pixel count of the mock's wavelength axis, matching the lab unit.
const MOCK_PIXELS: usize = 2048;

/// A spectrometer standing in for hardware: returns either scripted frames
/// or a synthetic emission peak that grows with the set brightness.
pub struct MockSpectrometer {
    wavelengths: Vec<f64>,
    frames: VecDeque<Vec<f64>>,
    integration_time_us: f64,
    /// Drives the synthetic peak height when no frames are scripted.
    pub brightness: f64,
}

impl Default for MockSpectrometer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSpectrometer {
    pub fn new() -> Self {
        // 350-850 nm, the visible range the lab unit covers.
        let wavelengths = (0..MOCK_PIXELS)
            .map(|i| 350.0 + 500.0 * i as f64 / (MOCK_PIXELS - 1) as f64)
            .collect();
        Self {
            wavelengths,
            frames: VecDeque::new(),
            integration_time_us: 0.0,
            brightness: 0.0,
        }
    }

    /// A small-axis mock for tests that assert on whole frames.
    pub fn with_axis(wavelengths: Vec<f64>) -> Self {
        Self {
            wavelengths,
            frames: VecDeque::new(),
            integration_time_us: 0.0,
            brightness: 0.0,
        }
    }

    /// Queues a canned frame for the next acquisition.
    pub fn push_frame(&mut self, intensities: Vec<f64>) {
        self.frames.push_back(intensities);
    }

    pub fn integration_time_us(&self) -> f64 {
        self.integration_time_us
    }
}

impl Spectrometer for MockSpectrometer {
    fn set_integration_time_micros(&mut self, micros: f64) -> AppResult<()> {
        self.integration_time_us = micros;
        Ok(())
    }

    fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    fn acquire(&mut self) -> AppResult<Vec<f64>> {
        if let Some(frame) = self.frames.pop_front() {
            if frame.len() != self.wavelengths.len() {
                return Err(SweepError::Instrument(format!(
                    "scripted frame has {} pixels, axis has {}",
                    frame.len(),
                    self.wavelengths.len()
                )));
            }
            return Ok(frame);
        }
        // Synthetic electroluminescence peak at 550 nm over a dark floor.
        let peak = self.brightness;
        Ok(self
            .wavelengths
            .iter()
            .map(|&wl| {
                let d = (wl - 550.0) / 20.0;
                180.0 + peak * (-d * d).exp()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_and_frame_lengths_match() {
        let mut spec = MockSpectrometer::new();
        assert_eq!(spec.wavelengths().len(), MOCK_PIXELS);
        let frame = spec.acquire().unwrap();
        assert_eq!(frame.len(), MOCK_PIXELS);
    }

    #[test]
    fn test_scripted_frames_served_in_order() {
        let mut spec = MockSpectrometer::with_axis(vec![400.0, 500.0, 600.0]);
        spec.push_frame(vec![1.0, 2.0, 3.0]);
        spec.push_frame(vec![4.0, 5.0, 6.0]);
        assert_eq!(spec.acquire().unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(spec.acquire().unwrap(), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_rejects_missized_scripted_frame() {
        let mut spec = MockSpectrometer::with_axis(vec![400.0, 500.0]);
        spec.push_frame(vec![1.0]);
        assert!(spec.acquire().is_err());
    }

    #[test]
    fn test_brightness_raises_peak() {
        let mut spec = MockSpectrometer::with_axis(vec![550.0]);
        let dark = spec.acquire().unwrap()[0];
        spec.brightness = 1000.0;
        let lit = spec.acquire().unwrap()[0];
        assert!(lit > dark);
    }
}
