//! Core library for the el_sweep application.
//!
//! This library contains the sweep planner, acquisition session, and
//! instrument drivers used to run I-V sweeps on an optoelectronic device
//! with a Keithley-class source-measure unit, optionally paired with a
//! second SMU (photocurrent) or a spectrometer (emission spectra).

pub mod acquisition;
pub mod config;
pub mod error;
pub mod instrument;
pub mod results;
pub mod storage;
pub mod sweep;
