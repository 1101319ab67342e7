//! Instrument drivers and the transport layer beneath them.
//!
//! All SCPI instruments speak through the [`ScpiTransport`] trait: a
//! synchronous write/query pair over an ASCII, line-terminated protocol.
//! The run is strictly sequential per specification, so the transport is
//! blocking; each query holds the calling thread until the instrument
//! responds or the driver-level timeout fires.
//!
//! Implementations:
//! - [`visa::VisaTransport`] for GPIB/USB/Ethernet hardware via `visa-rs`
//!   (behind the `instrument_visa` feature)
//! - [`mock::MockTransport`] for tests and hardware-free runs

pub mod mock;
pub mod smu;
pub mod spectrometer;
#[cfg(feature = "instrument_visa")]
pub mod visa;

use crate::error::AppResult;

pub use smu::{ParkMode, SmuRole, SourceMeter};
pub use spectrometer::Spectrometer;

/// Synchronous ASCII command transport to one instrument.
pub trait ScpiTransport: Send {
    /// Sends a command, appending the line terminator.
    fn write(&mut self, command: &str) -> AppResult<()>;

    /// Sends a query and reads one response line, trimmed.
    fn query(&mut self, command: &str) -> AppResult<String>;
}

impl ScpiTransport for Box<dyn ScpiTransport> {
    fn write(&mut self, command: &str) -> AppResult<()> {
        (**self).write(command)
    }

    fn query(&mut self, command: &str) -> AppResult<String> {
        (**self).query(command)
    }
}
