//! Keithley-class source-measure unit driver.
//!
//! Drives one SMU over any [`ScpiTransport`]. The same driver covers both
//! instrument roles in a run:
//!
//! - **Voltage source**: programmed as a voltage source with a compliance
//!   current, sweeps the device bias and reports (voltage, current).
//! - **Current monitor**: measure-only, reads the photodiode current; no
//!   source mode is programmed.
//!
//! The `:READ?` response is a comma-delimited numeric record in a fixed,
//! instrument-defined field order: measured voltage first, measured current
//! second, further fields ignored. The response is untrusted text and is
//! parsed strictly; any malformed field aborts the run.

use crate::error::{AppResult, SweepError};
use crate::instrument::ScpiTransport;
use log::{debug, info};
use std::time::Duration;

/// Pause after `*RST` before programming the instrument.
const RESET_SETTLE: Duration = Duration::from_millis(500);

/// How the SMU participates in the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmuRole {
    /// Sources the bias voltage and reads the drive current.
    VoltageSource,
    /// Reads an external current (photodiode) without sourcing.
    CurrentMonitor,
}

/// Post-sweep parking policy, explicit per instrument role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParkMode {
    /// Output off, back to local control.
    OutputOff,
    /// Output off, then reprogram as a current source limited at the
    /// compliance level with voltage protection at the sweep maximum,
    /// back to local control.
    CurrentSource {
        compliance_a: f64,
        max_voltage: f64,
    },
}

/// One parsed `:READ?` record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmuReading {
    /// Measured voltage in volts.
    pub voltage: f64,
    /// Measured current in amps.
    pub current_a: f64,
}

impl SmuReading {
    /// Measured current scaled to milliamps.
    pub fn current_ma(&self) -> f64 {
        self.current_a * 1e3
    }
}

/// Driver for one SMU over a synchronous SCPI transport.
pub struct SourceMeter<T: ScpiTransport> {
    transport: T,
    id: String,
}

impl<T: ScpiTransport> SourceMeter<T> {
    pub fn new(id: &str, transport: T) -> Self {
        Self {
            transport,
            id: id.to_string(),
        }
    }

    /// Resets the instrument and programs it for its role in the sweep,
    /// leaving the output enabled.
    pub fn initialize(&mut self, role: SmuRole, compliance_a: f64) -> AppResult<()> {
        info!("Initializing SMU '{}' as {:?}", self.id, role);
        self.transport.write("*RST")?;
        std::thread::sleep(RESET_SETTLE);
        if role == SmuRole::VoltageSource {
            self.transport.write(":SOUR:FUNC:MODE VOLT")?;
        }
        self.transport
            .write(&format!(":SENS:CURR:PROT:LEV {compliance_a}"))?;
        self.transport.write(":SENS:CURR:RANGE:AUTO 1")?;
        self.transport.write(":OUTP ON")?;
        Ok(())
    }

    /// Commands the source output to the given voltage.
    pub fn set_voltage(&mut self, volts: f64) -> AppResult<()> {
        debug!("SMU '{}' set to {volts} V", self.id);
        self.transport.write(&format!(":SOUR:VOLT {volts}"))
    }

    /// Takes one synchronous reading.
    pub fn read(&mut self) -> AppResult<SmuReading> {
        let response = self.transport.query(":READ?")?;
        parse_reading(&response)
    }

    /// Turns the output off and returns the instrument to local control.
    /// Called on every exit path, including failures mid-sweep.
    pub fn shutdown(&mut self, park: ParkMode) -> AppResult<()> {
        info!("Shutting down SMU '{}'", self.id);
        self.transport.write(":OUTP OFF")?;
        if let ParkMode::CurrentSource {
            compliance_a,
            max_voltage,
        } = park
        {
            self.transport.write(":SOUR:FUNC:MODE curr")?;
            self.transport
                .write(&format!(":SOUR:CURR {compliance_a}"))?;
            self.transport
                .write(&format!(":SENS:volt:PROT:LEV {max_voltage}"))?;
            self.transport.write(":SENS:volt:RANGE:AUTO 1")?;
        }
        self.transport.write("SYSTEM:KEY 23")
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Borrows the underlying transport, used by tests to inspect the
    /// command log.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Strict fixed-arity parse of a `:READ?` response: at least two
/// comma-separated numeric fields, voltage then current, extras ignored.
pub fn parse_reading(response: &str) -> AppResult<SmuReading> {
    let fields: Vec<&str> = response.trim().split(',').collect();
    if fields.len() < 2 {
        return Err(SweepError::Response {
            query: ":READ?".to_string(),
            reason: format!("expected at least 2 fields, got {}", fields.len()),
        });
    }
    let voltage = parse_field(fields[0], "voltage")?;
    let current_a = parse_field(fields[1], "current")?;
    Ok(SmuReading { voltage, current_a })
}

fn parse_field(field: &str, name: &str) -> AppResult<f64> {
    field.trim().parse::<f64>().map_err(|_| SweepError::Response {
        query: ":READ?".to_string(),
        reason: format!("{name} field '{}' is not a number", field.trim()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::mock::MockTransport;

    #[test]
    fn test_parse_reading_two_fields() {
        let r = parse_reading("2.5E+00,1.0E-03").unwrap();
        assert_eq!(r.voltage, 2.5);
        assert_eq!(r.current_a, 1.0e-3);
        assert_eq!(r.current_ma(), 1.0);
    }

    #[test]
    fn test_parse_reading_ignores_extra_fields() {
        let r = parse_reading("1.0,2.0e-3,9.91e37,0.0,21\n").unwrap();
        assert_eq!(r.voltage, 1.0);
        assert_eq!(r.current_a, 2.0e-3);
    }

    #[test]
    fn test_parse_reading_rejects_short_record() {
        assert!(parse_reading("1.0").is_err());
        assert!(parse_reading("").is_err());
    }

    #[test]
    fn test_parse_reading_rejects_non_numeric() {
        let err = parse_reading("1.0,OVERFLOW").unwrap_err();
        assert!(err.to_string().contains("current"));
        // A field that looks like an expression must not be evaluated.
        assert!(parse_reading("1.0,1.0e-3*2").is_err());
    }

    #[test]
    fn test_voltage_source_setup_commands() {
        let mut smu = SourceMeter::new("smu", MockTransport::new());
        smu.initialize(SmuRole::VoltageSource, 1.0).unwrap();
        let written = smu.transport.written();
        assert_eq!(
            written,
            &[
                "*RST",
                ":SOUR:FUNC:MODE VOLT",
                ":SENS:CURR:PROT:LEV 1",
                ":SENS:CURR:RANGE:AUTO 1",
                ":OUTP ON",
            ]
        );
    }

    #[test]
    fn test_current_monitor_skips_source_mode() {
        let mut smu = SourceMeter::new("pd", MockTransport::new());
        smu.initialize(SmuRole::CurrentMonitor, 0.5).unwrap();
        let written = smu.transport.written();
        assert!(!written.iter().any(|c| c.contains("SOUR:FUNC")));
        assert!(written.contains(&":SENS:CURR:PROT:LEV 0.5".to_string()));
    }

    #[test]
    fn test_shutdown_output_off() {
        let mut smu = SourceMeter::new("smu", MockTransport::new());
        smu.shutdown(ParkMode::OutputOff).unwrap();
        assert_eq!(smu.transport.written(), &[":OUTP OFF", "SYSTEM:KEY 23"]);
    }

    #[test]
    fn test_shutdown_current_source_park() {
        let mut smu = SourceMeter::new("smu", MockTransport::new());
        smu.shutdown(ParkMode::CurrentSource {
            compliance_a: 1.0,
            max_voltage: 10.0,
        })
        .unwrap();
        let written = smu.transport.written();
        assert_eq!(written[0], ":OUTP OFF");
        assert!(written.contains(&":SOUR:FUNC:MODE curr".to_string()));
        assert!(written.contains(&":SENS:volt:PROT:LEV 10".to_string()));
        assert_eq!(written.last().map(String::as_str), Some("SYSTEM:KEY 23"));
    }
}
