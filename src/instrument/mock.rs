//! A mock SCPI transport with scripted or synthetic responses.
//!
//! Used by the test suite and for hardware-free runs (resource string
//! `"mock"`). Every command written is recorded for assertion; queries are
//! answered from a queue of canned responses, falling back to a synthetic
//! response function driven by the last `:SOUR:VOLT` value.

use crate::error::{AppResult, SweepError};
use crate::instrument::ScpiTransport;
use std::collections::VecDeque;

type SynthFn = Box<dyn FnMut(f64) -> String + Send>;

pub struct MockTransport {
    written: Vec<String>,
    responses: VecDeque<String>,
    synth: Option<SynthFn>,
    last_voltage: f64,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            written: Vec::new(),
            responses: VecDeque::new(),
            synth: None,
            last_voltage: 0.0,
        }
    }

    /// Queues a canned response for the next query.
    pub fn push_response(&mut self, response: &str) {
        self.responses.push_back(response.to_string());
    }

    /// Queues canned responses in order.
    pub fn with_responses(responses: &[&str]) -> Self {
        let mut mock = Self::new();
        for r in responses {
            mock.push_response(r);
        }
        mock
    }

    /// Answers queries from a function of the last set voltage.
    pub fn with_synth(synth: impl FnMut(f64) -> String + Send + 'static) -> Self {
        Self {
            synth: Some(Box::new(synth)),
            ..Self::new()
        }
    }

    /// A diode-like SMU: echoes the set voltage and reports an
    /// exponentially rising current clamped at 1 A.
    pub fn synthetic_smu() -> Self {
        Self::with_synth(|v| {
            let current = (1e-6 * (v.abs().exp() - 1.0)).min(1.0) * v.signum();
            format!("{v:E},{current:E},9.91E37,0.0,21")
        })
    }

    /// A photodiode monitor with a small dark current plus a light-induced
    /// component that grows with bias.
    pub fn synthetic_photodiode() -> Self {
        Self::with_synth(|v| {
            let current = 2e-6 + 5e-5 * v.abs();
            format!("0.0,{current:E},9.91E37,0.0,21")
        })
    }

    /// Every command written so far, in order.
    pub fn written(&self) -> &[String] {
        &self.written
    }
}

impl ScpiTransport for MockTransport {
    fn write(&mut self, command: &str) -> AppResult<()> {
        if let Some(value) = command.strip_prefix(":SOUR:VOLT ") {
            self.last_voltage = value.trim().parse().map_err(|_| {
                SweepError::Instrument(format!("mock got unparseable voltage: {command}"))
            })?;
        }
        self.written.push(command.to_string());
        Ok(())
    }

    fn query(&mut self, command: &str) -> AppResult<String> {
        self.written.push(command.to_string());
        if let Some(response) = self.responses.pop_front() {
            return Ok(response);
        }
        if let Some(synth) = self.synth.as_mut() {
            return Ok(synth(self.last_voltage));
        }
        Err(SweepError::Instrument(format!(
            "mock has no response scripted for '{command}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::smu::parse_reading;

    #[test]
    fn test_canned_responses_in_order() {
        let mut mock = MockTransport::with_responses(&["1.0,0.001", "2.0,0.002"]);
        assert_eq!(mock.query(":READ?").unwrap(), "1.0,0.001");
        assert_eq!(mock.query(":READ?").unwrap(), "2.0,0.002");
        assert!(mock.query(":READ?").is_err());
    }

    #[test]
    fn test_synthetic_smu_tracks_voltage() {
        let mut mock = MockTransport::synthetic_smu();
        mock.write(":SOUR:VOLT 2.5").unwrap();
        let reading = parse_reading(&mock.query(":READ?").unwrap()).unwrap();
        assert_eq!(reading.voltage, 2.5);
        assert!(reading.current_a > 0.0);
    }

    #[test]
    fn test_records_writes() {
        let mut mock = MockTransport::new();
        mock.write("*RST").unwrap();
        mock.write(":OUTP ON").unwrap();
        assert_eq!(mock.written(), &["*RST", ":OUTP ON"]);
    }
}
