//! VISA transport for GPIB/USB/Ethernet instruments.
//!
//! Wraps the `visa-rs` crate behind [`ScpiTransport`]. Supports resource
//! strings like:
//! - `"GPIB0::24::INSTR"` (GPIB interface)
//! - `"USB0::0x1234::0x5678::SERIAL::INSTR"` (USB)
//! - `"TCPIP0::192.168.1.100::INSTR"` (Ethernet/LXI)
//!
//! All I/O is synchronous and blocking; read timeouts are left to the VISA
//! driver's defaults for the opened session.

use crate::error::{AppResult, SweepError};
use crate::instrument::ScpiTransport;
use log::debug;
use std::ffi::CString;
use std::io::{BufRead, BufReader, Write};
use std::time::Duration;
use visa_rs::prelude::*;

pub struct VisaTransport {
    instr: Instrument,
    resource_string: String,
    // Sessions close when the resource manager drops; keep it alive for
    // the lifetime of the transport.
    _rm: DefaultRM,
}

impl VisaTransport {
    /// Opens a session to the given VISA resource.
    pub fn open(resource_string: &str, timeout: Duration) -> AppResult<Self> {
        let rm = DefaultRM::new().map_err(visa_err)?;
        let c_string = CString::new(resource_string).map_err(|_| {
            SweepError::Instrument(format!(
                "resource string '{resource_string}' contains a NUL byte"
            ))
        })?;
        let instr = rm
            .open(&c_string.into(), AccessMode::NO_LOCK, timeout)
            .map_err(visa_err)?;
        debug!("VISA resource '{resource_string}' opened");
        Ok(Self {
            instr,
            resource_string: resource_string.to_string(),
            _rm: rm,
        })
    }

    pub fn resource_string(&self) -> &str {
        &self.resource_string
    }
}

impl ScpiTransport for VisaTransport {
    fn write(&mut self, command: &str) -> AppResult<()> {
        debug!("VISA write '{}' -> {command}", self.resource_string);
        self.instr
            .write_all(format!("{command}\n").as_bytes())
            .map_err(io_err)
    }

    fn query(&mut self, command: &str) -> AppResult<String> {
        self.instr
            .write_all(format!("{command}\n").as_bytes())
            .map_err(io_err)?;
        let mut response = String::new();
        {
            let mut reader = BufReader::new(&self.instr);
            reader.read_line(&mut response).map_err(io_err)?;
        }
        let response = response.trim().to_string();
        debug!(
            "VISA query '{}' '{command}' -> '{response}'",
            self.resource_string
        );
        Ok(response)
    }
}

fn visa_err(err: visa_rs::Error) -> SweepError {
    SweepError::Instrument(err.to_string())
}

fn io_err(err: std::io::Error) -> SweepError {
    SweepError::Instrument(err.to_string())
}
