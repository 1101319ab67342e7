//! Custom error types for the application.
//!
//! This module defines the primary error type, `SweepError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of errors a run can hit,
//! from configuration and I/O issues to instrument-specific problems.
//!
//! ## Error Hierarchy
//!
//! `SweepError` is an enum that consolidates various error sources:
//!
//! - **`Config`**: Wraps errors from the `config` crate, typically related to
//!   file parsing or format issues in the run configuration file.
//! - **`Configuration`**: Semantic errors in the configuration, such as values
//!   that parse fine but are logically invalid (e.g., a sweep with fewer than
//!   two points). These are caught during validation, before any instrument
//!   communication starts.
//! - **`Io`**: Wraps standard `std::io::Error`, covering file output issues.
//! - **`Instrument`**: Communication failures with the SMU or spectrometer.
//!   These are unrecoverable mid-run; the session still attempts a
//!   best-effort teardown of the source instrument.
//! - **`Response`**: A malformed or incomplete instrument reading. The
//!   instrument response is untrusted text; anything that does not parse as
//!   the expected fixed-arity numeric record aborts the run.
//! - **`Assembly`**: Mismatched series lengths when composing the output
//!   table. These indicate a logic defect and fail loudly rather than
//!   silently truncate or pad.
//!
//! No retries are performed anywhere; this is a deliberate simplicity choice
//! for a single-operator, single-run tool.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, SweepError>;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Instrument error: {0}")]
    Instrument(String),

    #[error("Malformed response to '{query}': {reason}")]
    Response { query: String, reason: String },

    #[error("Result assembly error: {0}")]
    Assembly(String),

    #[error("Storage error: {0}")]
    Storage(#[from] csv::Error),

    #[error("VISA support not enabled. Rebuild with --features instrument_visa")]
    VisaFeatureDisabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SweepError::Instrument("SMU read failed".to_string());
        assert_eq!(err.to_string(), "Instrument error: SMU read failed");
    }

    #[test]
    fn test_response_error_names_query() {
        let err = SweepError::Response {
            query: ":READ?".into(),
            reason: "expected at least 2 fields, got 1".into(),
        };
        assert!(err.to_string().contains(":READ?"));
    }
}
