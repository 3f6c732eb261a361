// Timeouts, framing constants, rotator configuration
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

// Serial framing
pub const DRIVER_LEN: usize = 20; // response buffer capacity in bytes
pub const DRIVER_STOP_CHAR: u8 = 0x23; // '#'
pub const DRIVER_TIMEOUT: Duration = Duration::from_secs(3);

// Motion: degrees advanced per timer tick
pub const ROTATION_RATE: f64 = 10.0;

// Host timer period between ticks
pub const POLL_PERIOD: Duration = Duration::from_millis(1000);

// Serial port for the rotator controller
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUDRATE: u32 = 9600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Runtime configuration, loadable from a JSON file.
///
/// Missing fields fall back to the constants above.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RotatorConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub poll_period_ms: u64,
    pub step_size: f64,
    // Use the in-process simulated device instead of a serial port
    pub simulate: bool,
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUDRATE,
            timeout_ms: DRIVER_TIMEOUT.as_millis() as u64,
            poll_period_ms: POLL_PERIOD.as_millis() as u64,
            step_size: ROTATION_RATE,
            simulate: false,
        }
    }
}

impl RotatorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "<inline>")
    }

    fn parse(text: &str, path: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the motion loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(ConfigError::Invalid {
                field: "step_size",
                reason: format!("must be a positive number of degrees, got {}", self.step_size),
            });
        }
        if self.poll_period_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_period_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_constants() {
        let cfg = RotatorConfig::default();
        assert_eq!(cfg.timeout(), Duration::from_secs(3));
        assert_eq!(cfg.step_size, 10.0);
        assert_eq!(cfg.baud_rate, 9600);
        assert!(!cfg.simulate);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = RotatorConfig::from_json(r#"{"port": "/dev/ttyACM1", "simulate": true}"#).unwrap();
        assert_eq!(cfg.port, "/dev/ttyACM1");
        assert!(cfg.simulate);
        assert_eq!(cfg.poll_period(), POLL_PERIOD);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = RotatorConfig::from_file("/nonexistent/rotator.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rotator.json"));
    }

    #[test]
    fn test_rejects_step_size_that_cannot_converge() {
        for bad in ["0", "-10", "0.0"] {
            let json = format!(r#"{{"step_size": {}}}"#, bad);
            let err = RotatorConfig::from_json(&json).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { field: "step_size", .. }),
                "step_size {} accepted",
                bad
            );
        }

        let cfg = RotatorConfig {
            step_size: f64::NAN,
            ..RotatorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_poll_period() {
        let err = RotatorConfig::from_json(r#"{"poll_period_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "poll_period_ms", .. }));
    }

    #[test]
    fn test_accepts_custom_step_size() {
        let cfg = RotatorConfig::from_json(r#"{"step_size": 2.5}"#).unwrap();
        assert_eq!(cfg.step_size, 2.5);
    }
}
