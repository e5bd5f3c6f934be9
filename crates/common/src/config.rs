//! Conversion settings
//!
//! [`ConversionConfig`] is the YAML file form, [`ConvertOptions`] the
//! in-memory form handed to the parser.
//!
//! Example `aep-openapi.yaml`:
//!
//! ```yaml
//! path_prefix: /v1
//! server_url: https://bookstore.example.com/v1
//! deadline_secs: 30
//! fetch_timeout_secs: 10
//! ```

use crate::{ApiError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Conversion settings loaded from a YAML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Prefix stripped from every path before classification, e.g. `/v1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,

    /// Overrides the document's first server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Budget for the whole conversion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,

    /// Upper bound for a single remote schema fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_secs: Option<u64>,
}

impl ConversionConfig {
    /// Load settings from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ApiError::Parse(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        serde_yaml::from_str(&content).map_err(|e| {
            ApiError::Parse(format!("Failed to parse config YAML from {:?}: {}", path, e))
        })
    }

    /// Resolve into runtime options. The deadline starts counting now.
    pub fn to_options(&self) -> ConvertOptions {
        ConvertOptions {
            path_prefix: self.path_prefix.clone().unwrap_or_default(),
            server_url: self.server_url.clone().unwrap_or_default(),
            deadline: self
                .deadline_secs
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
            fetch_timeout: self.fetch_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Runtime options for a single conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub path_prefix: String,

    /// Empty means "use the document's first server"
    pub server_url: String,

    pub deadline: Option<Instant>,

    pub fetch_timeout: Option<Duration>,
}

impl ConvertOptions {
    /// Fails once the deadline has passed; `what` names the step for the error
    pub fn check_deadline(&self, what: &str) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(ApiError::DeadlineExceeded(what.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Timeout for the next blocking call: the smaller of the per-fetch
    /// timeout and what is left of the deadline
    pub fn remaining(&self) -> Option<Duration> {
        let left = self
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));
        match (left, self.fetch_timeout) {
            (Some(left), Some(timeout)) => Some(left.min(timeout)),
            (left, timeout) => left.or(timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "path_prefix: /v1\nserver_url: https://bookstore.example.com/v1\ndeadline_secs: 30"
        )
        .unwrap();

        let config = ConversionConfig::load(file.path()).unwrap();
        assert_eq!(config.path_prefix.as_deref(), Some("/v1"));
        assert_eq!(config.deadline_secs, Some(30));
        assert_eq!(config.fetch_timeout_secs, None);

        let options = config.to_options();
        assert_eq!(options.path_prefix, "/v1");
        assert_eq!(options.server_url, "https://bookstore.example.com/v1");
        assert!(options.deadline.is_some());
        assert!(options.check_deadline("paths").is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConversionConfig::load(Path::new("/nonexistent/aep-openapi.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_expired_deadline() {
        let options = ConvertOptions {
            deadline: Some(Instant::now()),
            ..ConvertOptions::default()
        };
        let err = options.check_deadline("/widgets").unwrap_err();
        assert!(matches!(err, ApiError::DeadlineExceeded(ref what) if what == "/widgets"));
        assert_eq!(options.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_remaining_takes_smaller_bound() {
        let options = ConvertOptions {
            deadline: Some(Instant::now() + Duration::from_secs(3600)),
            fetch_timeout: Some(Duration::from_secs(5)),
            ..ConvertOptions::default()
        };
        assert_eq!(options.remaining(), Some(Duration::from_secs(5)));
        assert_eq!(ConvertOptions::default().remaining(), None);
    }
}
