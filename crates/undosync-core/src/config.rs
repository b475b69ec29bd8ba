#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! [`SyncConfig`] gathers every knob of the engine in one struct. With the
//! `config` feature it can be loaded from TOML or JSON at startup:
//!
//! ```toml
//! # undosync.toml
//! shadow_attachment = "permanent"
//! filler_text = "x"
//! compensate_non_cancelable = true
//!
//! [capabilities]
//! cancelable_history_events = true
//! history_event_target = "real"
//! ```
//!
//! ```rust,ignore
//! let config = SyncConfig::from_toml_file("undosync.toml")?;
//! ```
//!
//! `SyncConfig::default()` reproduces the behavior of the hardcoded
//! constants (`"x"` filler, permanently attached shadow surface, Chromium
//! capabilities).

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::host::HostCapabilities;
use crate::shadow::DEFAULT_FILLER;

/// When the shadow surface lives in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum ShadowAttachment {
    /// Attached once for the whole session; no focus flicker.
    #[default]
    Permanent,
    /// Inserted before every shadow operation and removed afterwards.
    PerOperation,
}

/// Top-level configuration for a [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SyncConfig {
    /// Host engine-family capabilities.
    pub capabilities: HostCapabilities,
    /// Shadow surface lifecycle.
    pub shadow_attachment: ShadowAttachment,
    /// Text inserted into the shadow surface to register a native entry.
    pub filler_text: String,
    /// Reverse the host's own mutation when a notification arrives too late
    /// to be canceled.
    pub compensate_non_cancelable: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            capabilities: HostCapabilities::default(),
            shadow_attachment: ShadowAttachment::default(),
            filler_text: DEFAULT_FILLER.to_owned(),
            compensate_non_cancelable: true,
        }
    }
}

impl SyncConfig {
    /// Default configuration for the given host capabilities.
    #[must_use]
    pub fn for_host(capabilities: HostCapabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_shadow_attachment(mut self, attachment: ShadowAttachment) -> Self {
        self.shadow_attachment = attachment;
        self
    }

    #[must_use]
    pub fn with_filler_text(mut self, filler: impl Into<String>) -> Self {
        self.filler_text = filler.into();
        self
    }

    #[must_use]
    pub fn with_compensation(mut self, enabled: bool) -> Self {
        self.compensate_non_cancelable = enabled;
        self
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        // insertText with an empty string registers no undo entry.
        if self.filler_text.is_empty() {
            errors.push("filler_text must not be empty".into());
        }
        if self.filler_text.contains(['\n', '\r']) {
            errors.push("filler_text must be a single line".into());
        }
        errors
    }

    /// Return the config if [`validate`](Self::validate) finds nothing.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors from loading a [`SyncConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => write!(f, "validation errors: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::Surface;

    #[test]
    fn default_matches_hardcoded_behavior() {
        let config = SyncConfig::default();
        assert_eq!(config.filler_text, "x");
        assert_eq!(config.shadow_attachment, ShadowAttachment::Permanent);
        assert!(config.compensate_non_cancelable);
        assert_eq!(config.capabilities, HostCapabilities::chromium());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn empty_filler_is_rejected() {
        let config = SyncConfig::default().with_filler_text("");
        assert_eq!(config.validate(), vec!["filler_text must not be empty"]);
    }

    #[test]
    fn multiline_filler_is_rejected() {
        let config = SyncConfig::default().with_filler_text("a\nb");
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn builders_compose() {
        let config = SyncConfig::for_host(HostCapabilities::webkit())
            .with_shadow_attachment(ShadowAttachment::PerOperation)
            .with_compensation(false);
        assert_eq!(config.capabilities.history_event_target, Surface::Shadow);
        assert_eq!(config.shadow_attachment, ShadowAttachment::PerOperation);
        assert!(!config.compensate_non_cancelable);
    }

    #[test]
    fn validation_error_display_joins() {
        let err = ConfigError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "validation errors: a; b");
    }

    #[cfg(feature = "config")]
    mod loading {
        use super::*;
        use std::io::Write;

        #[test]
        fn toml_round_trip_with_partial_fields() {
            let config = SyncConfig::from_toml_str(
                r#"
                shadow_attachment = "per_operation"

                [capabilities]
                cancelable_history_events = false
                "#,
            )
            .unwrap();
            assert_eq!(config.shadow_attachment, ShadowAttachment::PerOperation);
            assert!(!config.capabilities.cancelable_history_events);
            assert_eq!(config.capabilities.history_event_target, Surface::Real);
            assert_eq!(config.filler_text, "x");
        }

        #[test]
        fn json_loads() {
            let config = SyncConfig::from_json_str(
                r#"{"filler_text":"z","capabilities":{"history_event_target":"shadow"}}"#,
            )
            .unwrap();
            assert_eq!(config.filler_text, "z");
            assert_eq!(config.capabilities.history_event_target, Surface::Shadow);
        }

        #[test]
        fn invalid_values_fail_validation() {
            let err = SyncConfig::from_json_str(r#"{"filler_text":""}"#).unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
        }

        #[test]
        fn loads_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "filler_text = \"q\"").unwrap();
            let config = SyncConfig::from_toml_file(file.path()).unwrap();
            assert_eq!(config.filler_text, "q");
        }

        #[test]
        fn missing_file_is_io_error() {
            let err = SyncConfig::from_toml_file("/nonexistent/undosync.toml").unwrap_err();
            assert!(matches!(err, ConfigError::Io(_)));
        }
    }
}
