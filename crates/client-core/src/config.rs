//! Session configuration
//!
//! [`SessionConfig`] carries the values needed to bring the engine up. It can be built
//! in code or loaded from JSON:
//!
//! ```rust
//! use rtcall_client_core::SessionConfig;
//!
//! let config = SessionConfig::from_json(r#"{ "app_id": "app1", "debug_mode": true }"#).unwrap();
//! assert_eq!(config.app_id, "app1");
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Application identifier issued by the RTC provider
    pub app_id: String,
    /// Verbose engine logging
    pub debug_mode: bool,
}

impl SessionConfig {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            debug_mode: false,
        }
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Parse a JSON document; missing keys take their defaults
    pub fn from_json(json: &str) -> SessionResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| SessionError::invalid_config("json", e.to_string()))
    }

    pub fn validate(&self) -> SessionResult<()> {
        if self.app_id.trim().is_empty() {
            return Err(SessionError::invalid_config("app_id", "app id is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_style() {
        let config = SessionConfig::new("app1").with_debug_mode(true);
        assert_eq!(config.app_id, "app1");
        assert!(config.debug_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_app_id_rejected() {
        let err = SessionConfig::default().validate().unwrap_err();
        assert_eq!(err.code(), 1002);
        assert!(SessionConfig::new("   ").validate().is_err());
    }

    #[test]
    fn test_json_defaults_and_errors() {
        let config = SessionConfig::from_json("{}").unwrap();
        assert_eq!(config, SessionConfig::default());

        let err = SessionConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfig { ref field, .. } if field == "json"));
    }
}
