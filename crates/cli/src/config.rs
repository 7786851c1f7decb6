//! Sandbox configuration file
//!
//! The sandbox reads a JSON document with camelCase keys:
//!
//! ```json
//! {
//!   "appId": "sandbox-app",
//!   "channelName": "sandbox-room",
//!   "localUserId": "1001",
//!   "userCount": 3,
//!   "packetLossPercent": 10,
//!   "latencyMs": 50,
//!   "logFilePath": "logs/sandbox.log",
//!   "enableNetworkSimulation": true,
//!   "runSeconds": 10
//! }
//! ```
//!
//! Every key is optional. A missing or empty file yields the defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

pub const MAX_PACKET_LOSS_PERCENT: u32 = 50;
pub const MAX_LATENCY_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SandboxConfig {
    pub app_id: String,
    pub channel_name: String,
    pub local_user_id: String,
    /// Participants including the local user
    pub user_count: u32,
    /// Share of remote frames dropped, `0..=50`
    pub packet_loss_percent: u32,
    /// Delay added before each engine call, `0..=1000`
    pub latency_ms: u64,
    /// Also write logs here when set
    pub log_file_path: Option<String>,
    pub enable_network_simulation: bool,
    pub run_seconds: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            channel_name: String::new(),
            local_user_id: String::new(),
            user_count: 2,
            packet_loss_percent: 0,
            latency_ms: 0,
            log_file_path: None,
            enable_network_simulation: false,
            run_seconds: 30,
        }
    }
}

/// Result of reading the configuration file
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: SandboxConfig,
    /// `false` when the file was missing or empty and defaults were used
    pub from_file: bool,
}

impl SandboxConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: SandboxConfig =
            serde_json::from_str(json).context("Failed to parse sandbox configuration")?;
        Ok(config.clamped())
    }

    /// Read `path`, falling back to defaults when it is missing or empty
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<LoadedConfig> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file {}", path.display()));
            }
        };
        if content.trim().is_empty() {
            return Ok(LoadedConfig {
                config: SandboxConfig::default(),
                from_file: false,
            });
        }
        let config = Self::from_json(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(LoadedConfig {
            config,
            from_file: true,
        })
    }

    /// Pull simulation values back into their supported ranges
    pub fn clamped(mut self) -> Self {
        self.packet_loss_percent = self.packet_loss_percent.min(MAX_PACKET_LOSS_PERCENT);
        self.latency_ms = self.latency_ms.min(MAX_LATENCY_MS);
        self.user_count = self.user_count.max(1);
        if self
            .log_file_path
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            self.log_file_path = None;
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.app_id.trim().is_empty() {
            bail!("Sandbox appId empty, abort");
        }
        if self.channel_name.is_empty() {
            bail!("Sandbox channelName empty, abort");
        }
        Ok(())
    }

    /// Engine call delay, zero unless network simulation is on
    pub fn engine_latency(&self) -> Duration {
        if self.enable_network_simulation {
            Duration::from_millis(self.latency_ms)
        } else {
            Duration::ZERO
        }
    }

    /// Frame loss ratio in `0.0..=0.5`, zero unless network simulation is on
    pub fn frame_loss(&self) -> f64 {
        if self.enable_network_simulation {
            f64::from(self.packet_loss_percent) / 100.0
        } else {
            0.0
        }
    }

    pub fn remote_user_count(&self) -> u32 {
        self.user_count.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = SandboxConfig::default();
        assert_eq!(config.user_count, 2);
        assert_eq!(config.run_seconds, 30);
        assert!(!config.enable_network_simulation);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_camel_case_keys() {
        let config = SandboxConfig::from_json(
            r#"{
                "appId": "app1",
                "channelName": "room1",
                "localUserId": "42",
                "userCount": 4,
                "packetLossPercent": 20,
                "latencyMs": 120,
                "logFilePath": "out.log",
                "enableNetworkSimulation": true
            }"#,
        )
        .unwrap();

        assert_eq!(config.app_id, "app1");
        assert_eq!(config.remote_user_count(), 3);
        assert_eq!(config.engine_latency(), Duration::from_millis(120));
        assert!((config.frame_loss() - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.log_file_path.as_deref(), Some("out.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let config = SandboxConfig::from_json(
            r#"{ "appId": "a", "packetLossPercent": 90, "latencyMs": 5000, "userCount": 0, "logFilePath": " " }"#,
        )
        .unwrap();
        assert_eq!(config.packet_loss_percent, 50);
        assert_eq!(config.latency_ms, 1000);
        assert_eq!(config.user_count, 1);
        assert_eq!(config.log_file_path, None);
    }

    #[test]
    fn test_simulation_disabled_means_no_delay_or_loss() {
        let config = SandboxConfig {
            latency_ms: 300,
            packet_loss_percent: 30,
            ..SandboxConfig::default()
        };
        assert_eq!(config.engine_latency(), Duration::ZERO);
        assert_eq!(config.frame_loss(), 0.0);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let loaded = SandboxConfig::load("definitely/not/here/sandbox_config.json").unwrap();
        assert!(!loaded.from_file);
        assert_eq!(loaded.config, SandboxConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("rtcall-sandbox-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "appId": "file-app", "channelName": "c" }"#).unwrap();

        let loaded = SandboxConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(loaded.from_file);
        assert_eq!(loaded.config.app_id, "file-app");
        assert_eq!(loaded.config.user_count, 2);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(SandboxConfig::from_json("{ appId: nope").is_err());
    }
}
