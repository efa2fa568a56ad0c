//! Configuration loading

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::client::HandOptions;
use crate::readiness::ReadinessConfig;

/// Control client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub command: CommandConfig,
    #[serde(default)]
    pub readiness: ReadinessSection,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub hand: HandConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_command_endpoint")]
    pub command: String,
    #[serde(default = "default_status_endpoint")]
    pub status: String,
    #[serde(default = "default_streaming_endpoint")]
    pub streaming: String,
    /// Dedicated endpoint for wrist and linear pose frames
    #[serde(default)]
    pub wrist_streaming: Option<String>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            command: default_command_endpoint(),
            status: default_status_endpoint(),
            streaming: default_streaming_endpoint(),
            wrist_streaming: None,
        }
    }
}

fn default_command_endpoint() -> String {
    "ipc:///tmp/prohand-commands.ipc".to_string()
}

fn default_status_endpoint() -> String {
    "ipc:///tmp/prohand-status.ipc".to_string()
}

fn default_streaming_endpoint() -> String {
    "ipc:///tmp/prohand-hand-streaming.ipc".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Per-request timeout
    #[serde(default = "default_command_timeout")]
    pub timeout_ms: u64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_command_timeout(),
        }
    }
}

fn default_command_timeout() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessSection {
    /// Wait after the first enable before polling status
    #[serde(default = "default_settle")]
    pub settle_ms: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Re-send the enable when nothing was observed for this long
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_readiness_timeout")]
    pub timeout_ms: u64,
}

impl Default for ReadinessSection {
    fn default() -> Self {
        Self {
            settle_ms: default_settle(),
            poll_interval_ms: default_poll_interval(),
            retry_interval_ms: default_retry_interval(),
            timeout_ms: default_readiness_timeout(),
        }
    }
}

fn default_settle() -> u64 {
    200
}

fn default_poll_interval() -> u64 {
    50
}

fn default_retry_interval() -> u64 {
    300
}

fn default_readiness_timeout() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Pending status frames kept; the oldest are evicted first
    #[serde(default = "default_status_queue_depth")]
    pub queue_depth: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            queue_depth: default_status_queue_depth(),
        }
    }
}

fn default_status_queue_depth() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Pose frames queued for the writer; further frames are dropped
    #[serde(default = "default_streaming_queue_depth")]
    pub queue_depth: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            queue_depth: default_streaming_queue_depth(),
        }
    }
}

fn default_streaming_queue_depth() -> usize {
    16
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandConfig {
    /// Send finger abduction joints as given; when false they are zeroed
    #[serde(default = "default_true")]
    pub include_abduction: bool,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            include_abduction: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl ClientConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command.timeout_ms)
    }

    pub fn readiness_config(&self) -> ReadinessConfig {
        ReadinessConfig {
            settle: Duration::from_millis(self.readiness.settle_ms),
            poll_interval: Duration::from_millis(self.readiness.poll_interval_ms.max(1)),
            retry_interval: Duration::from_millis(self.readiness.retry_interval_ms.max(1)),
            timeout: Duration::from_millis(self.readiness.timeout_ms),
        }
    }

    pub fn hand_options(&self) -> HandOptions {
        HandOptions {
            include_abduction: self.hand.include_abduction,
        }
    }
}

/// Glove client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GloveConfig {
    #[serde(default = "default_glove_endpoint")]
    pub status_endpoint: String,
    #[serde(default = "default_status_queue_depth")]
    pub queue_depth: usize,
    /// How long `ping` waits for the first valid tactile frame
    #[serde(default = "default_glove_ping_timeout")]
    pub ping_timeout_ms: u64,
}

impl Default for GloveConfig {
    fn default() -> Self {
        Self {
            status_endpoint: default_glove_endpoint(),
            queue_depth: default_status_queue_depth(),
            ping_timeout_ms: default_glove_ping_timeout(),
        }
    }
}

fn default_glove_endpoint() -> String {
    "ipc:///tmp/proglove-status.ipc".to_string()
}

fn default_glove_ping_timeout() -> u64 {
    1000
}

fn load_or_default<T>(path: &Path, what: &str) -> Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: T = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded {} configuration", what);
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using {} defaults", what
        );
        Ok(T::default())
    }
}

/// Load client configuration from file
pub fn load_config(path: &Path) -> Result<ClientConfig> {
    load_or_default(path, "client")
}

/// Load glove configuration from file
pub fn load_glove_config(path: &Path) -> Result<GloveConfig> {
    load_or_default(path, "glove")
}

/// Save default client configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&ClientConfig::default())?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.command.timeout_ms, 1000);
        assert_eq!(config.readiness.retry_interval_ms, 300);
        assert_eq!(config.status.queue_depth, 64);
        assert_eq!(config.streaming.queue_depth, 16);
        assert!(config.endpoints.wrist_streaming.is_none());
        assert!(config.hand.include_abduction);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[endpoints]
command = "tcp://127.0.0.1:6000"
wrist_streaming = "tcp://127.0.0.1:6003"

[readiness]
timeout_ms = 5000

[hand]
include_abduction = false
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.endpoints.command, "tcp://127.0.0.1:6000");
        assert_eq!(config.endpoints.status, "ipc:///tmp/prohand-status.ipc");
        assert_eq!(
            config.endpoints.wrist_streaming.as_deref(),
            Some("tcp://127.0.0.1:6003")
        );
        assert_eq!(config.readiness_config().timeout, Duration::from_secs(5));
        assert_eq!(config.readiness_config().poll_interval, Duration::from_millis(50));
        assert!(!config.hand_options().include_abduction);
    }

    #[test]
    fn test_saved_defaults_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prohand.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.endpoints.streaming, default_streaming_endpoint());
        assert_eq!(config.readiness.settle_ms, 200);
    }

    #[test]
    fn test_bad_toml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[command]\ntimeout_ms = \"soon\"").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_glove_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_glove_config(&dir.path().join("glove.toml")).unwrap();
        assert_eq!(config.ping_timeout_ms, 1000);
        assert_eq!(config.queue_depth, 64);
    }
}
