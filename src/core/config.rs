/*!
 * Configuration
 *
 * TOML file with one section per concern. Every field has a default, so an
 * empty or partial file is valid.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub attack: AttackConfig,

    #[serde(default)]
    pub process: ProcessConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load config from default locations or fall back to defaults
    pub fn load_or_default() -> Result<Self> {
        let paths = [
            PathBuf::from("/etc/wpsprobe/config.toml"),
            dirs::config_dir()
                .map(|p| p.join("wpsprobe/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("wpsprobe.toml"),
        ];

        for path in &paths {
            if path.is_file() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;
        Ok(())
    }
}

/// External program names (or absolute paths)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub iw: String,
    pub ip: String,
    pub airmon_ng: String,
    pub airodump_ng: String,
    pub reaver: String,
    pub pkill: String,
    pub systemctl: String,
    pub which: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            iw: "iw".to_string(),
            ip: "ip".to_string(),
            airmon_ng: "airmon-ng".to_string(),
            airodump_ng: "airodump-ng".to_string(),
            reaver: "reaver".to_string(),
            pkill: "pkill".to_string(),
            systemctl: "systemctl".to_string(),
            which: "which".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Service restarted after leaving monitor mode (empty to skip)
    pub network_service: String,
    /// Refuse privileged operations unless running as root
    pub require_root: bool,
    /// Run `airmon-ng check kill` before switching modes
    pub kill_interfering: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            network_service: "NetworkManager".to_string(),
            require_root: true,
            kill_interfering: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub duration_secs: u64,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub write_interval: u32,
    /// Delete capture exports once parsed
    pub cleanup: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            duration_secs: 10,
            output_dir: std::env::temp_dir().join("wpsprobe"),
            output_prefix: "scan".to_string(),
            write_interval: 1,
            cleanup: true,
        }
    }
}

impl ScanConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    /// Candidates taken from the front of the queue
    pub max_attempts: usize,
    pub attempt_timeout_secs: u64,
    /// Budget for the whole session
    pub session_timeout_secs: u64,
    /// Tried when fingerprinting suggests nothing
    pub default_pins: Vec<String>,
    /// reaver `-d`
    pub delay_secs: u32,
    /// reaver `-t`
    pub receive_timeout_secs: u32,
    pub extra_args: Vec<String>,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_secs: 300,
            session_timeout_secs: 900,
            default_pins: vec![
                "12345670".to_string(),
                "00000000".to_string(),
                "11111111".to_string(),
            ],
            delay_secs: 15,
            receive_timeout_secs: 15,
            extra_args: Vec::new(),
        }
    }
}

impl AttackConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub poll_interval_ms: u64,
    /// Time between SIGTERM and SIGKILL
    pub termination_grace_ms: u64,
    /// How long `stop()` waits for the running operation to settle
    pub stop_wait_secs: u64,
    /// Limit for short commands (iw, ip, airmon-ng, systemctl)
    pub command_timeout_secs: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            termination_grace_ms: 2000,
            stop_wait_secs: 10,
            command_timeout_secs: 30,
        }
    }
}

impl ProcessConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }

    pub fn stop_wait(&self) -> Duration {
        Duration::from_secs(self.stop_wait_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}
