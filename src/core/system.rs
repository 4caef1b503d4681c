/*!
 * Host checks
 *
 * Privilege, driver capability and tool presence, reported before anything
 * touches the radio.
 */

use std::collections::BTreeMap;
use std::fs;

use serde::Serialize;

use crate::core::config::ToolsConfig;
use crate::core::process::{CommandRunner, CommandSpec};
use crate::core::wps;

/// Check if the process is running with root privileges
#[cfg(unix)]
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

/// Whether any wireless PHY advertises monitor mode (`iw list`)
pub fn check_monitor_capability(runner: &dyn CommandRunner, tools: &ToolsConfig) -> bool {
    runner
        .output(&CommandSpec::new(&tools.iw).arg("list"))
        .map(|out| out.stdout.to_lowercase().contains("monitor"))
        .unwrap_or(false)
}

/// Installed state of every external tool the engine drives, keyed by program
pub fn check_dependencies(runner: &dyn CommandRunner, tools: &ToolsConfig) -> BTreeMap<String, bool> {
    [
        &tools.iw,
        &tools.ip,
        &tools.airmon_ng,
        &tools.airodump_ng,
        &tools.reaver,
        &tools.pkill,
        &tools.systemctl,
    ]
    .into_iter()
    .map(|program| (program.clone(), wps::tool_available(runner, tools, program)))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub os: String,
    pub kernel: String,
    pub root: bool,
}

pub fn system_info() -> SystemInfo {
    let os = fs::read_to_string("/etc/os-release")
        .ok()
        .and_then(|content| pretty_name(&content))
        .unwrap_or_else(|| "Unknown".to_string());

    let kernel = fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    SystemInfo {
        os,
        kernel,
        root: is_root(),
    }
}

fn pretty_name(os_release: &str) -> Option<String> {
    os_release
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|value| value.trim().trim_matches('"').to_string())
}
