/*!
 * Wireless interface management
 *
 * Enumerates wireless interfaces and toggles them between managed and
 * monitor mode. airmon-ng is the primary mechanism; when it does not yield a
 * distinct monitor interface the interface is switched in place with
 * `ip link` / `iw`.
 */

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::config::{MonitorConfig, ToolsConfig};
use crate::core::error::WpsError;
use crate::core::process::{CommandRunner, CommandSpec, ProcessOutput};

/// Which interface is in monitor mode, and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceState {
    /// Interface name before monitor mode was enabled
    pub managed: String,
    /// Interface used for capture and injection
    pub monitor: String,
    pub active: bool,
}

impl InterfaceState {
    /// airmon-ng created a separate interface (e.g. `wlan0mon`)
    pub fn is_renamed(&self) -> bool {
        self.monitor != self.managed
    }
}

/// Picks the monitor interface after `airmon-ng start`
///
/// Drivers disagree on naming, so this is a strategy rather than a rule.
pub trait MonitorResolver: Send + Sync {
    fn resolve(&self, original: &str, before: &[String], after: &[String]) -> Option<String>;
}

/// Prefer a new `*mon*` interface, then any new interface, else nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct RenamedOrSuffixed;

impl MonitorResolver for RenamedOrSuffixed {
    fn resolve(&self, original: &str, before: &[String], after: &[String]) -> Option<String> {
        let is_new = |iface: &&String| iface.as_str() != original && !before.contains(*iface);

        after
            .iter()
            .filter(is_new)
            .find(|iface| iface.contains("mon"))
            .or_else(|| after.iter().find(is_new))
            .cloned()
    }
}

/// Parse `iw dev` output into interface names, in listing order
pub fn parse_iw_dev(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("Interface"))
        .filter_map(|line| line.split_whitespace().last())
        .map(str::to_string)
        .collect()
}

/// Enumerate wireless interfaces via `iw dev`
pub fn list_wireless_interfaces(
    runner: &dyn CommandRunner,
    tools: &ToolsConfig,
) -> Result<Vec<String>, WpsError> {
    let output = runner.output(&CommandSpec::new(&tools.iw).arg("dev"))?;
    Ok(parse_iw_dev(&output.stdout))
}

fn run_step(runner: &dyn CommandRunner, spec: CommandSpec) -> Result<ProcessOutput, WpsError> {
    let output = runner.output(&spec)?;
    if !output.success() {
        debug!("'{}' exited with {:?}: {}", spec, output.status, output.stderr.trim());
    }
    Ok(output)
}

/// Reconfigure `iface` in place: link down, `iw <iface> <iw_args>`, link up
fn set_mode_in_place(
    runner: &dyn CommandRunner,
    tools: &ToolsConfig,
    iface: &str,
    iw_args: &[&str],
) -> Result<bool, WpsError> {
    let steps = [
        CommandSpec::new(&tools.ip).args(["link", "set", iface, "down"]),
        CommandSpec::new(&tools.iw).arg(iface).args(iw_args.iter().copied()),
        CommandSpec::new(&tools.ip).args(["link", "set", iface, "up"]),
    ];

    let mut ok = true;
    for step in steps {
        ok &= run_step(runner, step)?.success();
    }
    Ok(ok)
}

fn checkpoint(cancel: &AtomicBool, next: &str) -> Result<(), WpsError> {
    if cancel.load(Ordering::SeqCst) {
        info!("Cancelled before {}", next);
        return Err(WpsError::Cancelled);
    }
    Ok(())
}

/// Put the first wireless interface into monitor mode
///
/// `cancel` is checked between steps; once airmon-ng has produced a monitor
/// interface the switch is reported as done.
pub fn enable_monitor_mode(
    runner: &dyn CommandRunner,
    tools: &ToolsConfig,
    monitor: &MonitorConfig,
    resolver: &dyn MonitorResolver,
    cancel: &AtomicBool,
) -> Result<InterfaceState, WpsError> {
    let before = list_wireless_interfaces(runner, tools)?;
    let original = before.first().cloned().ok_or(WpsError::NoInterfaceFound)?;
    info!("Using wireless interface {}", original);

    if monitor.kill_interfering {
        checkpoint(cancel, "airmon-ng check kill")?;
        if let Err(e) = run_step(runner, CommandSpec::new(&tools.airmon_ng).args(["check", "kill"])) {
            warn!("airmon-ng check kill failed: {}", e);
        }
    }

    checkpoint(cancel, "airmon-ng start")?;
    let primary = match run_step(runner, CommandSpec::new(&tools.airmon_ng).args(["start", original.as_str()])) {
        Ok(_) => {
            let after = list_wireless_interfaces(runner, tools)?;
            resolver.resolve(&original, &before, &after)
        }
        Err(WpsError::PermissionDenied(what)) => return Err(WpsError::PermissionDenied(what)),
        Err(e) => {
            warn!("airmon-ng start failed: {}", e);
            None
        }
    };

    if let Some(monitor_iface) = primary {
        info!("Monitor interface {} created by airmon-ng", monitor_iface);
        return Ok(InterfaceState {
            managed: original,
            monitor: monitor_iface,
            active: true,
        });
    }

    checkpoint(cancel, "in-place monitor switch")?;
    info!("No separate monitor interface, switching {} in place", original);
    if set_mode_in_place(runner, tools, &original, &["set", "monitor", "none"])? {
        Ok(InterfaceState {
            managed: original.clone(),
            monitor: original,
            active: true,
        })
    } else {
        Err(WpsError::MonitorModeUnavailable(format!(
            "{} could not be switched to monitor mode",
            original
        )))
    }
}

/// Return the interface to managed mode and restart the network service
pub fn disable_monitor_mode(
    runner: &dyn CommandRunner,
    tools: &ToolsConfig,
    monitor: &MonitorConfig,
    state: &InterfaceState,
) -> Result<(), WpsError> {
    if state.is_renamed() {
        run_step(runner, CommandSpec::new(&tools.airmon_ng).args(["stop", state.monitor.as_str()]))?;
    } else if !set_mode_in_place(runner, tools, &state.monitor, &["set", "type", "managed"])? {
        warn!("{} may still be in monitor mode", state.monitor);
    }

    if !monitor.network_service.is_empty() {
        let restart = CommandSpec::new(&tools.systemctl).args(["restart", monitor.network_service.as_str()]);
        if let Err(e) = run_step(runner, restart) {
            warn!("Failed to restart {}: {}", monitor.network_service, e);
        }
    }

    info!("Interface {} restored to managed mode", state.managed);
    Ok(())
}
