/*!
 * Background workers for async operations
 *
 * The orchestrator's operations block on external processes. These wrappers
 * run each one on tokio's blocking pool so the calling task stays free to
 * report progress or call `stop()`.
 */

use std::sync::Arc;
use std::time::Duration;

use crate::core::error::WpsError;
use crate::core::interface::InterfaceState;
use crate::core::orchestrator::{AttackOrchestrator, OrchestratorState};
use crate::core::scan::NetworkRecord;
use crate::core::wps::AttackOutcome;

async fn run_blocking<T, F>(orchestrator: &Arc<AttackOrchestrator>, job: F) -> Result<T, WpsError>
where
    T: Send + 'static,
    F: FnOnce(&AttackOrchestrator) -> Result<T, WpsError> + Send + 'static,
{
    let orchestrator = Arc::clone(orchestrator);
    tokio::task::spawn_blocking(move || job(&orchestrator))
        .await
        .map_err(|e| WpsError::Worker(e.to_string()))?
}

/// Enable monitor mode in background
pub async fn enable_monitor_async(
    orchestrator: &Arc<AttackOrchestrator>,
) -> Result<InterfaceState, WpsError> {
    run_blocking(orchestrator, |o| o.enable_monitor()).await
}

/// Restore managed mode in background
pub async fn disable_monitor_async(orchestrator: &Arc<AttackOrchestrator>) -> Result<(), WpsError> {
    run_blocking(orchestrator, |o| o.disable_monitor()).await
}

/// Scan for networks in background
pub async fn scan_async(
    orchestrator: &Arc<AttackOrchestrator>,
    duration: Duration,
) -> Result<Vec<NetworkRecord>, WpsError> {
    run_blocking(orchestrator, move |o| o.scan(duration)).await
}

/// Run a PIN attack in background
pub async fn attack_async(
    orchestrator: &Arc<AttackOrchestrator>,
    bssid: String,
    essid: Option<String>,
) -> Result<AttackOutcome, WpsError> {
    run_blocking(orchestrator, move |o| o.attack(&bssid, essid.as_deref())).await
}

/// Stop whatever is running; waits on the blocking pool like the others
pub async fn stop_async(
    orchestrator: &Arc<AttackOrchestrator>,
) -> Result<OrchestratorState, WpsError> {
    run_blocking(orchestrator, |o| Ok(o.stop())).await
}
