// Core library modules
pub mod address;
pub mod config;
pub mod error;
pub mod interface;
pub mod orchestrator;
pub mod pins;
pub mod process;
pub mod scan;
pub mod session;
pub mod system;
pub mod vendor;
pub mod wps;

// Re-exports
pub use address::HardwareAddress;
pub use config::{AttackConfig, Config, MonitorConfig, ProcessConfig, ScanConfig, ToolsConfig};
pub use error::WpsError;
pub use interface::{
    disable_monitor_mode, enable_monitor_mode, list_wireless_interfaces, InterfaceState,
    MonitorResolver, RenamedOrSuffixed,
};
pub use orchestrator::{
    AttackOrchestrator, OrchestratorEvent, OrchestratorState, OrchestratorStatus,
};
pub use pins::{Algorithm, AlgorithmMode, PinCandidate};
pub use process::{CommandRunner, CommandSpec, ProcessOutput, ProcessSupervisor};
pub use scan::{NetworkRecord, ParseReport};
pub use session::{AttackSession, QueuedPin, SessionSnapshot, SessionStatus};
pub use system::{check_dependencies, check_monitor_capability, is_root, system_info, SystemInfo};
pub use wps::{analyze_attempt, reaver_command, AttackOutcome, AttemptVerdict};
