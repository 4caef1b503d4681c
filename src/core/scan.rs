/*!
 * Capture export parser
 *
 * Turns the access-point section of an airodump-ng CSV export into
 * `NetworkRecord`s. Column positions are a compatibility surface:
 * BSSID (0), channel (3), encryption (5), power (8), ESSID (13).
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::address::HardwareAddress;
use crate::core::config::{ScanConfig, ToolsConfig};
use crate::core::error::WpsError;
use crate::core::pins::PinCandidate;
use crate::core::process::CommandSpec;
use crate::core::vendor;

pub const HIDDEN_ESSID: &str = "Hidden";

const COL_BSSID: usize = 0;
const COL_CHANNEL: usize = 3;
const COL_ENCRYPTION: usize = 5;
const COL_POWER: usize = 8;
const COL_ESSID: usize = 13;
const MIN_FIELDS: usize = 14;

/// One access point seen during a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub bssid: HardwareAddress,
    pub essid: String,
    pub channel: Option<i32>,
    pub power: Option<i32>,
    pub encryption: String,
    pub wps_pins: Vec<PinCandidate>,
}

impl NetworkRecord {
    pub fn is_hidden(&self) -> bool {
        self.essid == HIDDEN_ESSID
    }
}

impl std::fmt::Display for NetworkRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.channel {
            Some(ch) => write!(f, "{} [{}] (Ch {})", self.essid, self.bssid, ch),
            None => write!(f, "{} [{}]", self.essid, self.bssid),
        }
    }
}

/// Parsed records plus the rows that had to be dropped
#[derive(Debug, Default)]
pub struct ParseReport {
    pub networks: Vec<NetworkRecord>,
    pub skipped: Vec<WpsError>,
}

/// Parse a capture export, silently dropping malformed rows
pub fn parse(raw: &str) -> Vec<NetworkRecord> {
    parse_with_report(raw).networks
}

/// Parse a capture export and keep a record of every skipped row
pub fn parse_with_report(raw: &str) -> ParseReport {
    let lines: Vec<&str> = raw.lines().collect();
    let mut report = ParseReport::default();

    let ap_start = lines
        .iter()
        .position(|line| line.contains("BSSID") && line.contains("First time seen"))
        .map(|header| header + 1)
        .unwrap_or(0);

    for (offset, line) in lines[ap_start..].iter().enumerate() {
        if line.trim().is_empty() || line.contains("Station MAC") {
            break;
        }

        let line_no = ap_start + offset + 1;
        match parse_row(line, line_no) {
            Ok(Some(record)) => report.networks.push(record),
            Ok(None) => {}
            Err(err) => {
                debug!("Skipping capture row: {}", err);
                report.skipped.push(err);
            }
        }
    }

    report
}

fn parse_row(line: &str, line_no: usize) -> Result<Option<NetworkRecord>, WpsError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    if fields.len() < MIN_FIELDS {
        return Err(WpsError::ParseFailure {
            line: line_no,
            reason: format!("expected {} fields, found {}", MIN_FIELDS, fields.len()),
        });
    }

    let bssid = fields[COL_BSSID];
    if bssid.is_empty() {
        return Ok(None);
    }

    let bssid = HardwareAddress::parse(bssid).map_err(|err| WpsError::ParseFailure {
        line: line_no,
        reason: err.to_string(),
    })?;

    let essid = match fields[COL_ESSID] {
        "" => HIDDEN_ESSID.to_string(),
        name => name.to_string(),
    };

    let wps_pins = vendor::suggested(&bssid);

    Ok(Some(NetworkRecord {
        bssid,
        essid,
        channel: fields[COL_CHANNEL].parse().ok(),
        power: fields[COL_POWER].parse().ok(),
        encryption: fields[COL_ENCRYPTION].to_string(),
        wps_pins,
    }))
}

/// `airodump-ng --write-interval N --output-format csv -w <dir>/<prefix> IFACE`
///
/// airodump-ng never exits on its own; the caller bounds it with a timeout.
pub fn capture_command(tools: &ToolsConfig, scan: &ScanConfig, iface: &str) -> CommandSpec {
    let target = scan.output_dir.join(&scan.output_prefix);
    CommandSpec::new(&tools.airodump_ng)
        .arg("--write-interval")
        .arg(scan.write_interval.to_string())
        .args(["--output-format", "csv", "-w"])
        .arg(target.to_string_lossy())
        .arg(iface)
}

/// Read and parse an export file
pub fn parse_file(path: &Path) -> Result<Vec<NetworkRecord>, WpsError> {
    let raw = fs::read(path)?;
    Ok(parse(&String::from_utf8_lossy(&raw)))
}

fn exports(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, WpsError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_export = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(prefix) && n.ends_with(".csv"))
            .unwrap_or(false);
        if is_export {
            files.push(path);
        }
    }
    Ok(files)
}

/// Newest `<prefix>*.csv` export in `dir`, by modification time
pub fn latest_export(dir: &Path, prefix: &str) -> Result<Option<PathBuf>, WpsError> {
    let newest = exports(dir, prefix)?
        .into_iter()
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, path)| path);

    Ok(newest)
}

/// Remove every `<prefix>*.csv` export in `dir`, returning how many were deleted
pub fn cleanup_exports(dir: &Path, prefix: &str) -> Result<usize, WpsError> {
    let mut removed = 0;
    for path in exports(dir, prefix)? {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "BSSID, First time seen, Last time seen, channel, Speed, Privacy, Cipher, Authentication, Power, # beacons, # IV, LAN IP, ID-length, ESSID, Key";

    fn ap_row(bssid: &str, channel: &str, privacy: &str, power: &str, essid: &str) -> String {
        format!(
            "{}, 2024-01-01 10:00:00, 2024-01-01 10:00:09, {}, 54, {}, CCMP, PSK, {}, 12, 0, 0.0.0.0, {}, {}, ",
            bssid,
            channel,
            privacy,
            power,
            essid.len(),
            essid
        )
    }

    #[test]
    fn test_parse_single_access_point() {
        let raw = format!(
            "\n{}\n{}\n\nStation MAC, First time seen, Last time seen, Power, # packets, BSSID, Probed ESSIDs\n",
            HEADER,
            ap_row("D8:EB:97:12:34:56", "6", "WPA2", "-42", "HomeNet")
        );

        let networks = parse(&raw);
        assert_eq!(networks.len(), 1);

        let net = &networks[0];
        assert_eq!(net.bssid.as_str(), "D8:EB:97:12:34:56");
        assert_eq!(net.channel, Some(6));
        assert_eq!(net.encryption, "WPA2");
        assert_eq!(net.power, Some(-42));
        assert_eq!(net.essid, "HomeNet");
        assert_eq!(net.wps_pins.len(), 1);
        assert_eq!(net.wps_pins[0].pin, "46935076");
    }

    #[test]
    fn test_blank_essid_is_hidden() {
        let raw = format!("{}\n{}\n", HEADER, ap_row("00:11:22:33:44:55", "11", "WPA2", "-70", ""));
        let networks = parse(&raw);
        assert_eq!(networks.len(), 1);
        assert!(networks[0].is_hidden());
        assert!(networks[0].wps_pins.is_empty());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let raw = format!(
            "{}\nAA:BB:CC:DD:EE:FF, too, short\n{}\nnot-a-mac, a, b, 1, 54, WPA2, CCMP, PSK, -50, 1, 0, 0.0.0.0, 3, abc, \n{}\n",
            HEADER,
            ap_row("14:D6:4D:AB:CD:EF", "1", "WPA2 WPA", "-55", "Office"),
            ap_row("AA:BB:CC:DD:EE:FF", "-1", "OPN", "-1", "Cafe")
        );

        let report = parse_with_report(&raw);
        assert_eq!(report.networks.len(), 2);
        assert_eq!(report.skipped.len(), 2);
        assert!(report
            .skipped
            .iter()
            .all(|e| matches!(e, WpsError::ParseFailure { .. })));
        assert_eq!(report.networks[1].channel, Some(-1));
    }

    #[test]
    fn test_empty_bssid_row_skipped_without_error() {
        let raw = format!("{}\n{}\n", HEADER, ap_row("", "6", "WPA2", "-40", "Ghost"));
        let report = parse_with_report(&raw);
        assert!(report.networks.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_capture_command() {
        let scan = ScanConfig {
            output_dir: PathBuf::from("/tmp/wpsprobe"),
            ..ScanConfig::default()
        };
        let spec = capture_command(&ToolsConfig::default(), &scan, "wlan0mon");
        assert_eq!(
            spec.to_string(),
            "airodump-ng --write-interval 1 --output-format csv -w /tmp/wpsprobe/scan wlan0mon"
        );
    }

    #[test]
    fn test_latest_export_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("scan-01.csv"), "old").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(dir.path().join("scan-02.csv"), "new").unwrap();
        fs::write(dir.path().join("other.csv"), "ignored").unwrap();

        let latest = latest_export(dir.path(), "scan").unwrap().unwrap();
        assert_eq!(fs::read_to_string(latest).unwrap(), "new");

        assert_eq!(cleanup_exports(dir.path(), "scan").unwrap(), 2);
        assert!(dir.path().join("other.csv").exists());
        assert!(latest_export(dir.path(), "scan").unwrap().is_none());
    }
}
