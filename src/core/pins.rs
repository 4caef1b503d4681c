/*!
 * WPS PIN algorithm registry
 *
 * Fixed, ordered catalog of PIN derivation algorithms:
 * - MAC-derived: bit manipulation on the BSSID
 * - Static: vendor default PINs that ignore the BSSID
 * - Empty: devices that accept an empty PIN
 *
 * Every non-empty PIN is 7 data digits followed by the WPS checksum digit.
 */

use serde::{Deserialize, Serialize};

use crate::core::address::HardwareAddress;
use crate::core::error::WpsError;

/// How an algorithm produces its PIN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlgorithmMode {
    /// Derived from the hardware address
    Mac,
    /// No PIN at all
    Empty,
    /// Hardcoded vendor default
    Static,
}

/// A single registered derivation algorithm
#[derive(Clone, Copy)]
pub struct Algorithm {
    pub id: &'static str,
    pub name: &'static str,
    pub mode: AlgorithmMode,
    generate: fn(&HardwareAddress) -> u64,
}

impl std::fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Algorithm")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Algorithm {
    const fn mac(id: &'static str, name: &'static str, generate: fn(&HardwareAddress) -> u64) -> Self {
        Self {
            id,
            name,
            mode: AlgorithmMode::Mac,
            generate,
        }
    }

    const fn fixed(id: &'static str, name: &'static str, generate: fn(&HardwareAddress) -> u64) -> Self {
        Self {
            id,
            name,
            mode: AlgorithmMode::Static,
            generate,
        }
    }

    /// Name shown to users; static PINs are labelled as such
    pub fn display_name(&self) -> String {
        match self.mode {
            AlgorithmMode::Static => format!("Static PIN - {}", self.name),
            _ => self.name.to_string(),
        }
    }

    /// Derive the full PIN string for `mac`
    pub fn derive(&self, mac: &HardwareAddress) -> String {
        if self.mode == AlgorithmMode::Empty {
            return String::new();
        }
        full_pin((self.generate)(mac) % 10_000_000)
    }

    fn candidate(&self, mac: &HardwareAddress) -> PinCandidate {
        PinCandidate {
            algorithm: self.id.to_string(),
            name: self.display_name(),
            pin: self.derive(mac),
        }
    }
}

/// A derived PIN together with the algorithm that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinCandidate {
    pub algorithm: String,
    pub name: String,
    pub pin: String,
}

impl PinCandidate {
    pub fn is_empty(&self) -> bool {
        self.pin.is_empty()
    }
}

fn pin24(mac: &HardwareAddress) -> u64 {
    mac.as_u64() & 0xFF_FFFF
}

fn pin28(mac: &HardwareAddress) -> u64 {
    mac.as_u64() & 0xFFF_FFFF
}

fn pin32(mac: &HardwareAddress) -> u64 {
    mac.as_u64() % 0x1_0000_0000
}

fn pin_dlink(mac: &HardwareAddress) -> u64 {
    mac.nic() ^ 0x55AA55
}

fn pin_dlink1(mac: &HardwareAddress) -> u64 {
    pin_dlink(mac) + 1
}

fn pin_asus(mac: &HardwareAddress) -> u64 {
    let mut pin = (0x55AA55 ^ mac.nic()) as u32;
    for _ in 0..32 {
        pin = (pin << 1).wrapping_add(pin >> 31);
    }
    u64::from(pin) % 10_000_000
}

fn pin_airocon(mac: &HardwareAddress) -> u64 {
    let nic = mac.nic();
    ((nic >> 16) ^ (nic & 0xFFFF)) | (nic << 16)
}

fn pin_empty(_: &HardwareAddress) -> u64 {
    0
}

fn fixed_pin<const PIN: u64>(_: &HardwareAddress) -> u64 {
    PIN
}

macro_rules! static_pin {
    ($id:literal, $name:literal, $pin:literal) => {
        Algorithm::fixed($id, $name, fixed_pin::<$pin>)
    };
}

/// The registry, in declaration order (fingerprint ranking depends on it)
static ALGORITHMS: [Algorithm; 30] = [
    Algorithm::mac("pin24", "24-bit PIN", pin24),
    Algorithm::mac("pin28", "28-bit PIN", pin28),
    Algorithm::mac("pin32", "32-bit PIN", pin32),
    Algorithm::mac("pinDLink", "D-Link PIN", pin_dlink),
    Algorithm::mac("pinDLink1", "D-Link PIN +1", pin_dlink1),
    Algorithm::mac("pinASUS", "ASUS PIN", pin_asus),
    Algorithm::mac("pinAirocon", "Airocon Realtek", pin_airocon),
    Algorithm {
        id: "pinEmpty",
        name: "Empty PIN",
        mode: AlgorithmMode::Empty,
        generate: pin_empty,
    },
    static_pin!("pinCisco", "Cisco", 1234567),
    static_pin!("pinBrcm1", "Broadcom 1", 2017252),
    static_pin!("pinBrcm2", "Broadcom 2", 4626484),
    static_pin!("pinBrcm3", "Broadcom 3", 7622990),
    static_pin!("pinBrcm4", "Broadcom 4", 6232714),
    static_pin!("pinBrcm5", "Broadcom 5", 1086411),
    static_pin!("pinBrcm6", "Broadcom 6", 3195719),
    static_pin!("pinAirc1", "Airocon 1", 3043203),
    static_pin!("pinAirc2", "Airocon 2", 7141225),
    static_pin!("pinDSL2740R", "DSL-2740R", 6817554),
    static_pin!("pinRealtek1", "Realtek 1", 9566146),
    static_pin!("pinRealtek2", "Realtek 2", 9571911),
    static_pin!("pinRealtek3", "Realtek 3", 4856371),
    static_pin!("pinUpvel", "Upvel", 2085483),
    static_pin!("pinUR814AC", "UR-814AC", 4397768),
    static_pin!("pinUR825AC", "UR-825AC", 529417),
    static_pin!("pinOnlime", "Onlime", 9995604),
    static_pin!("pinEdimax", "Edimax", 3561153),
    static_pin!("pinThomson", "Thomson", 6795814),
    static_pin!("pinHG532x", "HG532x", 3425928),
    static_pin!("pinH108L", "H108L", 9422988),
    static_pin!("pinONO", "CBN ONO", 9575521),
];

/// All registered algorithms in declaration order
pub fn algorithms() -> &'static [Algorithm] {
    &ALGORITHMS
}

/// Look up an algorithm by id
pub fn algorithm(id: &str) -> Option<&'static Algorithm> {
    ALGORITHMS.iter().find(|algo| algo.id == id)
}

/// Calculate the WPS checksum digit for a 7-digit PIN
///
/// Peels two digits at a time from the least-significant end: three times the
/// last digit, then the next digit, are added to an accumulator.
pub fn checksum(pin: u32) -> u8 {
    let mut pin = pin;
    let mut accum = 0u32;

    while pin > 0 {
        accum += 3 * (pin % 10);
        pin /= 10;
        accum += pin % 10;
        pin /= 10;
    }

    ((10 - accum % 10) % 10) as u8
}

/// Append the checksum to a 7-digit value, zero-padded to 8 characters
pub fn full_pin(seven_digits: u64) -> String {
    let base = (seven_digits % 10_000_000) as u32;
    format!("{:07}{}", base, checksum(base))
}

/// Whether `pin` is 8 digits with a correct checksum digit
pub fn is_valid_pin(pin: &str) -> bool {
    if pin.len() != 8 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    match pin[..7].parse::<u32>() {
        Ok(base) => pin.ends_with(char::from(b'0' + checksum(base))),
        Err(_) => false,
    }
}

/// Derive the PIN of algorithm `id` for `mac`
pub fn derive(id: &str, mac: &HardwareAddress) -> Result<PinCandidate, WpsError> {
    algorithm(id)
        .map(|algo| algo.candidate(mac))
        .ok_or_else(|| WpsError::UnknownAlgorithm(id.to_string()))
}

/// Every registered candidate for `mac`, optionally without static PINs
pub fn all(mac: &HardwareAddress, include_static: bool) -> Vec<PinCandidate> {
    ALGORITHMS
        .iter()
        .filter(|algo| include_static || algo.mode != AlgorithmMode::Static)
        .map(|algo| algo.candidate(mac))
        .collect()
}

/// Just the PIN strings of [`all`]
pub fn all_list(mac: &HardwareAddress, include_static: bool) -> Vec<String> {
    all(mac, include_static).into_iter().map(|c| c.pin).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(s: &str) -> HardwareAddress {
        HardwareAddress::parse(s).unwrap()
    }

    #[test]
    fn test_wps_checksum_calculation() {
        let test_cases = vec![(3359829, 1), (1234567, 0), (0, 0), (529417, 6)];

        for (pin, expected) in test_cases {
            assert_eq!(
                checksum(pin),
                expected,
                "PIN {} should have checksum {}",
                pin,
                expected
            );
        }
    }

    #[test]
    fn test_pin24_known_value() {
        let candidate = derive("pin24", &mac("00:11:22:33:44:55")).unwrap();
        assert_eq!(candidate.pin, "33598291");
        assert_eq!(candidate.name, "24-bit PIN");
    }

    #[test]
    fn test_mac_derived_algorithms() {
        let addr = mac("00:11:22:33:44:55");
        let expected = [
            ("pin28", "69142611"),
            ("pin32", "37851736"),
            ("pinDLink", "67456000"),
            ("pinDLink1", "67456017"),
            ("pinASUS", "67456000"),
            ("pinAirocon", "97708544"),
        ];
        for (id, pin) in expected {
            assert_eq!(derive(id, &addr).unwrap().pin, pin, "algorithm {}", id);
        }
    }

    #[test]
    fn test_static_pins_zero_padded() {
        let addr = mac("AA:BB:CC:DD:EE:FF");
        assert_eq!(derive("pinCisco", &addr).unwrap().pin, "12345670");
        assert_eq!(derive("pinUR825AC", &addr).unwrap().pin, "05294176");
        assert_eq!(
            derive("pinCisco", &addr).unwrap().name,
            "Static PIN - Cisco"
        );
    }

    #[test]
    fn test_empty_pin_has_no_checksum() {
        let candidate = derive("pinEmpty", &mac("00:11:22:33:44:55")).unwrap();
        assert!(candidate.is_empty());
    }

    #[test]
    fn test_unknown_algorithm() {
        let result = derive("pinNope", &mac("00:11:22:33:44:55"));
        assert!(matches!(result, Err(WpsError::UnknownAlgorithm(id)) if id == "pinNope"));
    }

    #[test]
    fn test_registry_shape() {
        assert_eq!(algorithms().len(), 30);
        let statics = algorithms()
            .iter()
            .filter(|a| a.mode == AlgorithmMode::Static)
            .count();
        assert_eq!(statics, 22);
        assert_eq!(algorithms()[0].id, "pin24");
        assert_eq!(algorithms()[29].id, "pinONO");
    }

    #[test]
    fn test_all_without_static_is_subset() {
        let addr = mac("14:D6:4D:AB:CD:EF");
        let with_static = all(&addr, true);
        let without_static = all(&addr, false);

        assert_eq!(with_static.len(), 30);
        assert_eq!(without_static.len(), 8);
        for candidate in &without_static {
            assert!(with_static.contains(candidate));
        }
        assert_eq!(all_list(&addr, false).len(), 8);
    }

    #[test]
    fn test_is_valid_pin() {
        assert!(is_valid_pin("12345670"));
        assert!(is_valid_pin("33598291"));
        assert!(!is_valid_pin("12345678"));
        assert!(!is_valid_pin("1234567"));
        assert!(!is_valid_pin("1234567a"));
    }

    #[test]
    fn test_generated_pins_are_valid() {
        let addr = mac("D8:EB:97:12:34:56");
        for candidate in all(&addr, true).iter().filter(|c| !c.is_empty()) {
            assert_eq!(candidate.pin.len(), 8);
            assert!(is_valid_pin(&candidate.pin), "{:?}", candidate);
        }
    }
}
