/*!
 * Hardware address codec
 *
 * A 48-bit address kept in both textual (`AA:BB:CC:DD:EE:FF`) and integer form.
 * All PIN derivation math runs on the integer; the fingerprinter works on the
 * delimiter-free hex string.
 */

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::error::WpsError;

const ADDRESS_MASK: u64 = 0xFFFF_FFFF_FFFF;

/// 48-bit hardware address (BSSID / MAC)
#[derive(Debug, Clone)]
pub struct HardwareAddress {
    text: String,
    value: u64,
}

impl HardwareAddress {
    /// Build from the integer form; bits above 48 are dropped
    pub fn from_u64(value: u64) -> Self {
        let value = value & ADDRESS_MASK;
        Self {
            text: Self::format(value),
            value,
        }
    }

    /// Parse the textual form, accepting `:`, `-` and `.` delimiters in any case
    pub fn parse(input: &str) -> Result<Self, WpsError> {
        let normalized = input.trim().replace(['-', '.'], ":").to_uppercase();
        let hex: String = normalized.chars().filter(|c| *c != ':').collect();

        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WpsError::InvalidAddress(input.to_string()));
        }

        let value =
            u64::from_str_radix(&hex, 16).map_err(|_| WpsError::InvalidAddress(input.to_string()))?;

        Ok(Self::from_u64(value))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_u64(&self) -> u64 {
        self.value
    }

    /// Uppercase hex digits without delimiters, e.g. `D8EB97123456`
    pub fn hex(&self) -> String {
        format!("{:012X}", self.value)
    }

    /// Lower 24 bits (the NIC-specific half)
    pub fn nic(&self) -> u64 {
        self.value & 0xFF_FFFF
    }

    /// Address shifted by `delta`, wrapping inside the 48-bit space
    pub fn offset(&self, delta: i64) -> Self {
        Self::from_u64(self.value.wrapping_add(delta as u64))
    }

    /// Address plus `delta`, or `None` past `FF:FF:FF:FF:FF:FF`
    pub fn checked_add(&self, delta: u64) -> Option<Self> {
        self.value
            .checked_add(delta)
            .filter(|v| *v <= ADDRESS_MASK)
            .map(Self::from_u64)
    }

    fn format(value: u64) -> String {
        let hex = format!("{:012X}", value);
        hex.as_bytes()
            .chunks(2)
            .map(|pair| String::from_utf8_lossy(pair).into_owned())
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for HardwareAddress {
    type Err = WpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for HardwareAddress {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl PartialEq for HardwareAddress {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for HardwareAddress {}

impl PartialOrd for HardwareAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HardwareAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl Hash for HardwareAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl Serialize for HardwareAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for HardwareAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
