/*!
 * wpsprobe
 *
 * WPS PIN candidate derivation and monitor-mode attack orchestration.
 * Radio and protocol work is delegated to aircrack-ng and reaver; this crate
 * derives PINs, parses captures and supervises those tools.
 */

pub mod core;
pub mod workers;

pub use crate::core::*;
