/*!
 * PIN Derivation Integration Tests
 *
 * Properties of the algorithm registry and vendor fingerprinting that must
 * hold for any address, checked over a spread of addresses.
 */

use wpsprobe::pins::{self, AlgorithmMode};
use wpsprobe::{vendor, HardwareAddress};

fn sample_addresses() -> Vec<HardwareAddress> {
    let mut addrs: Vec<HardwareAddress> = [
        "00:00:00:00:00:00",
        "FF:FF:FF:FF:FF:FF",
        "00:11:22:33:44:55",
        "D8:EB:97:12:34:56",
        "14:D6:4D:AB:CD:EF",
        "04:92:26:00:00:01",
        "E4:6F:13:00:00:01",
        "D4:BF:7F:50:00:01",
    ]
    .iter()
    .map(|s| HardwareAddress::parse(s).unwrap())
    .collect();

    // Deterministic pseudo-random spread
    let mut x: u64 = 0x1234_5678_9ABC;
    for _ in 0..64 {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        addrs.push(HardwareAddress::from_u64(x >> 16));
    }
    addrs
}

#[test]
fn test_derivation_is_deterministic() {
    for addr in sample_addresses() {
        for algo in pins::algorithms() {
            let a = pins::derive(algo.id, &addr).unwrap();
            let b = pins::derive(algo.id, &addr).unwrap();
            assert_eq!(a, b, "{} on {}", algo.id, addr);
        }
    }
}

#[test]
fn test_non_empty_pins_are_eight_valid_digits() {
    for addr in sample_addresses() {
        for candidate in pins::all(&addr, true) {
            let algo = pins::algorithm(&candidate.algorithm).unwrap();
            if algo.mode == AlgorithmMode::Empty {
                assert!(candidate.pin.is_empty());
                continue;
            }
            assert_eq!(candidate.pin.len(), 8, "{:?}", candidate);
            assert!(candidate.pin.chars().all(|c| c.is_ascii_digit()));
            assert!(pins::is_valid_pin(&candidate.pin), "{:?}", candidate);
        }
    }
}

#[test]
fn test_excluding_static_removes_exactly_static() {
    for addr in sample_addresses() {
        let with_static = pins::all(&addr, true);
        let without_static = pins::all(&addr, false);

        let expected: Vec<_> = with_static
            .iter()
            .filter(|c| pins::algorithm(&c.algorithm).unwrap().mode != AlgorithmMode::Static)
            .cloned()
            .collect();
        assert_eq!(without_static, expected);
    }
}

#[test]
fn test_static_pins_ignore_address() {
    let addrs = sample_addresses();
    for algo in pins::algorithms().iter().filter(|a| a.mode == AlgorithmMode::Static) {
        let first = pins::derive(algo.id, &addrs[0]).unwrap().pin;
        for addr in &addrs[1..] {
            assert_eq!(pins::derive(algo.id, addr).unwrap().pin, first, "{}", algo.id);
        }
    }
}

#[test]
fn test_suggestions_are_literal_prefix_matches() {
    for addr in sample_addresses() {
        let hex = addr.hex();
        for id in vendor::suggest(&addr) {
            let prefixes = vendor::vendor_prefixes(id).unwrap();
            assert!(prefixes.iter().any(|p| hex.starts_with(p)), "{} for {}", id, addr);
        }
    }
}

#[test]
fn test_suggested_candidates_match_registry() {
    for addr in sample_addresses() {
        let all = pins::all(&addr, true);
        for candidate in vendor::suggested(&addr) {
            assert!(all.contains(&candidate), "{:?}", candidate);
        }
    }
}

#[test]
fn test_suggest_is_delimiter_and_case_insensitive() {
    let forms = ["D8:EB:97:12:34:56", "d8-eb-97-12-34-56", "d8eb.9712.3456", "d8eb97123456"];
    for form in forms {
        let addr = HardwareAddress::parse(form).unwrap();
        assert_eq!(vendor::suggest(&addr), vec!["pinDLink"], "{}", form);
    }
}

#[test]
fn test_checksum_examples() {
    assert_eq!(pins::checksum(3359829), 1);
    assert_eq!(pins::full_pin(3359829), "33598291");
    assert_eq!(pins::full_pin(529417), "05294176");
}
