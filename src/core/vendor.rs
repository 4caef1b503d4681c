/*!
 * Vendor fingerprinting
 *
 * Maps OUI prefixes to the PIN algorithms known to apply to that vendor's
 * firmware. Matching is a literal prefix test on the delimiter-free,
 * uppercase hex form of the BSSID; prefixes may be 6 to 8 digits long.
 */

use crate::core::address::HardwareAddress;
use crate::core::pins::{self, PinCandidate};

/// Per-algorithm prefix lists, in ranking order
static VENDOR_PREFIXES: &[(&str, &[&str])] = &[
    (
        "pin24",
        &[
            "04BF6D", "0E5D4E", "107BEF", "14A9E3", "28285D", "2A285D", "32B2DC", "381766",
            "404A03", "4E5D4E", "5067F0", "5CF4AB", "6A285D", "8E5D4E", "AA285D", "B0B2DC",
            "C86C87", "CC5D4E", "CE5D4E", "EA285D", "E243F6", "EC43F6", "EE43F6", "F2B2DC",
            "FCF528", "FEF528",
        ],
    ),
    ("pin28", &["200BC7", "4846FB", "D46AA8", "F84ABF"]),
    (
        "pin32",
        &[
            "000726", "D8FEE3", "FC8B97", "1062EB", "1C5F2B", "48EE0C", "802689", "908D78",
            "E8CC18", "2CAB25", "10BF48", "14DAE9", "3085A9", "50465D", "5404A6", "C86000",
            "F46D04",
        ],
    ),
    (
        "pinDLink",
        &[
            "14D64D", "1C7EE5", "28107B", "84C9B2", "A0AB1B", "B8A386", "C0A0BB", "CCB255",
            "FC7516", "0014D1", "D8EB97",
        ],
    ),
    (
        "pinDLink1",
        &[
            "0018E7", "00195B", "001CF0", "001E58", "002191", "0022B0", "002401", "00265A",
            "14D64D", "1C7EE5", "340804", "5CD998", "84C9B2", "B8A386", "C8BE19", "C8D3A3",
            "CCB255", "0014D1",
        ],
    ),
    (
        "pinASUS",
        &[
            "049226", "04D9F5", "08606E", "0862669", "107B44", "10BF48", "10C37B", "14DDA9",
            "1C872C", "1CB72C", "2C56DC", "2CFDA1", "305A3A", "382C4A", "38D547", "40167E",
            "50465D", "54A050", "6045CB", "60A44C", "704D7B", "74D02B", "7824AF", "88D7F6",
            "9C5C8E", "AC220B", "AC9E17", "B06EBF", "BCEE7B", "C860007", "D017C2", "D850E6",
            "E03F49", "F0795978", "F832E4",
        ],
    ),
    (
        "pinAirocon",
        &[
            "0007262F", "000B2B4A", "000EF4E7", "001333B", "00177C", "001AEF", "00E04BB3",
            "02101801", "0810734", "08107710", "1013EE0", "2CAB25C7", "788C54", "803F5DF6",
            "94FBB2", "BC9680", "F43E61", "FC8B97",
        ],
    ),
    (
        "pinEmpty",
        &[
            "E46F13", "EC2280", "58D56E", "1062EB", "10BEF5", "1C5F2B", "802689", "A0AB1B",
            "74DADA", "9CD643", "68A0F6", "0C96BF", "20F3A3", "ACE215", "C8D15E", "000E8F",
            "D42122", "3C9872", "788102", "7894B4", "D460E3", "E06066", "004A77", "2C957F",
            "64136C", "74A78E", "88D274", "702E22", "74B57E", "789682", "7C3953", "8C68C8",
            "D476EA", "344DEA", "38D82F", "54BE53", "709F2D", "94A7B7", "981333", "CAA366",
            "D0608C",
        ],
    ),
    (
        "pinCisco",
        &["001A2B", "00248C", "002618", "344DEB", "7071BC", "E06995", "E0CB4E", "7054F5"],
    ),
    (
        "pinBrcm1",
        &["ACF1DF", "BCF685", "C8D3A3", "988B5D", "001AA9", "14144B", "EC6264"],
    ),
    (
        "pinBrcm2",
        &["14D64D", "1C7EE5", "28107B", "84C9B2", "B8A386", "BCF685", "C8BE19"],
    ),
    (
        "pinBrcm3",
        &["14D64D", "1C7EE5", "28107B", "B8A386", "BCF685", "C8BE19", "7C034C"],
    ),
    ("pinBrcm4", BROADCOM_SHARED),
    ("pinBrcm5", BROADCOM_SHARED),
    ("pinBrcm6", BROADCOM_SHARED),
    ("pinAirc1", &["181E78", "40F201", "44E9DD", "D084B0"]),
    ("pinAirc2", &["84A423", "8C10D4", "88A6C6"]),
    (
        "pinDSL2740R",
        &["00265A", "1CBDB9", "340804", "5CD998", "84C9B2", "FC7516"],
    ),
    ("pinRealtek1", &["0014D1", "000C42", "000EE8"]),
    ("pinRealtek2", &["007263", "E4BEED"]),
    ("pinRealtek3", &["08C6B3"]),
    ("pinUpvel", &["784476", "D4BF7F0", "F8C091"]),
    ("pinUR814AC", &["D4BF7F60"]),
    ("pinUR825AC", &["D4BF7F5"]),
    ("pinOnlime", &["D4BF7F", "F8C091", "144D67", "784476", "0014D1"]),
    ("pinEdimax", &["801F02", "00E04C"]),
    ("pinThomson", &["002624", "4432C8", "88F7C7", "CC03FA"]),
    (
        "pinHG532x",
        &[
            "00664B", "086361", "087A4C", "0C96BF", "14B968", "2008ED", "2469A5", "346BD3",
            "786A89", "88E3AB", "9CC172", "ACE215", "D07AB5", "CCA223", "E8CD2D", "F80113",
            "F83DFF",
        ],
    ),
    (
        "pinH108L",
        &["4C09B4", "4CAC0A", "84742A4", "9CD24B", "B075D5", "C864C7", "DC028E", "FCC897"],
    ),
    ("pinONO", &["5C353B", "DC537C"]),
];

/// Broadcom 4/5/6 ship on the same OUIs
const BROADCOM_SHARED: &[&str] = &[
    "14D64D", "1C7EE5", "28107B", "84C9B2", "B8A386", "BCF685", "C8BE19", "C8D3A3", "CCB255",
    "FC7516", "204E7F", "4C17EB", "18622C", "7C03D8", "D86CE9",
];

/// OUI prefixes associated with algorithm `id`
pub fn vendor_prefixes(id: &str) -> Option<&'static [&'static str]> {
    VENDOR_PREFIXES
        .iter()
        .find(|(algo, _)| *algo == id)
        .map(|(_, prefixes)| *prefixes)
}

/// Algorithm ids whose prefix list matches `mac`, in table order
pub fn suggest(mac: &HardwareAddress) -> Vec<&'static str> {
    let hex = mac.hex();

    VENDOR_PREFIXES
        .iter()
        .filter(|(_, prefixes)| prefixes.iter().any(|prefix| hex.starts_with(prefix)))
        .map(|(algo, _)| *algo)
        .collect()
}

/// Derived candidates for the suggested algorithms only
pub fn suggested(mac: &HardwareAddress) -> Vec<PinCandidate> {
    suggest(mac)
        .into_iter()
        .filter_map(|id| pins::derive(id, mac).ok())
        .collect()
}

/// PIN strings of [`suggested`]
pub fn suggested_list(mac: &HardwareAddress) -> Vec<String> {
    suggested(mac).into_iter().map(|c| c.pin).collect()
}

/// The first suggested PIN, or `None` when the vendor is unknown
pub fn likely(mac: &HardwareAddress) -> Option<String> {
    suggested_list(mac).into_iter().next()
}
