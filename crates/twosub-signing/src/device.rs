//! Device identifier (`tdid`) derivation.
//!
//! The identifier is `prefix + suffix`: `prefix` is `390 + year % 10`;
//! `suffix` is a fixed constant on odd years and, on even years, the host's
//! first non-zero hardware address as a big-endian integer padded to 13
//! digits (a second constant when no address is available).

use chrono::Datelike;
use tracing::debug;

/// Suffix used on odd years.
const ODD_YEAR_SUFFIX: &str = "3278516897751";
/// Suffix used on even years when no hardware address is found.
const FALLBACK_SUFFIX: &str = "1234567890123";
/// Base of the year-dependent prefix.
const PREFIX_BASE: i32 = 390;

/// Device identifier for the current local year and this host.
pub fn device_id() -> String {
    let year = chrono::Local::now().year();
    let address = if year.rem_euclid(2) == 0 {
        first_hardware_address()
    } else {
        None
    };
    device_id_for(year, address)
}

/// Device identifier for an explicit year and hardware address.
pub fn device_id_for(year: i32, hardware_address: Option<[u8; 6]>) -> String {
    let last_digit = year.rem_euclid(10);
    let prefix = PREFIX_BASE + last_digit;

    let suffix = if last_digit % 2 != 0 {
        ODD_YEAR_SUFFIX.to_string()
    } else {
        hardware_address
            .map(address_to_int)
            .filter(|n| *n != 0)
            .map_or_else(|| FALLBACK_SUFFIX.to_string(), |n| format!("{n:013}"))
    };

    format!("{prefix}{suffix}")
}

fn address_to_int(bytes: [u8; 6]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

fn first_hardware_address() -> Option<[u8; 6]> {
    match mac_address::MacAddressIterator::new() {
        Ok(interfaces) => first_non_zero(interfaces.map(|mac| mac.bytes())),
        Err(e) => {
            debug!(error = %e, "hardware address lookup failed");
            None
        }
    }
}

/// First address with any non-zero byte, in interface order.
fn first_non_zero(addresses: impl IntoIterator<Item = [u8; 6]>) -> Option<[u8; 6]> {
    addresses
        .into_iter()
        .find(|bytes| bytes.iter().any(|b| *b != 0))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
