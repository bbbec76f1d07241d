//! Stable signal collection and the fingerprint hash.
//!
//! Signals are low-entropy properties of the host that rarely change
//! between runs. They are joined in a fixed order and reduced with a
//! 32-bit FNV-1a hash. The hash is an identity hint, not a security
//! boundary: it is deterministic and non-cryptographic by design.

use anyhow::Result;

/// Delimiter between signals in the hash input
const SIGNAL_DELIMITER: &str = "###";

/// FNV-1a 32-bit offset basis
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;

/// FNV-1a 32-bit prime
const FNV_PRIME: u32 = 0x0100_0193;

/// Source of stable, low-entropy host signals for device identity.
///
/// Implementations must replace any signal they cannot read with a literal
/// unavailability marker (for example `"lang:unknown"`) rather than fail;
/// an `Err` from `stable_signals` routes the caller onto the persisted
/// random-identifier fallback.
pub trait SignalSource: Send + Sync {
    fn stable_signals(&self) -> Result<Vec<String>>;
}

/// Default signal source backed by OS-level properties.
///
/// Substitutes host signals for the browser-only ones a web client would
/// use (canvas, WebGL): OS name, CPU architecture, available parallelism,
/// local UTC offset, and locale.
pub struct HostSignals;

impl SignalSource for HostSignals {
    fn stable_signals(&self) -> Result<Vec<String>> {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let tz_offset = chrono::Local::now().offset().local_minus_utc();

        let lang = std::env::var("LANG")
            .or_else(|_| std::env::var("LC_ALL"))
            .unwrap_or_else(|_| "unknown".to_string());

        Ok(vec![
            format!("os:{}", std::env::consts::OS),
            format!("arch:{}", std::env::consts::ARCH),
            format!("cpus:{}", cpus),
            format!("tz:{}", tz_offset),
            format!("lang:{}", lang),
        ])
    }
}

/// Reduce an ordered signal list to a fixed-width hex fingerprint.
pub fn fingerprint(signals: &[String]) -> String {
    let joined = signals.join(SIGNAL_DELIMITER);
    format!("{:08x}", fnv1a_32(&joined))
}

/// 32-bit FNV-1a over the UTF-8 bytes of the input.
fn fnv1a_32(input: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in input.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_vectors() {
        // Published FNV-1a 32-bit test vectors
        assert_eq!(fnv1a_32(""), 0x811c_9dc5);
        assert_eq!(fnv1a_32("a"), 0xe40c_292c);
        assert_eq!(fnv1a_32("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_fingerprint_is_fixed_width_hex() {
        let fp = fingerprint(&["os:linux".into(), "cpus:8".into()]);
        assert_eq!(fp.len(), 8);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_is_order_sensitive() {
        let a = fingerprint(&["one".into(), "two".into()]);
        let b = fingerprint(&["two".into(), "one".into()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_host_signals_never_fail() {
        let signals = HostSignals.stable_signals().unwrap();
        assert_eq!(signals.len(), 5);
        assert!(signals.iter().all(|s| s.contains(':')));
    }
}
