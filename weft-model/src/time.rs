//! Hub time: seconds since the network epoch, 32-bit.
//!
//! Message timestamps and sync-ids use this scale rather than Unix time
//! so the 10-digit decimal rendering stays stable for the life of the
//! network. The clock seam yields hub seconds directly; components never
//! touch wall-clock time themselves.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{HubError, HubResult};

/// Network epoch: 2021-01-01T00:00:00Z, in milliseconds since Unix epoch.
pub const HUB_EPOCH_MS: u64 = 1_609_459_200_000;

/// Source of the current hub time.
///
/// Implementations yield 32-bit hub seconds, so the epoch conversion
/// lives behind the seam and callers cannot mix time scales.
pub trait HubClock: Send + Sync {
    /// Current hub time, seconds since the network epoch.
    fn now(&self) -> HubResult<u32>;
}

/// Wall-clock hub time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHubClock;

impl HubClock for SystemHubClock {
    fn now(&self) -> HubResult<u32> {
        let unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| HubError::unknown("system clock precedes the Unix epoch"))?
            .as_millis() as u64;
        to_hub_time(unix_ms)
    }
}

/// Fixed hub time for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedHubClock {
    pub hub_secs: u32,
}

impl FixedHubClock {
    pub fn new(hub_secs: u32) -> Self {
        Self { hub_secs }
    }
}

impl HubClock for FixedHubClock {
    fn now(&self) -> HubResult<u32> {
        Ok(self.hub_secs)
    }
}

/// Convert Unix milliseconds to hub seconds.
///
/// Fails for instants before the epoch or beyond the 32-bit horizon.
pub fn to_hub_time(unix_ms: u64) -> HubResult<u32> {
    if unix_ms < HUB_EPOCH_MS {
        return Err(HubError::invalid_param(format!(
            "timestamp {} precedes the network epoch",
            unix_ms
        )));
    }
    let secs = (unix_ms - HUB_EPOCH_MS) / 1000;
    u32::try_from(secs)
        .map_err(|_| HubError::invalid_param(format!("timestamp {} overflows hub time", unix_ms)))
}

/// Convert hub seconds back to Unix milliseconds.
pub fn from_hub_time(hub_secs: u32) -> u64 {
    HUB_EPOCH_MS + (hub_secs as u64) * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_is_zero() {
        assert_eq!(to_hub_time(HUB_EPOCH_MS).unwrap(), 0);
    }

    #[test]
    fn test_roundtrip() {
        let unix_ms = HUB_EPOCH_MS + 1_665_182_332_000;
        let hub = to_hub_time(unix_ms).unwrap();
        assert_eq!(hub, 1_665_182_332);
        assert_eq!(from_hub_time(hub), unix_ms);
    }

    #[test]
    fn test_pre_epoch_rejected() {
        assert!(to_hub_time(HUB_EPOCH_MS - 1).is_err());
    }

    #[test]
    fn test_system_clock_is_past_the_epoch() {
        // Hub time only moves forward; zero would mean a wall clock
        // stuck at the epoch.
        assert!(SystemHubClock.now().unwrap() > 0);
    }

    #[test]
    fn test_fixed_clock_returns_its_instant() {
        assert_eq!(FixedHubClock::new(1_665_182_332).now().unwrap(), 1_665_182_332);
    }
}
