//! Runtime-mutable bridge properties.
//!
//! `AcceptInterval` and `BridgeTimeout` can change while the bridge is
//! running; every loop iteration in the accept loop and both pumps reads
//! them fresh so a change takes effect by the next iteration rather than
//! requiring a restart.

use bridge_core::options::BridgeOptions;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const MIN_BRIDGE_TIMEOUT_MS: u64 = 100;

#[derive(Debug)]
pub struct RuntimeOptions {
    accept_interval_ms: AtomicU64,
    bridge_timeout_ms: AtomicU64,
}

impl RuntimeOptions {
    #[must_use]
    pub fn from_options(options: &BridgeOptions) -> Self {
        Self {
            accept_interval_ms: AtomicU64::new(options.accept_interval().as_millis() as u64),
            bridge_timeout_ms: AtomicU64::new(options.bridge_timeout().as_millis() as u64),
        }
    }

    #[must_use]
    pub fn accept_interval(&self) -> Duration {
        Duration::from_millis(self.accept_interval_ms.load(Ordering::Relaxed))
    }

    pub fn set_accept_interval(&self, interval: Duration) {
        self.accept_interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
    }

    #[must_use]
    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge_timeout_ms.load(Ordering::Relaxed))
    }

    pub fn set_bridge_timeout(&self, timeout: Duration) {
        let clamped = timeout.max(Duration::from_millis(MIN_BRIDGE_TIMEOUT_MS));
        self.bridge_timeout_ms
            .store(clamped.as_millis() as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflects_construction_options() {
        let opts = BridgeOptions::new()
            .with_accept_interval(Duration::from_millis(250))
            .with_bridge_timeout(Duration::from_millis(1500));
        let runtime = RuntimeOptions::from_options(&opts);
        assert_eq!(runtime.accept_interval(), Duration::from_millis(250));
        assert_eq!(runtime.bridge_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn set_bridge_timeout_clamps_to_minimum() {
        let runtime = RuntimeOptions::from_options(&BridgeOptions::new());
        runtime.set_bridge_timeout(Duration::from_millis(1));
        assert_eq!(runtime.bridge_timeout(), Duration::from_millis(MIN_BRIDGE_TIMEOUT_MS));
    }

    #[test]
    fn set_accept_interval_takes_effect_immediately() {
        let runtime = RuntimeOptions::from_options(&BridgeOptions::new());
        runtime.set_accept_interval(Duration::from_millis(10));
        assert_eq!(runtime.accept_interval(), Duration::from_millis(10));
    }
}
