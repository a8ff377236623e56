//! Construction-time configuration for a bridge instance.
//!
//! All values are clamped to their published minimums as they are set, so
//! a [`BridgeOptions`] is never in a state the rest of the crate has to
//! re-validate.

use std::time::Duration;

const MIN_BRIDGE_TIMEOUT_MS: u64 = 100;
const MIN_PAUSE_WRITER_THRESHOLD: usize = 1024;
const MIN_SOCKET_BUFFER: usize = 1024;

/// Immutable construction-time options for a bridge.
///
/// # Examples
///
/// ```
/// use bridge_core::options::BridgeOptions;
/// use std::time::Duration;
///
/// let opts = BridgeOptions::new()
///     .with_accept_interval(Duration::from_millis(500))
///     .with_outgoing_cache_bytes(8192);
/// assert_eq!(opts.accept_interval(), Duration::from_millis(500));
/// assert_eq!(opts.outgoing_cache_bytes(), 8192);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    accept_interval: Duration,
    bridge_timeout: Duration,
    outgoing_cache_bytes: usize,
    pause_writer_threshold_bytes: Option<usize>,
    send_buffer_bytes: Option<usize>,
    recv_buffer_bytes: Option<usize>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            accept_interval: Duration::from_millis(1000),
            bridge_timeout: Duration::from_millis(3000),
            outgoing_cache_bytes: 4096,
            pause_writer_threshold_bytes: None,
            send_buffer_bytes: None,
            recv_buffer_bytes: None,
        }
    }
}

impl BridgeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay between accept attempts after a connection ends or the
    /// listener errors.
    #[must_use]
    pub fn with_accept_interval(mut self, interval: Duration) -> Self {
        self.accept_interval = interval;
        self
    }

    /// Deadline for a single flush/send operation. Clamped to at least
    /// 100ms; anything shorter would starve the pumps on routine
    /// scheduling jitter.
    #[must_use]
    pub fn with_bridge_timeout(mut self, timeout: Duration) -> Self {
        self.bridge_timeout = timeout.max(Duration::from_millis(MIN_BRIDGE_TIMEOUT_MS));
        self
    }

    /// Capacity of the ring that holds outbound bytes while disconnected.
    #[must_use]
    pub fn with_outgoing_cache_bytes(mut self, bytes: usize) -> Self {
        self.outgoing_cache_bytes = bytes;
        self
    }

    /// High-water mark at which a pipe backpressures its producer.
    /// Clamped to at least 1024 bytes when set.
    #[must_use]
    pub fn with_pause_writer_threshold_bytes(mut self, bytes: usize) -> Self {
        self.pause_writer_threshold_bytes = Some(bytes.max(MIN_PAUSE_WRITER_THRESHOLD));
        self
    }

    /// Socket-level `SO_SNDBUF` applied right after accept. Clamped to at
    /// least 1024 bytes when set.
    #[must_use]
    pub fn with_send_buffer_bytes(mut self, bytes: usize) -> Self {
        self.send_buffer_bytes = Some(bytes.max(MIN_SOCKET_BUFFER));
        self
    }

    /// Socket-level `SO_RCVBUF` applied right after accept. Clamped to at
    /// least 1024 bytes when set.
    #[must_use]
    pub fn with_recv_buffer_bytes(mut self, bytes: usize) -> Self {
        self.recv_buffer_bytes = Some(bytes.max(MIN_SOCKET_BUFFER));
        self
    }

    #[must_use]
    pub const fn accept_interval(&self) -> Duration {
        self.accept_interval
    }

    #[must_use]
    pub const fn bridge_timeout(&self) -> Duration {
        self.bridge_timeout
    }

    #[must_use]
    pub const fn outgoing_cache_bytes(&self) -> usize {
        self.outgoing_cache_bytes
    }

    #[must_use]
    pub const fn pause_writer_threshold_bytes(&self) -> Option<usize> {
        self.pause_writer_threshold_bytes
    }

    #[must_use]
    pub const fn send_buffer_bytes(&self) -> Option<usize> {
        self.send_buffer_bytes
    }

    #[must_use]
    pub const fn recv_buffer_bytes(&self) -> Option<usize> {
        self.recv_buffer_bytes
    }
}
