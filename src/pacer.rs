use crate::priv_prelude::*;

/// Convert a bandwidth in kilobytes per second into the time it takes to send one byte. A
/// bandwidth of zero means "unlimited" and gives zero.
pub fn ns_per_byte(bandwidth_kbps: f64) -> u64 {
    if bandwidth_kbps == 0.0 {
        return 0;
    }
    (1_000_000_000.0 / (bandwidth_kbps * 1024.0)) as u64
}

/// Tracks when an endpoint may next transmit.
///
/// Every write pushes the deadline out by the time the written bytes would take on a link of the
/// configured bandwidth. Each endpoint has its own pacer, so a backlog in one direction never
/// holds up the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandwidthPacer {
    next_eligible: Instant,
}

impl BandwidthPacer {
    /// A pacer that is eligible to send immediately.
    pub fn new(now: Instant) -> BandwidthPacer {
        BandwidthPacer { next_eligible: now }
    }

    pub fn is_eligible(&self, now: Instant) -> bool {
        now >= self.next_eligible
    }

    pub fn deadline(&self) -> Instant {
        self.next_eligible
    }

    /// Account for `len` bytes having just been written at `now`.
    pub fn record_send(&mut self, now: Instant, len: usize, ns_per_byte: u64) {
        let cost = Duration::from_nanos((len as u64).saturating_mul(ns_per_byte));
        self.next_eligible = now + cost;
    }

    /// Forget any outstanding deadline.
    pub fn reset(&mut self, now: Instant) {
        self.next_eligible = now;
    }
}
