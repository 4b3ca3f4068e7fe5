use crate::priv_prelude::*;

/// Counters for frames travelling in one direction, keyed by the endpoint they were captured on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionStats {
    pub captured: u64,
    /// Shorter than the two MAC addresses.
    pub runts: u64,
    /// Sent or received by the capturing interface itself.
    pub looped: u64,
    pub dropped: u64,
    pub corrupted: u64,
    pub truncated: u64,
    pub enqueued: u64,
    pub written: u64,
    pub short_writes: u64,
    pub bytes_written: u64,
}

impl DirectionStats {
    pub(crate) fn record(&mut self, admission: &Admission) {
        self.captured += 1;
        match *admission {
            Admission::Runt => self.runts += 1,
            Admission::Looped => self.looped += 1,
            Admission::Dropped => self.dropped += 1,
            Admission::Forward { corrupt_writes, truncated, .. } => {
                if corrupt_writes > 0 {
                    self.corrupted += 1;
                }
                if truncated {
                    self.truncated += 1;
                }
                self.enqueued += 1;
            },
        }
    }

    /// Count a frame of `len` bytes of which `written` went out. Returns whether the write was
    /// short.
    pub(crate) fn record_write(&mut self, written: usize, len: usize) -> bool {
        self.written += 1;
        self.bytes_written += written as u64;
        if written < len {
            self.short_writes += 1;
            return true;
        }
        false
    }
}

impl fmt::Display for DirectionStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "captured {} (runts {}, looped {}, dropped {}, corrupted {}, truncated {}), \
             enqueued {}, written {} ({} bytes, {} short)",
            self.captured,
            self.runts,
            self.looped,
            self.dropped,
            self.corrupted,
            self.truncated,
            self.enqueued,
            self.written,
            self.bytes_written,
            self.short_writes,
        )
    }
}

/// Counters for both directions of a bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub a_to_b: DirectionStats,
    pub b_to_a: DirectionStats,
}

impl Stats {
    /// Counters for frames captured on `from`.
    pub fn from_side(&self, from: Side) -> &DirectionStats {
        match from {
            Side::A => &self.a_to_b,
            Side::B => &self.b_to_a,
        }
    }

    pub(crate) fn from_side_mut(&mut self, from: Side) -> &mut DirectionStats {
        match from {
            Side::A => &mut self.a_to_b,
            Side::B => &mut self.b_to_a,
        }
    }
}
