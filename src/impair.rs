//! The per-frame impairment stages.
//!
//! Stages always run in the order drop, corrupt, truncate. Corruption picks its offsets over the
//! full captured length, and truncation is applied last whether or not corruption fired.

use crate::priv_prelude::*;

/// What the pipeline decided for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Drop,
    Keep {
        /// Number of single-byte overwrites performed. Several may hit the same offset.
        corrupt_writes: u32,
        /// Whether the frame was shortened.
        truncated: bool,
    },
}

impl Verdict {
    pub fn is_keep(&self) -> bool {
        matches!(self, Verdict::Keep { .. })
    }
}

/// Applies a [`Config`] to frames, drawing every random decision from one [`RandomSource`].
#[derive(Debug, Clone)]
pub struct ImpairmentPipeline {
    rng: RandomSource,
}

impl ImpairmentPipeline {
    pub fn new(rng: RandomSource) -> ImpairmentPipeline {
        ImpairmentPipeline { rng }
    }

    /// Run all stages over `frame`, which may be modified in place. A frame that gets dropped is
    /// left in an unspecified state.
    pub fn apply(&mut self, config: &Config, frame: &mut BytesMut) -> Verdict {
        if self.should_drop(config) {
            return Verdict::Drop;
        }
        let corrupt_writes = self.corrupt(config, frame);
        let truncated = truncate(config, frame);
        Verdict::Keep { corrupt_writes, truncated }
    }

    fn should_drop(&mut self, config: &Config) -> bool {
        if !config.drop_threshold.is_enabled() {
            return false;
        }
        config.drop_threshold.hit(self.rng.draw())
    }

    fn corrupt(&mut self, config: &Config, frame: &mut [u8]) -> u32 {
        if config.corrupt_max_bytes == 0 || !config.corrupt_threshold.is_enabled() {
            return 0;
        }
        if !config.corrupt_threshold.hit(self.rng.draw()) {
            return 0;
        }
        let writes = self.rng.below(u64::from(config.corrupt_max_bytes)) as u32;
        if frame.is_empty() {
            return 0;
        }
        for _ in 0..writes {
            let offset = self.rng.below(frame.len() as u64) as usize;
            frame[offset] = self.rng.below(256) as u8;
        }
        trace!("corrupted frame with {} byte writes", writes);
        writes
    }
}

fn truncate(config: &Config, frame: &mut BytesMut) -> bool {
    let truncate_len = config.truncate_len as usize;
    if truncate_len == 0 || frame.len() <= truncate_len {
        return false;
    }
    frame.truncate(truncate_len);
    true
}
