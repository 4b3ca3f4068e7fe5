use crate::priv_prelude::*;

/// The seed used when none is given on the command line.
pub const DEFAULT_SEED: [u64; 3] = [123_456_789, 362_436_069, 521_288_629];

/// Three-word xorshift generator which drives every impairment decision.
///
/// The sequence is a pure function of the seed so that a run can be replayed exactly. This is
/// not a cryptographic generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomSource {
    x: u64,
    y: u64,
    z: u64,
}

impl RandomSource {
    /// Create a generator from three seed words. xorshift is stuck at zero forever if started
    /// there, so an all-zero seed is replaced with [`DEFAULT_SEED`].
    pub fn new(seed: [u64; 3]) -> RandomSource {
        let [x, y, z] = if seed == [0; 3] { DEFAULT_SEED } else { seed };
        RandomSource { x, y, z }
    }

    /// Advance the state and return the next value.
    pub fn draw(&mut self) -> u64 {
        self.x ^= self.x << 16;
        self.x ^= self.x >> 5;
        self.x ^= self.x << 1;
        let t = self.x;
        self.x = self.y;
        self.y = self.z;
        self.z = t ^ self.x ^ self.y;
        self.z
    }

    /// A value in `0..bound`, taken as the remainder of a single draw. `bound` must be non-zero.
    pub fn below(&mut self, bound: u64) -> u64 {
        self.draw() % bound
    }
}

impl Default for RandomSource {
    fn default() -> RandomSource {
        RandomSource::new(DEFAULT_SEED)
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        (self.draw() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.draw()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.draw().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for RandomSource {
    type Seed = [u8; 24];

    fn from_seed(seed: [u8; 24]) -> RandomSource {
        let mut words = [0u64; 3];
        for (word, chunk) in words.iter_mut().zip(seed.chunks_exact(8)) {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            *word = u64::from_le_bytes(buf);
        }
        RandomSource::new(words)
    }
}
