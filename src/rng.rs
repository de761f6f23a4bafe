//! Seeded pseudo-random source for the churn workload
//!
//! Benchmark comparisons only make sense when two runs churn the same slots
//! with the same sizes, so the default generator is a small xorshift64*
//! whose output sequence is fully specified by its seed. The engine accepts
//! any [`rand::RngCore`], which keeps the generator injectable in tests.

use rand::{Error, RngCore, SeedableRng};

/// State used in place of a zero seed (xorshift never leaves the zero state)
const ZERO_SEED_REPLACEMENT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Output multiplier of the xorshift64* variant
const MULTIPLIER: u64 = 0x2545_F491_4F6C_DD1D;

/// xorshift64* generator
///
/// # Example
/// ```
/// use churnbench::rng::XorShift64;
/// use rand::RngCore;
///
/// let mut a = XorShift64::new(0xC0FFEE);
/// let mut b = XorShift64::new(0xC0FFEE);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Create a generator whose state is the seed itself
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 {
            ZERO_SEED_REPLACEMENT
        } else {
            seed
        };
        Self { state }
    }

    fn step(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(MULTIPLIER)
    }
}

impl RngCore for XorShift64 {
    fn next_u32(&mut self) -> u32 {
        (self.step() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.step()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for XorShift64 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    // The provided implementation scrambles the seed through PCG32 first;
    // the raw value is kept so sequences stay documented by their seed.
    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}

/// Uniform draw in `[0, bound)` by reduction modulo `bound`
///
/// Every draw the workload makes goes through this function, which pins the
/// sequence of chosen indices and sizes for a given generator.
pub fn draw_below<R: RngCore + ?Sized>(rng: &mut R, bound: usize) -> usize {
    debug_assert!(bound > 0, "draw bound must be non-zero");
    (rng.next_u64() % bound as u64) as usize
}
