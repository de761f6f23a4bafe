//! Workload configuration
//!
//! The churn workload is driven by a handful of tunables (round count, slot
//! count, size catalog, sampling cadence, warm-up fraction and seed). They are
//! carried in an explicit [`WorkloadConfig`] so several engines with different
//! parameters can coexist, and so tests can run tiny tables.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of churn rounds in a default run
pub const DEFAULT_ROUNDS: u64 = 50_000;

/// Number of slots in the default slot table
pub const DEFAULT_SLOTS: usize = 2_000;

/// Allocation sizes (bytes) drawn uniformly during a default run
pub const DEFAULT_SIZES: [usize; 13] = [16, 24, 32, 40, 48, 64, 80, 96, 128, 256, 512, 1024, 2048];

/// Resident memory is sampled after every 50th round
pub const DEFAULT_SAMPLE_EVERY: u64 = 50;

/// Seed of the default pseudo-random sequence
pub const DEFAULT_SEED: u64 = 0xC0FFEE;

/// Errors produced while validating a workload configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("slot table must have at least one slot")]
    NoSlots,

    #[error("size catalog must contain at least one size")]
    EmptySizeCatalog,

    #[error("sample interval must be at least one round")]
    ZeroSampleInterval,

    #[error("invalid warm-up fraction {numerator}/{denominator}: must lie in [0, 1]")]
    InvalidWarmupFraction { numerator: u32, denominator: u32 },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Ordered set of allocation sizes in bytes
///
/// Serialized as a plain list; deserializing an empty list fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct SizeCatalog(Vec<usize>);

impl SizeCatalog {
    /// Build a catalog, rejecting an empty one
    pub fn new(sizes: impl Into<Vec<usize>>) -> Result<Self> {
        let sizes = sizes.into();
        if sizes.is_empty() {
            return Err(ConfigError::EmptySizeCatalog);
        }
        Ok(Self(sizes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated catalog
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, size: usize) -> bool {
        self.0.contains(&size)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl TryFrom<Vec<usize>> for SizeCatalog {
    type Error = ConfigError;

    fn try_from(sizes: Vec<usize>) -> Result<Self> {
        Self::new(sizes)
    }
}

impl From<SizeCatalog> for Vec<usize> {
    fn from(catalog: SizeCatalog) -> Self {
        catalog.0
    }
}

impl Default for SizeCatalog {
    fn default() -> Self {
        Self(DEFAULT_SIZES.to_vec())
    }
}

/// Leading fraction of the slot table filled before timing starts
///
/// Stored as an integer ratio so the warm-up count is `slots * num / den`
/// with integer division, independent of floating point rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWarmupFraction")]
pub struct WarmupFraction {
    pub numerator: u32,
    pub denominator: u32,
}

impl WarmupFraction {
    pub fn new(numerator: u32, denominator: u32) -> Result<Self> {
        if denominator == 0 || numerator > denominator {
            return Err(ConfigError::InvalidWarmupFraction {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Number of leading slots covered for a table of `slots` entries
    pub fn slots_of(&self, slots: usize) -> usize {
        let scaled = slots as u128 * u128::from(self.numerator) / u128::from(self.denominator);
        scaled as usize
    }
}

impl Default for WarmupFraction {
    fn default() -> Self {
        Self {
            numerator: 1,
            denominator: 8,
        }
    }
}

/// Unvalidated wire form of [`WarmupFraction`]
#[derive(Deserialize)]
struct RawWarmupFraction {
    numerator: u32,
    denominator: u32,
}

impl TryFrom<RawWarmupFraction> for WarmupFraction {
    type Error = ConfigError;

    fn try_from(raw: RawWarmupFraction) -> Result<Self> {
        Self::new(raw.numerator, raw.denominator)
    }
}

/// Validated configuration for one workload run
///
/// # Example
/// ```
/// use churnbench::config::WorkloadConfig;
///
/// let config = WorkloadConfig::builder()
///     .slots(4)
///     .sizes(vec![16, 32])
///     .rounds(1)
///     .build()
///     .unwrap();
/// assert_eq!(config.replacements_per_round(), 2);
/// assert_eq!(config.warmup_slots(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWorkloadConfig")]
pub struct WorkloadConfig {
    rounds: u64,
    slots: usize,
    sizes: SizeCatalog,
    sample_every: u64,
    warmup: WarmupFraction,
    seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            slots: DEFAULT_SLOTS,
            sizes: SizeCatalog::default(),
            sample_every: DEFAULT_SAMPLE_EVERY,
            warmup: WarmupFraction::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl WorkloadConfig {
    /// Start from the defaults and override individual tunables
    pub fn builder() -> WorkloadConfigBuilder {
        WorkloadConfigBuilder::default()
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn sizes(&self) -> &SizeCatalog {
        &self.sizes
    }

    pub fn sample_every(&self) -> u64 {
        self.sample_every
    }

    pub fn warmup(&self) -> WarmupFraction {
        self.warmup
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Slots `0..warmup_slots()` are filled before timing starts
    pub fn warmup_slots(&self) -> usize {
        self.warmup.slots_of(self.slots)
    }

    /// Replacement operations performed in every churn round
    pub fn replacements_per_round(&self) -> usize {
        self.slots / 2
    }

    /// Whether `round` ends with a resident memory sample
    pub fn samples_round(&self, round: u64) -> bool {
        round % self.sample_every == 0
    }

    fn validate(&self) -> Result<()> {
        if self.slots == 0 {
            return Err(ConfigError::NoSlots);
        }
        if self.sizes.is_empty() {
            return Err(ConfigError::EmptySizeCatalog);
        }
        if self.sample_every == 0 {
            return Err(ConfigError::ZeroSampleInterval);
        }
        WarmupFraction::new(self.warmup.numerator, self.warmup.denominator)?;
        Ok(())
    }
}

/// Unvalidated wire form of [`WorkloadConfig`]
#[derive(Deserialize)]
struct RawWorkloadConfig {
    rounds: u64,
    slots: usize,
    sizes: SizeCatalog,
    sample_every: u64,
    warmup: WarmupFraction,
    seed: u64,
}

impl TryFrom<RawWorkloadConfig> for WorkloadConfig {
    type Error = ConfigError;

    fn try_from(raw: RawWorkloadConfig) -> Result<Self> {
        let config = Self {
            rounds: raw.rounds,
            slots: raw.slots,
            sizes: raw.sizes,
            sample_every: raw.sample_every,
            warmup: raw.warmup,
            seed: raw.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Chainable builder for [`WorkloadConfig`]
#[derive(Debug, Clone, Default)]
pub struct WorkloadConfigBuilder {
    config: WorkloadConfig,
    sizes: Option<Vec<usize>>,
}

impl WorkloadConfigBuilder {
    pub fn rounds(mut self, rounds: u64) -> Self {
        self.config.rounds = rounds;
        self
    }

    pub fn slots(mut self, slots: usize) -> Self {
        self.config.slots = slots;
        self
    }

    pub fn sizes(mut self, sizes: impl Into<Vec<usize>>) -> Self {
        self.sizes = Some(sizes.into());
        self
    }

    pub fn sample_every(mut self, rounds: u64) -> Self {
        self.config.sample_every = rounds;
        self
    }

    pub fn warmup_fraction(mut self, numerator: u32, denominator: u32) -> Self {
        self.config.warmup = WarmupFraction {
            numerator,
            denominator,
        };
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> Result<WorkloadConfig> {
        let mut config = self.config;
        if let Some(sizes) = self.sizes {
            config.sizes = SizeCatalog::new(sizes)?;
        }
        config.validate()?;
        Ok(config)
    }
}
