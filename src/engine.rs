//! Slot-churn workload engine
//!
//! One engine performs one run:
//!
//! 1. Warm-up: fill slots `0..warmup_slots` with touched buffers (untimed).
//! 2. Churn: `rounds` rounds of `slots / 2` random replacements, sampling
//!    resident memory after every `sample_every`-th round (timed).
//! 3. Drain: free every remaining buffer (untimed).
//! 4. Final sample, then the aggregate [`WorkloadStats`] is returned.
//!
//! Every random choice goes through [`draw_below`], so for a given generator
//! and configuration the byte counters are reproducible bit for bit.

use crate::config::WorkloadConfig;
use crate::memory_probe::{MemoryProbe, SystemProbe};
use crate::rng::{draw_below, XorShift64};
use crate::slot_table::SlotTable;
use crate::stats::WorkloadStats;
use rand::RngCore;
use std::time::Instant;

/// Lifetime byte totals of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteCounters {
    pub allocated: u64,
    pub freed: u64,
}

impl ByteCounters {
    pub fn record_alloc(&mut self, size: usize) {
        self.allocated += size as u64;
    }

    pub fn record_free(&mut self, size: usize) {
        self.freed += size as u64;
    }

    /// Bytes allocated but not yet freed
    pub fn outstanding(&self) -> u64 {
        self.allocated - self.freed
    }
}

/// Monotonic maximum over resident memory samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeakTracker {
    peak_kb: u64,
    samples: u64,
}

impl PeakTracker {
    /// Fold one sample in and return the updated peak
    pub fn observe(&mut self, rss_kb: u64) -> u64 {
        self.samples += 1;
        self.peak_kb = self.peak_kb.max(rss_kb);
        self.peak_kb
    }

    pub fn peak_kb(&self) -> u64 {
        self.peak_kb
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

/// A single step of a run, reported to a [`ChurnObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadEvent {
    /// Warm-up allocated `size` bytes into `slot`
    WarmupFill { slot: usize, size: usize },
    /// A churn replacement; `freed` is the previous occupant's size
    Replacement {
        round: u64,
        slot: usize,
        freed: Option<usize>,
        allocated: usize,
    },
    /// Resident memory sample; `round` is `None` for the final sample
    Sample {
        round: Option<u64>,
        rss_kb: u64,
        peak_kb: u64,
    },
    /// Drain released `size` bytes from `slot`
    Drained { slot: usize, size: usize },
}

/// Read-only view of engine state after an event
#[derive(Debug, Clone, Copy)]
pub struct EngineView<'a> {
    pub table: &'a SlotTable,
    pub counters: &'a ByteCounters,
    pub peak: &'a PeakTracker,
}

/// Hook invoked after every warm-up fill, replacement, sample and drain step
pub trait ChurnObserver {
    fn on_event(&mut self, event: &WorkloadEvent, view: EngineView<'_>);
}

impl ChurnObserver for () {
    #[inline]
    fn on_event(&mut self, _event: &WorkloadEvent, _view: EngineView<'_>) {}
}

/// Records the full event trace
impl ChurnObserver for Vec<WorkloadEvent> {
    fn on_event(&mut self, event: &WorkloadEvent, _view: EngineView<'_>) {
        self.push(event.clone());
    }
}

impl<O: ChurnObserver + ?Sized> ChurnObserver for &mut O {
    fn on_event(&mut self, event: &WorkloadEvent, view: EngineView<'_>) {
        (**self).on_event(event, view);
    }
}

/// Single-use churn workload
///
/// # Example
/// ```
/// use churnbench::config::WorkloadConfig;
/// use churnbench::engine::WorkloadEngine;
///
/// let config = WorkloadConfig::builder().slots(64).rounds(10).build().unwrap();
/// let stats = WorkloadEngine::from_config(config).run();
/// assert_eq!(stats.total_allocated, 103_528);
/// assert_eq!(stats.total_allocated, stats.total_freed);
/// ```
pub struct WorkloadEngine<R, P, O = ()> {
    config: WorkloadConfig,
    rng: R,
    probe: P,
    observer: O,
    table: SlotTable,
    counters: ByteCounters,
    peak: PeakTracker,
}

impl WorkloadEngine<XorShift64, SystemProbe> {
    /// Engine with the default tunables, seed and platform probe
    pub fn with_defaults() -> Self {
        Self::from_config(WorkloadConfig::default())
    }

    /// Engine seeded from `config.seed()` using the platform probe
    pub fn from_config(config: WorkloadConfig) -> Self {
        let rng = XorShift64::new(config.seed());
        Self::new(config, rng, SystemProbe::new())
    }
}

impl<R: RngCore, P: MemoryProbe> WorkloadEngine<R, P> {
    /// Engine drawing from `rng` and sampling with `probe`
    ///
    /// The configuration's seed is not applied to an injected generator.
    pub fn new(config: WorkloadConfig, rng: R, probe: P) -> Self {
        let table = SlotTable::new(config.slots());
        Self {
            config,
            rng,
            probe,
            observer: (),
            table,
            counters: ByteCounters::default(),
            peak: PeakTracker::default(),
        }
    }
}

impl<R: RngCore, P: MemoryProbe, O: ChurnObserver> WorkloadEngine<R, P, O> {
    /// Attach an observer that sees every step of the run
    pub fn with_observer<N: ChurnObserver>(self, observer: N) -> WorkloadEngine<R, P, N> {
        WorkloadEngine {
            config: self.config,
            rng: self.rng,
            probe: self.probe,
            observer,
            table: self.table,
            counters: self.counters,
            peak: self.peak,
        }
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    /// Execute warm-up, churn, drain and the final sample
    pub fn run(mut self) -> WorkloadStats {
        tracing::debug!(
            slots = self.config.slots(),
            rounds = self.config.rounds(),
            sizes = self.config.sizes().len(),
            warmup_slots = self.config.warmup_slots(),
            "starting churn workload"
        );

        self.warm_up();

        let start = Instant::now();
        let replacements = self.churn();
        let elapsed = start.elapsed();

        tracing::debug!(
            elapsed_secs = elapsed.as_secs_f64(),
            live_slots = self.table.occupied(),
            live_bytes = self.table.live_bytes(),
            "churn finished, draining"
        );

        self.drain();
        self.sample(None);

        let stats = WorkloadStats {
            elapsed_secs: elapsed.as_secs_f64(),
            total_allocated: self.counters.allocated,
            total_freed: self.counters.freed,
            peak_rss_kb: self.peak.peak_kb(),
            rounds: self.config.rounds(),
            replacements,
            samples: self.peak.samples(),
        };

        tracing::info!(
            elapsed_secs = stats.elapsed_secs,
            total_allocated = stats.total_allocated,
            total_freed = stats.total_freed,
            peak_rss_kb = stats.peak_rss_kb,
            peak_rss_mb = stats.peak_rss_mb(),
            replacements_per_sec = stats.replacements_per_sec(),
            "workload complete"
        );
        stats
    }

    fn warm_up(&mut self) {
        for slot in 0..self.config.warmup_slots() {
            let size = self.draw_size();
            self.table.install(slot, size);
            self.counters.record_alloc(size);
            self.notify(WorkloadEvent::WarmupFill { slot, size });
        }
    }

    fn churn(&mut self) -> u64 {
        let per_round = self.config.replacements_per_round();
        let mut replacements = 0_u64;

        for round in 0..self.config.rounds() {
            for _ in 0..per_round {
                self.replace_random(round);
                replacements += 1;
            }

            if self.config.samples_round(round) {
                self.sample(Some(round));
            }
        }
        replacements
    }

    fn replace_random(&mut self, round: u64) {
        let slot = draw_below(&mut self.rng, self.table.len());

        let freed = self.table.release(slot);
        if let Some(size) = freed {
            self.counters.record_free(size);
        }

        let size = self.draw_size();
        self.table.install(slot, size);
        self.counters.record_alloc(size);

        self.notify(WorkloadEvent::Replacement {
            round,
            slot,
            freed,
            allocated: size,
        });
    }

    fn drain(&mut self) {
        for slot in 0..self.table.len() {
            if let Some(size) = self.table.release(slot) {
                self.counters.record_free(size);
                self.notify(WorkloadEvent::Drained { slot, size });
            }
        }
    }

    fn sample(&mut self, round: Option<u64>) {
        let rss_kb = self.probe.sample_kb();
        let peak_kb = self.peak.observe(rss_kb);
        tracing::trace!(?round, rss_kb, peak_kb, "resident memory sample");
        self.notify(WorkloadEvent::Sample {
            round,
            rss_kb,
            peak_kb,
        });
    }

    fn draw_size(&mut self) -> usize {
        let sizes = self.config.sizes();
        let index = draw_below(&mut self.rng, sizes.len());
        sizes.as_slice()[index]
    }

    fn notify(&mut self, event: WorkloadEvent) {
        let view = EngineView {
            table: &self.table,
            counters: &self.counters,
            peak: &self.peak,
        };
        self.observer.on_event(&event, view);
    }
}
