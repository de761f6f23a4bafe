//! Reference traces and accounting scenarios for the churn engine
//!
//! Expected values were recorded from the xorshift64* sequence seeded with
//! 0xC0FFEE, drawing `next_u64() % bound` (slot first, then size).

use churnbench::config::WorkloadConfig;
use churnbench::engine::{ChurnObserver, EngineView, WorkloadEngine, WorkloadEvent};
use churnbench::memory_probe::MemoryProbe;
use churnbench::rng::XorShift64;

/// Probe returning a fixed reading
struct ConstantProbe(u64);

impl MemoryProbe for ConstantProbe {
    fn sample_kb(&mut self) -> u64 {
        self.0
    }
}

fn run_traced(config: WorkloadConfig) -> (Vec<WorkloadEvent>, churnbench::stats::WorkloadStats) {
    let mut trace = Vec::new();
    let rng = XorShift64::new(config.seed());
    let stats = WorkloadEngine::new(config, rng, ConstantProbe(512))
        .with_observer(&mut trace)
        .run();
    (trace, stats)
}

fn replacements(trace: &[WorkloadEvent]) -> Vec<(u64, usize, Option<usize>, usize)> {
    trace
        .iter()
        .filter_map(|event| match *event {
            WorkloadEvent::Replacement {
                round,
                slot,
                freed,
                allocated,
            } => Some((round, slot, freed, allocated)),
            _ => None,
        })
        .collect()
}

fn warmup_fills(trace: &[WorkloadEvent]) -> Vec<(usize, usize)> {
    trace
        .iter()
        .filter_map(|event| match *event {
            WorkloadEvent::WarmupFill { slot, size } => Some((slot, size)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_four_slot_single_round_reference_trace() {
    let config = WorkloadConfig::builder()
        .slots(4)
        .sizes(vec![16, 32])
        .rounds(1)
        .build()
        .unwrap();
    let (trace, stats) = run_traced(config);

    assert!(warmup_fills(&trace).is_empty());
    assert_eq!(
        replacements(&trace),
        vec![(0, 1, None, 32), (0, 0, None, 32)]
    );
    assert_eq!(stats.replacements, 2);
    assert_eq!(stats.total_allocated, 64);
    assert_eq!(stats.total_freed, 64);
    assert_eq!(stats.samples, 2);
    assert_eq!(stats.peak_rss_kb, 512);
}

#[test]
fn test_half_warmup_reference_trace_with_reuse() {
    let config = WorkloadConfig::builder()
        .slots(8)
        .sizes(vec![16, 32])
        .rounds(1)
        .warmup_fraction(1, 2)
        .build()
        .unwrap();
    let (trace, stats) = run_traced(config);

    assert_eq!(
        warmup_fills(&trace),
        vec![(0, 32), (1, 32), (2, 16), (3, 32)]
    );
    assert_eq!(
        replacements(&trace),
        vec![
            (0, 0, Some(32), 16),
            (0, 7, None, 32),
            (0, 5, None, 32),
            (0, 5, Some(32), 16),
        ]
    );
    assert_eq!(stats.total_allocated, 208);
    assert_eq!(stats.total_freed, 208);

    let drained: u64 = trace
        .iter()
        .filter_map(|event| match *event {
            WorkloadEvent::Drained { size, .. } => Some(size as u64),
            _ => None,
        })
        .sum();
    assert_eq!(drained, 144);
}

#[test]
fn test_zero_rounds_still_warms_drains_and_samples() {
    let config = WorkloadConfig::builder()
        .slots(16)
        .rounds(0)
        .build()
        .unwrap();
    let (trace, stats) = run_traced(config);

    assert_eq!(warmup_fills(&trace), vec![(0, 40), (1, 24)]);
    assert!(replacements(&trace).is_empty());
    assert_eq!(stats.total_allocated, 64);
    assert_eq!(stats.total_freed, 64);
    assert_eq!(stats.replacements, 0);
    assert_eq!(stats.samples, 1);
    assert!(matches!(
        trace.last(),
        Some(WorkloadEvent::Sample { round: None, .. })
    ));
}

#[test]
fn test_zero_rounds_default_table_warmup_total() {
    let config = WorkloadConfig::builder().rounds(0).build().unwrap();
    let (trace, stats) = run_traced(config);

    let fills = warmup_fills(&trace);
    assert_eq!(fills.len(), 250);
    assert!(fills.iter().enumerate().all(|(i, &(slot, _))| i == slot));

    let warm_sum: u64 = fills.iter().map(|&(_, size)| size as u64).sum();
    assert_eq!(warm_sum, 73_568);
    assert_eq!(stats.total_allocated, warm_sum);
    assert_eq!(stats.total_freed, warm_sum);
}

#[test]
fn test_sixty_four_slot_regression_totals() {
    let config = WorkloadConfig::builder()
        .slots(64)
        .rounds(10)
        .build()
        .unwrap();
    let (trace, stats) = run_traced(config);

    assert_eq!(stats.total_allocated, 103_528);
    assert_eq!(stats.total_freed, 103_528);
    assert_eq!(stats.replacements, 320);
    assert_eq!(warmup_fills(&trace).len(), 8);

    let drained: u64 = trace
        .iter()
        .filter_map(|event| match *event {
            WorkloadEvent::Drained { size, .. } => Some(size as u64),
            _ => None,
        })
        .sum();
    assert_eq!(drained, 9_752);
}

/// Checks the accounting invariants after every event
#[derive(Default)]
struct InvariantChecker {
    catalog: Vec<usize>,
    slots: usize,
    last_peak: u64,
    events: usize,
    max_sample: u64,
}

impl ChurnObserver for InvariantChecker {
    fn on_event(&mut self, event: &WorkloadEvent, view: EngineView<'_>) {
        self.events += 1;

        assert_eq!(
            view.counters.outstanding(),
            view.table.live_bytes(),
            "conservation broken after {event:?}"
        );
        assert!(view.table.occupied() <= self.slots);
        assert_eq!(view.table.len(), self.slots);

        for index in 0..view.table.len() {
            if view.table.is_occupied(index) {
                assert!(self.catalog.contains(&view.table.size_of(index)));
            }
        }

        assert!(view.peak.peak_kb() >= self.last_peak);
        self.last_peak = view.peak.peak_kb();

        if let WorkloadEvent::Sample {
            rss_kb, peak_kb, ..
        } = *event
        {
            self.max_sample = self.max_sample.max(rss_kb);
            assert!(peak_kb >= rss_kb);
            assert_eq!(peak_kb, self.max_sample);
        }
    }
}

/// Probe cycling through rising and falling readings
struct SawtoothProbe {
    next: u64,
}

impl MemoryProbe for SawtoothProbe {
    fn sample_kb(&mut self) -> u64 {
        self.next = (self.next * 7 + 3) % 101;
        self.next
    }
}

#[test]
fn test_invariants_hold_at_every_step() {
    let config = WorkloadConfig::builder()
        .slots(40)
        .rounds(30)
        .sample_every(4)
        .build()
        .unwrap();

    let mut checker = InvariantChecker {
        catalog: config.sizes().as_slice().to_vec(),
        slots: config.slots(),
        ..Default::default()
    };

    let rng = XorShift64::new(config.seed());
    let stats = WorkloadEngine::new(config, rng, SawtoothProbe { next: 1 })
        .with_observer(&mut checker)
        .run();

    assert!(checker.events > 600);
    assert!(stats.is_balanced());
    assert_eq!(stats.peak_rss_kb, checker.max_sample);
    assert_eq!(stats.samples, 9);
}

#[test]
fn test_same_seed_same_totals() {
    let config = WorkloadConfig::builder()
        .slots(128)
        .rounds(25)
        .build()
        .unwrap();

    let first = WorkloadEngine::from_config(config.clone()).run();
    let second = WorkloadEngine::from_config(config).run();

    assert_eq!(first.total_allocated, second.total_allocated);
    assert_eq!(first.total_freed, second.total_freed);
    assert_eq!(first.replacements, second.replacements);
}

#[test]
fn test_different_seed_changes_sequence() {
    let base = WorkloadConfig::builder().slots(128).rounds(25);
    let a = WorkloadEngine::from_config(base.clone().seed(1).build().unwrap()).run();
    let b = WorkloadEngine::from_config(base.seed(2).build().unwrap()).run();

    assert_ne!(a.total_allocated, b.total_allocated);
}

#[test]
fn test_single_slot_table_has_no_churn() {
    let config = WorkloadConfig::builder()
        .slots(1)
        .rounds(5)
        .warmup_fraction(1, 1)
        .build()
        .unwrap();
    let (trace, stats) = run_traced(config);

    assert!(replacements(&trace).is_empty());
    assert_eq!(warmup_fills(&trace).len(), 1);
    assert!(stats.is_balanced());
    assert_eq!(stats.samples, 2);
}

#[test]
fn test_deserialized_config_runs_or_is_rejected() {
    let valid = r#"{"rounds":1,"slots":4,"sizes":[16,32],"sample_every":50,
        "warmup":{"numerator":1,"denominator":8},"seed":12648430}"#;
    let config: WorkloadConfig = serde_json::from_str(valid).unwrap();
    let (trace, stats) = run_traced(config);
    assert_eq!(
        replacements(&trace),
        vec![(0, 1, None, 32), (0, 0, None, 32)]
    );
    assert!(stats.is_balanced());

    for invalid in [
        valid.replace(r#""sample_every":50"#, r#""sample_every":0"#),
        valid.replace(r#""sizes":[16,32]"#, r#""sizes":[]"#),
        valid.replace(r#""slots":4"#, r#""slots":0"#),
        valid.replace(r#""denominator":8"#, r#""denominator":0"#),
    ] {
        assert!(
            serde_json::from_str::<WorkloadConfig>(&invalid).is_err(),
            "accepted {invalid}"
        );
    }
}
