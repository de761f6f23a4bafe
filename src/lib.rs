//! Churnbench - seeded slot-churn workload for allocator benchmarking
//!
//! This library drives a fixed-capacity table of heap buffers through a
//! reproducible pattern of random replacements, touching every buffer so its
//! pages are committed, and samples the process's resident memory along the
//! way. The result is one set of numbers per run: churn time, bytes allocated,
//! bytes freed and peak resident memory.

pub mod cli;
pub mod config;
pub mod engine;
pub mod memory_probe;
pub mod report;
pub mod rng;
pub mod slot_table;
pub mod stats;
