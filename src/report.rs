//! Human-readable and JSON rendering of workload results

use crate::config::WorkloadConfig;
use crate::stats::WorkloadStats;
use serde::Serialize;
use std::fmt::Write;

/// Separator line opening every text report block
pub const BLOCK_RULE: &str = "-======-";

/// Render the text block for one run
///
/// # Example
/// ```
/// use churnbench::report::render_text;
/// use churnbench::stats::WorkloadStats;
///
/// let stats = WorkloadStats {
///     elapsed_secs: 1.23456,
///     total_allocated: 64,
///     total_freed: 64,
///     peak_rss_kb: 2048,
///     rounds: 1,
///     replacements: 2,
///     samples: 2,
/// };
/// let text = render_text("system allocator", &stats);
/// assert!(text.contains("  time:           1.235 s"));
/// ```
pub fn render_text(label: &str, stats: &WorkloadStats) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(out, "{BLOCK_RULE}");
    let _ = writeln!(out, "{label}");
    let _ = writeln!(out, "  time:           {:.3} s", stats.elapsed_secs);
    let _ = writeln!(out, "  total alloc:    {} B", stats.total_allocated);
    let _ = writeln!(out, "  dropped/freed:  {} B", stats.total_freed);
    let _ = writeln!(out, "  peak RSS:       {} KB", stats.peak_rss_kb);
    out
}

/// JSON report document
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub label: &'a str,
    pub config: &'a WorkloadConfig,
    pub stats: &'a WorkloadStats,
}

/// Render a pretty-printed JSON document with the label, configuration and results
pub fn render_json(
    label: &str,
    config: &WorkloadConfig,
    stats: &WorkloadStats,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        label,
        config,
        stats,
    })
}
