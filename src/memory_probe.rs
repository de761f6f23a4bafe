//! Resident memory probing
//!
//! Reads the current process's resident set size in kilobytes. Linux exposes
//! the resident page count in `/proc/self/statm`; everywhere else (and
//! whenever that read fails) the probe falls back to `getrusage`, whose
//! `ru_maxrss` is reported in bytes on Apple platforms and in kilobytes on
//! the others. Every reading is normalized to KB before it leaves this module.
//!
//! Probe failures are recovered here and never reach the workload engine: a
//! probe with no readable source reports 0.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Per-process memory statistics file on Linux
pub const PROC_SELF_STATM: &str = "/proc/self/statm";

/// Page size assumed when `sysconf` cannot report one
const FALLBACK_PAGE_SIZE: u64 = 4096;

/// Reasons a single memory source could not produce a reading
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("statm content has no resident field")]
    MissingField,

    #[error("failed to parse resident pages from '{0}'")]
    Parse(String),

    #[error("memory source unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, ProbeError>;

/// Capability to read the current resident memory in KB
///
/// Implementations must be cheap and side-effect free: the engine calls
/// `sample_kb` at every sampling point of a run.
pub trait MemoryProbe {
    /// Current resident memory in kilobytes; 0 when nothing is readable
    fn sample_kb(&mut self) -> u64;
}

impl<P: MemoryProbe + ?Sized> MemoryProbe for &mut P {
    fn sample_kb(&mut self) -> u64 {
        (**self).sample_kb()
    }
}

/// Unit in which the host reports `ru_maxrss`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxRssUnit {
    Bytes,
    Kilobytes,
}

impl MaxRssUnit {
    /// Unit used by the platform this crate was built for
    pub const fn host() -> Self {
        if cfg!(target_vendor = "apple") {
            MaxRssUnit::Bytes
        } else {
            MaxRssUnit::Kilobytes
        }
    }
}

/// Convert a raw `ru_maxrss` value to KB; negative values clamp to 0
pub fn max_rss_to_kb(raw: i64, unit: MaxRssUnit) -> u64 {
    let raw = u64::try_from(raw).unwrap_or(0);
    match unit {
        MaxRssUnit::Bytes => raw / 1024,
        MaxRssUnit::Kilobytes => raw,
    }
}

/// Extract the resident page count (second field) from statm content
///
/// Format: `size resident shared text lib data dt`, all in pages.
pub fn parse_statm_resident(content: &str) -> Result<u64> {
    let field = content
        .split_whitespace()
        .nth(1)
        .ok_or(ProbeError::MissingField)?;
    field
        .parse::<u64>()
        .map_err(|_| ProbeError::Parse(field.to_string()))
}

/// Convert a page count to KB for the given page size in bytes
pub fn pages_to_kb(pages: u64, page_size: u64) -> u64 {
    pages.saturating_mul(page_size) / 1024
}

/// Host page size in bytes, falling back to 4 KiB
pub fn host_page_size() -> u64 {
    use nix::unistd::{sysconf, SysconfVar};

    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => size as u64,
        _ => FALLBACK_PAGE_SIZE,
    }
}

/// Reads resident pages from a statm file
#[derive(Debug, Clone)]
pub struct StatmProbe {
    path: PathBuf,
    page_size: u64,
}

impl StatmProbe {
    /// Probe `/proc/self/statm` with the host page size
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(PROC_SELF_STATM),
            page_size: host_page_size(),
        }
    }

    /// Probe an arbitrary statm-formatted file (used by tests)
    pub fn with_path(path: impl Into<PathBuf>, page_size: u64) -> Self {
        Self {
            path: path.into(),
            page_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Read and convert, reporting why a reading failed
    pub fn try_sample(&self) -> Result<u64> {
        let content = fs::read_to_string(&self.path).map_err(|source| ProbeError::Io {
            path: self.path.clone(),
            source,
        })?;
        let pages = parse_statm_resident(&content)?;
        Ok(pages_to_kb(pages, self.page_size))
    }
}

impl Default for StatmProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for StatmProbe {
    fn sample_kb(&mut self) -> u64 {
        self.try_sample().unwrap_or(0)
    }
}

/// Reads `ru_maxrss` through `getrusage(RUSAGE_SELF)`
#[derive(Debug, Clone, Copy, Default)]
pub struct RusageProbe;

impl RusageProbe {
    pub fn try_sample(&self) -> Result<u64> {
        use nix::sys::resource::{getrusage, UsageWho};

        let usage = getrusage(UsageWho::RUSAGE_SELF)
            .map_err(|errno| ProbeError::Unavailable(format!("getrusage: {errno}")))?;
        Ok(max_rss_to_kb(i64::from(usage.max_rss()), MaxRssUnit::host()))
    }
}

impl MemoryProbe for RusageProbe {
    fn sample_kb(&mut self) -> u64 {
        self.try_sample().unwrap_or(0)
    }
}

/// Platform default probe: statm where available, `getrusage` otherwise
#[derive(Debug, Clone)]
pub struct SystemProbe {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    statm: StatmProbe,
    rusage: RusageProbe,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            statm: StatmProbe::new(),
            rusage: RusageProbe,
        }
    }

    /// Linux probe reading statm from `path` (used by tests)
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn with_statm(statm: StatmProbe) -> Self {
        Self {
            statm,
            rusage: RusageProbe,
        }
    }

    fn primary(&self) -> Result<u64> {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            self.statm.try_sample()
        }
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        {
            Err(ProbeError::Unavailable(
                "no per-process statm on this platform".to_string(),
            ))
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemProbe {
    fn sample_kb(&mut self) -> u64 {
        match self.primary() {
            Ok(kb) => kb,
            Err(primary) => {
                tracing::trace!(error = %primary, "statm probe failed, falling back to getrusage");
                self.rusage.try_sample().unwrap_or_else(|fallback| {
                    tracing::trace!(error = %fallback, "no resident memory source, reporting 0");
                    0
                })
            }
        }
    }
}

/// One-shot resident memory reading in KB using the platform default probe
pub fn sample() -> u64 {
    SystemProbe::new().sample_kb()
}
