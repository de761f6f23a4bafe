#![no_main]

use churnbench::memory_probe::{pages_to_kb, parse_statm_resident};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing and conversion must not panic on any statm content
        if let Ok(pages) = parse_statm_resident(input) {
            let _ = pages_to_kb(pages, 4096);
        }
    }
});
