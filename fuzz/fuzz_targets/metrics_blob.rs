#![no_main]

use ecolabel::records::parse_performance_metrics;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(blob) = std::str::from_utf8(data) {
        let _ = parse_performance_metrics(blob, 1);
    }
});
