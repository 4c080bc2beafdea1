#![no_main]

use ecolabel::records::{read_records, CsvLayout, DuplicatePolicy, RecordSet};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must yield records or an error, never a panic
    for layout in [CsvLayout::Raw, CsvLayout::Normalized] {
        if let Ok(records) = read_records(data, layout) {
            let _ = RecordSet::from_records(records, DuplicatePolicy::LastWins);
        }
    }
});
