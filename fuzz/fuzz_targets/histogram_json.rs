#![no_main]

use histcmp::collection::HistogramSet;
use histcmp::comparison::{compare, CompareOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing must never panic, and every parsed record must be comparable
        // with itself without error
        if let Ok(set) = HistogramSet::from_json_str(input) {
            for histogram in set.iter() {
                let _ = compare(histogram, histogram, &CompareOptions::default());
            }
        }
    }
});
