#![no_main]

use dynbwt::index::DynamicIndex;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Loading must reject malformed input without panicking
    if let Ok(index) = DynamicIndex::load(&mut &data[..]) {
        let mut buf = Vec::new();
        let _ = index.serialize(&mut buf);
    }
});
