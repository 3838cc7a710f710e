#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(parsed) = threemf_codec::parse_document(data) else {
        return;
    };
    let _ = threemf_codec::write_package(&parsed.value);
});
