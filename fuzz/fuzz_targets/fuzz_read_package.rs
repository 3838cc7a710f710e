#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // ZIP extraction, relationship lookup and model parsing must fail cleanly
    let _ = threemf_codec::read_package(data);
});
