//! Fuzz test for the cache entry codec
//!
//! Cached values can be written by anything with access to the store, so
//! the decoder sees arbitrary text.
//!
//! Run with: cargo +nightly fuzz run codec_fuzz -- -max_total_time=60

#![no_main]

use herdguard_core::{JsonCodec, UserProfile};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Cached values are text; arbitrary bytes must never panic the decoder.
    if let Ok(input) = std::str::from_utf8(data) {
        let codec = JsonCodec::new();
        if let Ok(users) = codec.decode::<UserProfile>("allUsers", input) {
            // Whatever decodes must survive a round trip unchanged.
            let encoded = codec.encode(&users).expect("decoded records re-encode");
            let again: Vec<UserProfile> = codec
                .decode("allUsers", &encoded)
                .expect("re-encoded records decode");
            assert_eq!(users, again);
        }
    }
});
