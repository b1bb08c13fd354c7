//! Property-Based Tests for the Record Codec
//!
//! **Property: Round Trip**
//!
//! For any record collection, decoding its encoding SHALL yield the same
//! collection in the same order, and any strict prefix of an encoding SHALL
//! fail to decode rather than produce a partial collection.

use herdguard_core::{CodecError, JsonCodec, LockRetryPolicy, UserProfile};
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use std::time::Duration;

// ============================================================================
// GENERATORS
// ============================================================================

fn arb_user() -> impl Strategy<Value = UserProfile> {
    (
        any::<i64>(),
        "\\PC{0,24}",
        "\\PC{0,24}",
        "[a-z0-9.]{1,16}@[a-z]{1,12}\\.[a-z]{2,4}",
    )
        .prop_map(|(id, first, last, email)| UserProfile::new(id, first, last, email))
}

fn arb_users() -> impl Strategy<Value = Vec<UserProfile>> {
    prop::collection::vec(arb_user(), 0..32)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_round_trip(users in arb_users()) {
        let codec = JsonCodec::new();
        let encoded = codec.encode(&users).unwrap();
        let decoded: Vec<UserProfile> = codec.decode("allUsers", &encoded).unwrap();
        prop_assert_eq!(decoded, users);
    }

    #[test]
    fn prop_truncation_never_decodes(users in prop::collection::vec(arb_user(), 1..8), cut in 0.0f64..1.0) {
        let codec = JsonCodec::new();
        let encoded = codec.encode(&users).unwrap();
        let mut end = ((encoded.len() as f64) * cut) as usize;
        while !encoded.is_char_boundary(end) {
            end -= 1;
        }
        let result = codec.decode::<UserProfile>("allUsers", &encoded[..end]);
        let is_decode_error = matches!(result, Err(CodecError::Decode { .. }));
        prop_assert!(is_decode_error);
    }

    #[test]
    fn prop_jittered_delay_stays_in_band(attempt in 0u32..80, seed in any::<u64>()) {
        let policy = LockRetryPolicy::default()
            .with_backoff(Duration::from_millis(5), Duration::from_millis(500));
        let mut rng = StdRng::seed_from_u64(seed);
        let base = policy.base_delay(attempt);
        let delay = policy.jittered_delay(attempt, &mut rng);
        prop_assert!(delay <= base);
        prop_assert!(delay >= base / 2);
        prop_assert!(delay <= Duration::from_millis(500));
    }
}
