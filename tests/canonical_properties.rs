mod common;

use proptest::prelude::*;
use rsa::RsaPrivateKey;
use std::sync::OnceLock;
use wxpay_core::domain::params::{DEFAULT_EXCLUSIONS, ParameterSet, canonicalize};
use wxpay_core::infrastructure::signer::{
    HmacSha256Signer, Md5Signer, RsaSigner, SignatureEngine,
};

fn entries() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("[a-z_]{1,12}", "[ -~]{0,24}", 1..12)
        .prop_map(|map| map.into_iter().collect())
}

/// One engine per supported algorithm. The RSA key is generated once.
fn engines() -> &'static [SignatureEngine] {
    static ENGINES: OnceLock<Vec<SignatureEngine>> = OnceLock::new();
    ENGINES.get_or_init(|| {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let public_key = private_key.to_public_key();
        vec![
            SignatureEngine::new(Box::new(Md5Signer::new(common::KEY)), None),
            SignatureEngine::new(Box::new(HmacSha256Signer::new(common::KEY)), None),
            SignatureEngine::new(Box::new(RsaSigner::new(private_key, Some(public_key))), None),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_canonicalize_ignores_insertion_order(
        (original, shuffled) in entries().prop_flat_map(|entries| {
            let shuffled = Just(entries.clone()).prop_shuffle();
            (Just(entries), shuffled)
        })
    ) {
        let forward: ParameterSet = original.into_iter().collect();
        let reordered: ParameterSet = shuffled.into_iter().collect();
        prop_assert_eq!(
            canonicalize(&forward, DEFAULT_EXCLUSIONS),
            canonicalize(&reordered, DEFAULT_EXCLUSIONS)
        );
    }

    #[test]
    fn test_sign_verify_round_trip(
        engine_index in 0usize..3,
        entries in entries(),
        index in any::<prop::sample::Index>(),
        replacement in "[A-Z0-9]{1,8}",
    ) {
        let engine = &engines()[engine_index];
        let params: ParameterSet = entries.iter().cloned().collect();
        let sign = engine.sign_params(&params, DEFAULT_EXCLUSIONS).unwrap();
        prop_assert!(engine.verify(&params, &sign, DEFAULT_EXCLUSIONS).unwrap());

        // extend one value that is part of the base string
        let signed: Vec<_> = entries
            .iter()
            .filter(|(key, value)| !value.is_empty() && !DEFAULT_EXCLUSIONS.contains(&key.as_str()))
            .collect();
        prop_assume!(!signed.is_empty());
        let (key, value) = signed[index.index(signed.len())];
        let mut tampered = params.clone();
        tampered.insert(key.as_str(), format!("{value}{replacement}"));
        prop_assert!(
            !engine.verify(&tampered, &sign, DEFAULT_EXCLUSIONS).unwrap(),
            "{} accepted a tampered set",
            engine.algorithm()
        );
    }
}
