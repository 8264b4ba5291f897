//! Poseidon conformance tests.
//!
//! Verifies the generated parameter sets against the published BN254 x^5
//! instances, the permutation against an independent big-integer model
//! built from the same constants, and the hash and sponge against fixed
//! digests.

use num_bigint::BigUint;
use poseidon_gen::error::ErrorCode;
use poseidon_gen::field;
use poseidon_gen::poseidon::{
    self, hash, hash_bytes, load, permute, permute_with_trace, sponge_hash, validate, Hasher,
    Mode, PermutationConfig, RawParameters, RoundKind, SpongeState, SUPPORTED,
};
use poseidon_gen::Fr;
use proptest::prelude::*;

fn fr(v: u64) -> Fr {
    Fr::from_u64(v)
}

fn dec(s: &str) -> Fr {
    Fr::from_decimal(s).unwrap()
}

fn raw_from(config: &PermutationConfig) -> RawParameters {
    RawParameters {
        width: config.width(),
        full_rounds: config.full_rounds(),
        partial_rounds: config.partial_rounds(),
        alpha: config.alpha(),
        security_level: config.security_level(),
        round_constants: config.all_round_constants().concat(),
        mds: config.mds().to_vec(),
    }
}

/// Straight-line model of the permutation over big integers.
fn reference_permute(input: &[Fr], config: &PermutationConfig) -> Vec<Fr> {
    let p = field::modulus();
    let t = config.width();
    let half = config.full_rounds() / 2;
    let rounds = config.total_rounds();
    let mds: Vec<Vec<BigUint>> = config
        .mds()
        .iter()
        .map(|row| row.iter().map(Fr::to_biguint).collect())
        .collect();

    let mut state: Vec<BigUint> = input.iter().map(Fr::to_biguint).collect();
    for r in 0..rounds {
        for (i, s) in state.iter_mut().enumerate() {
            *s = (&*s + config.round_constants(r)[i].to_biguint()) % p;
        }
        let full = r < half || r >= rounds - half;
        let sboxed = if full { t } else { 1 };
        for s in state.iter_mut().take(sboxed) {
            *s = s.modpow(&BigUint::from(config.alpha()), p);
        }
        state = (0..t)
            .map(|i| {
                (0..t).fold(BigUint::from(0u32), |acc, j| {
                    (acc + &mds[i][j] * &state[j]) % p
                })
            })
            .collect();
    }

    state
        .iter()
        .map(|v| Fr::from_biguint(v).unwrap())
        .collect()
}

fn arb_fr() -> impl Strategy<Value = Fr> {
    prop::array::uniform32(any::<u8>()).prop_map(|bytes| {
        let value = BigUint::from_bytes_le(&bytes) % field::modulus();
        Fr::from_biguint(&value).unwrap()
    })
}

// =============================================================================
// Parameter table
// =============================================================================

#[test]
fn supported_pairs_load() {
    for entry in SUPPORTED {
        let config = load(entry.width, entry.security_level).unwrap();
        assert_eq!(config.width(), entry.width);
        assert_eq!(config.rate(), entry.width - 1);
        assert_eq!(config.capacity(), 1);
        assert_eq!(config.full_rounds(), entry.full_rounds);
        assert_eq!(config.partial_rounds(), entry.partial_rounds);
        assert_eq!(config.alpha(), 5);
        assert_eq!(
            config.all_round_constants().len(),
            entry.full_rounds + entry.partial_rounds
        );
        assert!(config
            .all_round_constants()
            .iter()
            .all(|round| round.len() == entry.width));
        assert_eq!(config.mds().len(), entry.width);
    }
}

#[test]
fn unsupported_pairs_are_rejected() {
    for (width, security) in [(4, 128), (3, 256), (0, 128), (17, 128)] {
        assert_eq!(
            load(width, security).unwrap_err(),
            ErrorCode::UnsupportedConfiguration {
                width,
                security_level: security
            }
        );
    }
}

#[test]
fn t3_constants_match_published_instance() {
    let config = load(3, 128).unwrap();
    assert_eq!(
        config.round_constants(0)[0].to_hex(),
        "0x0ee9a592ba9a9518d05986d656f40c2114c4993c11bb29938d21d47304cd8e6e"
    );
    assert_eq!(
        config.round_constants(64)[2].to_hex(),
        "0x1da55cc900f0d21f4a3e694391918a1b3c23b2ac773c6b3ef88e2e4228325161"
    );
    assert_eq!(
        config.mds()[0][0].to_hex(),
        "0x109b7f411ba0e4c9b2b70caf5c36a7b194be7c11ad24378bfedb68592ba8118b"
    );
}

#[test]
fn schedule_is_full_partial_full() {
    let config = load(5, 128).unwrap();
    let kinds: Vec<RoundKind> = config.schedule().collect();
    assert_eq!(kinds.len(), 68);
    assert!(kinds[..4].iter().all(|k| *k == RoundKind::Full));
    assert!(kinds[4..64].iter().all(|k| *k == RoundKind::Partial));
    assert!(kinds[64..].iter().all(|k| *k == RoundKind::Full));
    assert_eq!(config.id(), "bn254-x5-t5-rf8-rp60-s128");
}

#[test]
fn generation_is_reproducible() {
    for entry in SUPPORTED {
        let fresh = poseidon::generate(entry).unwrap();
        let cached = load(entry.width, entry.security_level).unwrap();
        assert_eq!(&fresh, cached);
    }
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn loaded_parameters_validate() {
    for entry in SUPPORTED {
        let config = load(entry.width, entry.security_level).unwrap();
        validate(&raw_from(config)).unwrap();
        assert_eq!(&PermutationConfig::new(raw_from(config)).unwrap(), config);
    }
}

#[test]
fn validation_rejects_broken_material() {
    let config = load(3, 128).unwrap();

    let mut raw = raw_from(config);
    raw.round_constants.pop();
    assert!(matches!(
        validate(&raw),
        Err(ErrorCode::MalformedParameters(_))
    ));

    let mut raw = raw_from(config);
    raw.mds[2] = raw.mds[0].clone();
    assert!(matches!(
        validate(&raw),
        Err(ErrorCode::MalformedParameters(_))
    ));

    let mut raw = raw_from(config);
    raw.mds[1].pop();
    assert!(validate(&raw).is_err());

    let mut raw = raw_from(config);
    raw.full_rounds = 7;
    assert!(validate(&raw).is_err());

    let mut raw = raw_from(config);
    raw.alpha = 3;
    assert!(validate(&raw).is_err(), "x^3 is not a permutation of BN254 Fr");

    let mut raw = raw_from(config);
    raw.alpha = 7;
    validate(&raw).unwrap();
}

// =============================================================================
// Permutation
// =============================================================================

#[test]
fn t3_permutation_reference_vector() {
    let config = load(3, 128).unwrap();
    let out = permute(&[fr(0), fr(1), fr(2)], config).unwrap();
    assert_eq!(
        out,
        vec![
            dec("7853200120776062878684798364095072458815029376092732009249414926327459813530"),
            dec("7142104613055408817911962100316808866448378443474503659992478482890339429929"),
            dec("6549537674122432311777789598043107870002137484850126429160507761192163713804"),
        ]
    );
}

#[test]
fn permutation_rejects_wrong_width() {
    let config = load(3, 128).unwrap();
    assert!(permute(&[Fr::ZERO; 2], config).is_err());
    assert!(permute(&[Fr::ZERO; 5], config).is_err());
}

#[test]
fn trace_ends_in_final_state() {
    let config = load(3, 128).unwrap();
    let input = [fr(0), fr(1), fr(2)];
    let (out, trace) = permute_with_trace(&input, config).unwrap();
    assert_eq!(trace.len(), 65);
    assert_eq!(trace.last().unwrap().state, out);
    assert_eq!(trace[4].kind, RoundKind::Partial);
    assert_eq!(out, permute(&input, config).unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn permutation_matches_reference_t3(a in arb_fr(), b in arb_fr(), c in arb_fr()) {
        let config = load(3, 128).unwrap();
        let input = [a, b, c];
        prop_assert_eq!(permute(&input, config).unwrap(), reference_permute(&input, config));
    }

    #[test]
    fn permutation_matches_reference_t5(input in prop::collection::vec(arb_fr(), 5)) {
        let config = load(5, 128).unwrap();
        prop_assert_eq!(permute(&input, config).unwrap(), reference_permute(&input, config));
    }

    #[test]
    fn hash_is_first_element_of_permutation(a in arb_fr(), b in arb_fr()) {
        let config = load(3, 128).unwrap();
        let digest = hash(&[a, b], config).unwrap();
        prop_assert_eq!(digest, permute(&[Fr::ZERO, a, b], config).unwrap()[0]);
    }
}

// =============================================================================
// Hash
// =============================================================================

#[test]
fn hash_golden_vectors() {
    let t3 = Hasher::new(3, 128).unwrap();
    assert_eq!(
        t3.hash(&[fr(1), fr(2)]).unwrap().to_hex(),
        "0x115cc0f5e7d690413df64c6b9662e9cf2a3617f2743245519e19607a4417189a"
    );
    assert_eq!(
        t3.hash(&[fr(0), fr(0)]).unwrap().to_decimal(),
        "14744269619966411208579211824598458697587494354926760081771325075741142829156"
    );

    let t5 = Hasher::new(5, 128).unwrap();
    assert_eq!(
        t5.hash(&[fr(1), fr(2), fr(3), fr(4)]).unwrap().to_decimal(),
        "18821383157269793795438455681495246036402687001665670618754263018637548127333"
    );
}

#[test]
fn short_input_is_zero_padded() {
    let hasher = Hasher::new(5, 128).unwrap();
    assert_eq!(hasher.arity(), 4);
    assert_eq!(
        hasher.hash(&[fr(9)]).unwrap(),
        hasher.hash(&[fr(9), fr(0), fr(0), fr(0)]).unwrap()
    );
    assert_eq!(
        hasher.hash(&[]).unwrap(),
        hasher.hash(&[Fr::ZERO; 4]).unwrap()
    );
}

#[test]
fn hash_rejects_more_than_rate() {
    let config = load(3, 128).unwrap();
    let err = hash(&[fr(1), fr(2), fr(3)], config).unwrap_err();
    assert_eq!(err, ErrorCode::InputTooLarge { got: 3, limit: 2 });
    assert_eq!(err.code(), 300);
    assert!(err.is_recoverable());
}

#[test]
fn hash_of_largest_element() {
    let config = load(3, 128).unwrap();
    let max = -Fr::ONE;
    let digest = hash(&[max, max], config).unwrap();
    assert_eq!(digest, reference_permute(&[Fr::ZERO, max, max], config)[0]);
}

// =============================================================================
// Sponge
// =============================================================================

#[test]
fn sponge_golden_vectors() {
    let config = load(3, 128).unwrap();
    assert_eq!(
        sponge_hash(&[fr(1), fr(2), fr(3)], 2, config),
        vec![
            dec("8349317170175550601551419028933507166344916868770917378697711059525593983349"),
            dec("3671627482249320216271450360589996451286132976427064605253221552357133987626"),
        ]
    );
    assert_eq!(
        hash_bytes(b"", config).to_decimal(),
        "9807604810977681540537942462159990591554827872659661794094614452930421286825"
    );
    assert_eq!(
        hash_bytes(b"abc", config).to_decimal(),
        "19851862823201765202895161581549764990892865851513040132666746839364716179429"
    );
}

#[test]
fn sponge_is_incremental() {
    let config = load(5, 128).unwrap();
    let elements: Vec<Fr> = (1..=9).map(fr).collect();

    let mut sponge = SpongeState::new(config);
    sponge.absorb(&elements[..4]);
    sponge.absorb(&elements[4..]);
    assert_eq!(sponge.mode(), Mode::Absorbing);
    let out = sponge.squeeze(3);
    assert_eq!(sponge.mode(), Mode::Squeezing);

    assert_eq!(out, sponge_hash(&elements, 3, config));
    assert_eq!(out[0], sponge_hash(&elements, 1, config)[0]);
}

#[test]
fn hash_bytes_separates_trailing_zeros() {
    let config = load(3, 128).unwrap();
    assert_ne!(hash_bytes(b"a", config), hash_bytes(b"a\0", config));
    let long = vec![0xffu8; 100];
    assert_ne!(hash_bytes(&long, config), hash_bytes(&long[..99], config));
}
