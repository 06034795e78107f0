//! Encode / reconstruct behaviour through the public encoder API
//!
//! Every test runs against both the generic (scalar) encoder and whatever
//! accelerated encoder this CPU provides.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rsfec::reed_solomon::{
    detect_capabilities, CapabilitySet, Construction, Encoder, EncoderBuilder, ErrorKind,
    RsError,
};

fn encoders(d: usize, p: usize, construction: Construction) -> Vec<Encoder> {
    [CapabilitySet::scalar_only(), detect_capabilities()]
        .into_iter()
        .map(|caps| {
            EncoderBuilder::new(d, p)
                .construction(construction)
                .capabilities(caps)
                .build()
                .unwrap()
        })
        .collect()
}

fn random_shards(d: usize, p: usize, len: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut shards = vec![vec![0u8; len]; d + p];
    for shard in shards.iter_mut().take(d) {
        rng.fill(&mut shard[..]);
    }
    shards
}

/// All `k`-element subsets of `0..n`, in lexicographic order
fn subsets(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn go(start: usize, n: usize, k: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            go(i + 1, n, k, current, out);
            current.pop();
        }
    }
    let mut out = Vec::new();
    go(0, n, k, &mut Vec::new(), &mut out);
    out
}

#[test]
fn test_encode_concrete_scenario() {
    for encoder in encoders(5, 5, Construction::Vandermonde) {
        let mut shards = vec![
            vec![0u8, 1],
            vec![4, 5],
            vec![2, 3],
            vec![6, 7],
            vec![8, 9],
            vec![0, 0],
            vec![0, 0],
            vec![0, 0],
            vec![0, 0],
            vec![0, 0],
        ];
        encoder.encode(&mut shards).unwrap();
        assert_eq!(
            &shards[5..],
            &[vec![12u8, 13], vec![10, 11], vec![14, 15], vec![90, 91], vec![94, 95]],
            "{:?}",
            encoder.simd_level()
        );
    }
}

#[test]
fn test_encode_is_systematic() {
    for construction in [Construction::Vandermonde, Construction::Cauchy] {
        for encoder in encoders(6, 3, construction) {
            let original = random_shards(6, 3, 777, 1);
            let mut shards = original.clone();
            encoder.encode(&mut shards).unwrap();
            assert_eq!(&shards[..6], &original[..6]);
            assert!(encoder.verify(&shards).unwrap());
        }
    }
}

#[test]
fn test_reconstruct_from_every_survivor_subset() {
    for construction in [Construction::Vandermonde, Construction::Cauchy] {
        for encoder in encoders(4, 3, construction) {
            let mut encoded = random_shards(4, 3, 100, 7);
            encoder.encode(&mut encoded).unwrap();

            for survivors in subsets(7, 4) {
                let mut shards: Vec<Option<Vec<u8>>> = encoded
                    .iter()
                    .enumerate()
                    .map(|(i, s)| survivors.contains(&i).then(|| s.clone()))
                    .collect();
                encoder.reconstruct(&mut shards).unwrap();

                let restored: Vec<Vec<u8>> = shards.into_iter().map(Option::unwrap).collect();
                assert_eq!(restored, encoded, "survivors {:?}", survivors);
            }
        }
    }
}

#[test]
fn test_reconstruct_data_leaves_parity_absent() {
    for encoder in encoders(5, 3, Construction::Vandermonde) {
        let mut encoded = random_shards(5, 3, 64, 3);
        encoder.encode(&mut encoded).unwrap();

        let mut shards: Vec<Option<Vec<u8>>> = encoded.iter().cloned().map(Some).collect();
        shards[1] = None;
        shards[6] = None;
        shards[7] = Some(Vec::new());
        encoder.reconstruct_data(&mut shards).unwrap();

        for i in 0..5 {
            assert_eq!(shards[i].as_ref(), Some(&encoded[i]));
        }
        assert!(shards[6].is_none());
        assert_eq!(shards[7].as_deref(), Some(&[][..]));
    }
}

#[test]
fn test_reconstruct_parity_matches_fresh_encode() {
    for encoder in encoders(7, 4, Construction::Cauchy) {
        let mut encoded = random_shards(7, 4, 300, 11);
        encoder.encode(&mut encoded).unwrap();

        let mut shards: Vec<Option<Vec<u8>>> = encoded.iter().cloned().map(Some).collect();
        for i in 7..11 {
            shards[i] = None;
        }
        encoder.reconstruct(&mut shards).unwrap();

        let restored: Vec<Vec<u8>> = shards.into_iter().flatten().collect();
        assert_eq!(restored, encoded);
    }
}

#[test]
fn test_reconstruct_nothing_missing_is_noop() {
    for encoder in encoders(3, 2, Construction::Vandermonde) {
        let mut encoded = random_shards(3, 2, 10, 5);
        encoder.encode(&mut encoded).unwrap();
        let mut shards: Vec<Option<Vec<u8>>> = encoded.iter().cloned().map(Some).collect();
        encoder.reconstruct(&mut shards).unwrap();
        assert_eq!(shards.into_iter().flatten().collect::<Vec<_>>(), encoded);
    }
}

#[test]
fn test_reconstruct_with_pos_exact_subset() {
    for encoder in encoders(5, 3, Construction::Vandermonde) {
        let mut encoded = random_shards(5, 3, 129, 21);
        encoder.encode(&mut encoded).unwrap();

        let mut shards = encoded.clone();
        shards[0].fill(0);
        shards[3].fill(0xAA);
        shards[6].fill(0);
        encoder
            .reconstruct_with_pos(&mut shards, &[1, 2, 4, 5, 7], &[0, 3], &[6])
            .unwrap();
        assert_eq!(shards, encoded);
    }
}

#[test]
fn test_reconstruct_with_pos_uses_first_survivors() {
    for encoder in encoders(3, 3, Construction::Vandermonde) {
        let mut encoded = random_shards(3, 3, 40, 2);
        encoder.encode(&mut encoded).unwrap();

        // Shard 5 is listed last and corrupted; only the first three are read
        let mut shards = encoded.clone();
        shards[1].fill(0);
        shards[5].fill(0x55);
        encoder
            .reconstruct_data_with_pos(&mut shards, &[4, 0, 2, 5], &[1])
            .unwrap();
        assert_eq!(shards[..3], encoded[..3]);
        assert_eq!(shards[5], vec![0x55; 40]);
    }
}

#[test]
fn test_reconstruct_data_with_pos_ignores_parity() {
    for encoder in encoders(4, 2, Construction::Cauchy) {
        let mut encoded = random_shards(4, 2, 50, 8);
        encoder.encode(&mut encoded).unwrap();

        let mut shards = encoded.clone();
        shards[2].fill(0);
        shards[5].fill(0x11);
        encoder
            .reconstruct_data_with_pos(&mut shards, &[0, 1, 3, 4], &[2])
            .unwrap();
        assert_eq!(shards[2], encoded[2]);
        assert_eq!(shards[5], vec![0x11; 50]);
    }
}

#[test]
fn test_encode_rejects_bad_shapes_without_writing() {
    for encoder in encoders(3, 2, Construction::Vandermonde) {
        let mut too_few = vec![vec![1u8; 4]; 4];
        assert_eq!(
            encoder.encode(&mut too_few),
            Err(RsError::WrongShardCount {
                expected: 5,
                actual: 4
            })
        );

        let mut uneven = vec![vec![1u8; 4], vec![2; 4], vec![3; 4], vec![9; 4], vec![9; 3]];
        let err = encoder.encode(&mut uneven).unwrap_err();
        assert_eq!(
            err,
            RsError::ShardSizeMismatch {
                index: 4,
                expected: 4,
                actual: 3
            }
        );
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
        assert_eq!(uneven[3], vec![9; 4], "parity written despite validation failure");

        let mut empty: Vec<Vec<u8>> = vec![Vec::new(); 5];
        assert_eq!(
            encoder.encode(&mut empty),
            Err(RsError::EmptyShard { index: 0 })
        );
    }
}

#[test]
fn test_reconstruct_too_many_losses() {
    for encoder in encoders(4, 2, Construction::Vandermonde) {
        let mut encoded = random_shards(4, 2, 16, 4);
        encoder.encode(&mut encoded).unwrap();

        let mut shards: Vec<Option<Vec<u8>>> = encoded.iter().cloned().map(Some).collect();
        shards[0] = None;
        shards[4] = None;
        shards[5] = None;
        let before = shards.clone();

        let err = encoder.reconstruct(&mut shards).unwrap_err();
        assert_eq!(err, RsError::InsufficientShards { lost: 3, parity: 2 });
        assert_eq!(err.kind(), ErrorKind::InsufficientShards);
        assert_eq!(shards, before);
    }
}

#[test]
fn test_reconstruct_mismatched_survivors() {
    for encoder in encoders(3, 2, Construction::Vandermonde) {
        let mut shards = vec![Some(vec![1u8; 8]), None, Some(vec![2; 8]), Some(vec![3; 7]), None];
        assert!(matches!(
            encoder.reconstruct(&mut shards),
            Err(RsError::ShardSizeMismatch { index: 3, .. })
        ));
    }
}

#[test]
fn test_reconstruct_with_pos_too_few_survivors_is_singular() {
    for encoder in encoders(3, 2, Construction::Vandermonde) {
        let mut encoded = random_shards(3, 2, 24, 13);
        encoder.encode(&mut encoded).unwrap();

        // One data shard lost is within parity, but two survivors cannot span it
        let mut shards = encoded.clone();
        shards[0].fill(0);
        let err = encoder
            .reconstruct_with_pos(&mut shards, &[1, 3], &[0], &[])
            .unwrap_err();
        assert_eq!(err, RsError::SingularMatrix, "{:?}", encoder.simd_level());
        assert_eq!(err.kind(), ErrorKind::SingularMatrix);

        let err = encoder
            .reconstruct_data_with_pos(&mut shards, &[4], &[0])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SingularMatrix);
    }
}

#[test]
fn test_reconstruct_with_pos_errors() {
    for encoder in encoders(3, 2, Construction::Vandermonde) {
        let mut shards = vec![vec![1u8; 8]; 5];

        let err = encoder
            .reconstruct_with_pos(&mut shards, &[0, 2], &[1], &[])
            .unwrap_err();
        assert_eq!(err, RsError::SingularMatrix);

        let err = encoder
            .reconstruct_with_pos(&mut shards, &[2, 2, 3], &[0], &[])
            .unwrap_err();
        assert_eq!(err, RsError::SingularMatrix);
        assert_eq!(err.kind(), ErrorKind::SingularMatrix);

        assert!(matches!(
            encoder.reconstruct_with_pos(&mut shards, &[0, 1, 2], &[], &[1]),
            Err(RsError::InvalidIndex { index: 1, .. })
        ));
        assert!(matches!(
            encoder.reconstruct_with_pos(&mut shards, &[0, 1, 2], &[], &[5]),
            Err(RsError::InvalidIndex { index: 5, .. })
        ));
        assert!(matches!(
            encoder.reconstruct_with_pos(&mut shards, &[0, 1, 2, 3], &[], &[4, 4]),
            Err(RsError::InvalidIndex { index: 4, .. })
        ));
    }
}

#[test]
fn test_verify_detects_corruption() {
    for encoder in encoders(4, 2, Construction::Vandermonde) {
        let mut shards = random_shards(4, 2, 1000, 9);
        encoder.encode(&mut shards).unwrap();
        assert!(encoder.verify(&shards).unwrap());

        shards[2][999] ^= 0x80;
        assert!(!encoder.verify(&shards).unwrap());
        assert!(encoder.verify(&shards[..5]).is_err());
    }
}

#[test]
fn test_large_shape() {
    let d = 200;
    let p = 55;
    let encoder = EncoderBuilder::new(d, p).build().unwrap();
    assert!(!encoder.caches_inverses());

    let mut encoded = random_shards(d, p, 33, 99);
    encoder.encode(&mut encoded).unwrap();

    let mut rng = StdRng::seed_from_u64(100);
    let mut shards: Vec<Option<Vec<u8>>> = encoded.iter().cloned().map(Some).collect();
    let mut removed = 0;
    while removed < p {
        let index = rng.random_range(0..d + p);
        if shards[index].take().is_some() {
            removed += 1;
        }
    }
    encoder.reconstruct(&mut shards).unwrap();
    assert_eq!(shards.into_iter().flatten().collect::<Vec<_>>(), encoded);
}
