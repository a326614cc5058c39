use pvb_codecs::{
    BlockCodec, InterpolativeBlock, StreamVByteBlock, VByteBlock, VarIntG8iuBlock, VarIntGbBlock,
};

fn random_run(rng: &mut fastrand::Rng, n: usize, max_bits: u32) -> Vec<u32> {
    (0..n)
        .map(|_| {
            let bits = rng.u32(0..=max_bits);
            if bits == 0 { 0 } else { rng.u32(..) >> (32 - bits) }
        })
        .collect()
}

fn check_codec<C: BlockCodec>() {
    let mut rng = fastrand::Rng::with_seed(0x5eed ^ C::KIND as u64);
    for n in [1usize, 2, 7, 8, 9, 127, 128, 129] {
        for max_bits in [0u32, 3, 12, 24] {
            let values = random_run(&mut rng, n, max_bits);
            let sum = values.iter().map(|&v| v as u64).sum::<u64>();
            let hints = if sum <= u32::MAX as u64 {
                vec![None, Some(sum as u32)]
            } else {
                vec![None]
            };
            for hint in hints {
                let mut out = vec![0xee];
                C::encode(&values, hint, &mut out).unwrap();
                let encoded = &out[1..];
                let mut decoded = vec![0u32; n];
                let consumed = C::decode(encoded, &mut decoded, hint).unwrap();
                assert_eq!(consumed, encoded.len(), "{} n={n}", C::KIND);
                assert_eq!(decoded, values, "{} n={n}", C::KIND);

                // trailing bytes belong to whatever follows the block
                let mut padded = encoded.to_vec();
                padded.extend_from_slice(&[0xab; 16]);
                assert_eq!(C::decode(&padded, &mut decoded, hint).unwrap(), consumed);

                if !encoded.is_empty() {
                    let truncated = &encoded[..encoded.len() - 1];
                    assert!(C::decode(truncated, &mut decoded, hint).is_err(), "{} n={n}", C::KIND);
                }
            }
        }
    }
}

#[test]
fn test_vbyte() {
    check_codec::<VByteBlock>();
}

#[test]
fn test_varint_gb() {
    check_codec::<VarIntGbBlock>();
}

#[test]
fn test_varint_g8iu() {
    check_codec::<VarIntG8iuBlock>();
}

#[test]
fn test_stream_vbyte() {
    check_codec::<StreamVByteBlock>();
}

#[test]
fn test_interpolative() {
    check_codec::<InterpolativeBlock>();
}

#[test]
fn test_short_runs_use_interpolative() {
    let values = (0..100u32).map(|i| i % 3).collect::<Vec<_>>();
    let mut gb = Vec::new();
    VarIntGbBlock::encode(&values, None, &mut gb).unwrap();
    let mut interpolative = Vec::new();
    InterpolativeBlock::encode(&values, None, &mut interpolative).unwrap();
    assert_eq!(gb, interpolative);

    let full = (0..128u32).collect::<Vec<_>>();
    let mut gb = Vec::new();
    VarIntGbBlock::encode(&full, None, &mut gb).unwrap();
    assert_eq!(gb.len(), 32 + 128);
}

#[test]
fn test_cost_is_monotone_in_gap() {
    fn monotone<C: BlockCodec>() {
        let mut prev = 0;
        for shift in 0..32 {
            let cost = C::posting_cost(1000 + (1u64 << shift), 1000);
            assert!(cost >= prev, "{}", C::KIND);
            prev = cost;
        }
        assert!(C::posting_cost(1000, 1000) > 0);
    }
    monotone::<VByteBlock>();
    monotone::<VarIntGbBlock>();
    monotone::<VarIntG8iuBlock>();
    monotone::<StreamVByteBlock>();
    monotone::<InterpolativeBlock>();
}
