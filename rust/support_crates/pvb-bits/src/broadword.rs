//! Word-level helpers shared by the bit vector and the sequence codecs.

/// Index of the most significant set bit. `x` must be non-zero.
#[inline]
pub fn msb(x: u64) -> u32 {
    debug_assert_ne!(x, 0);
    63 - x.leading_zeros()
}

/// Smallest `b` such that `2^b >= x`; zero for `x <= 1`.
#[inline]
pub fn ceil_log2(x: u64) -> u32 {
    if x <= 1 { 0 } else { 64 - (x - 1).leading_zeros() }
}

/// Position of the `k`-th (zero based) set bit of `word`. `k` must be smaller than
/// `word.count_ones()`.
#[inline]
pub fn select_in_word(mut word: u64, k: u32) -> u32 {
    debug_assert!(k < word.count_ones());
    for _ in 0..k {
        word &= word - 1;
    }
    word.trailing_zeros()
}

/// Mask of the `len` lowest bits, `len <= 64`.
#[inline]
pub fn low_mask(len: u32) -> u64 {
    if len >= 64 { u64::MAX } else { (1u64 << len) - 1 }
}
