/// Aligns a number up to the next multiple of the specified alignment.
///
/// # Panics
///
/// In debug builds, if `alignment` is zero or not a power of two.
#[inline]
pub fn align_up_u64(n: u64, alignment: u64) -> u64 {
    debug_assert_ne!(alignment, 0);
    debug_assert!(alignment.is_power_of_two());
    (n + alignment - 1) & !(alignment - 1)
}

/// Number of padding bits needed to bring `n` to the next multiple of `alignment`.
#[inline]
pub fn padding_u64(n: u64, alignment: u64) -> u64 {
    align_up_u64(n, alignment) - n
}

#[cfg(test)]
mod tests {
    use super::{align_up_u64, padding_u64};

    #[test]
    fn test_align_up() {
        assert_eq!(align_up_u64(0, 8), 0);
        assert_eq!(align_up_u64(1, 8), 8);
        assert_eq!(align_up_u64(8, 8), 8);
        assert_eq!(align_up_u64(65, 64), 128);
        assert_eq!(padding_u64(13, 8), 3);
        assert_eq!(padding_u64(16, 8), 0);
    }
}
