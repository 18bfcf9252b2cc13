//! Layout utilities.

/// Align a size down to the given power-of-two alignment.
#[inline]
pub const fn align_down(size: usize, align: usize) -> usize {
    size & !(align - 1)
}

/// Size-class index for a block of at least `size` bytes (`1 << class >= size`).
///
/// Returns `None` when no power of two can hold `size`.
#[inline]
pub fn ceil_log2(size: usize) -> Option<u32> {
    size.checked_next_power_of_two().map(|p| p.trailing_zeros())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_down() {
        assert_eq!(align_down(4095, 4096), 0);
        assert_eq!(align_down(8193, 4096), 8192);
    }

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(1), Some(0));
        assert_eq!(ceil_log2(32), Some(5));
        assert_eq!(ceil_log2(33), Some(6));
        assert_eq!(ceil_log2(usize::MAX), None);
    }
}
