/// Aligns a number up to the next multiple of the specified alignment.
///
/// Returns `None` if the result does not fit in `usize`.
///
/// # Examples
///
/// ```
/// use ndshare_bytes::align::align_up;
///
/// assert_eq!(align_up(0, 8), Some(0));
/// assert_eq!(align_up(1, 8), Some(8));
/// assert_eq!(align_up(8, 8), Some(8));
/// assert_eq!(align_up(9, 64), Some(64));
/// assert_eq!(align_up(usize::MAX, 8), None);
/// ```
///
/// # Panics
///
/// Panics in debug builds if `alignment` is not a non-zero power of 2.
#[inline]
pub fn align_up(n: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());
    n.checked_add(alignment - 1).map(|n| n & !(alignment - 1))
}

/// Checks if a pointer address is a multiple of the specified alignment.
///
/// ```
/// use ndshare_bytes::align::is_ptr_aligned;
///
/// assert!(is_ptr_aligned(64 as *const u8, 8));
/// assert!(!is_ptr_aligned(4 as *const u8, 8));
/// ```
#[inline]
pub fn is_ptr_aligned<T>(ptr: *const T, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    (ptr as usize & (alignment - 1)) == 0
}
