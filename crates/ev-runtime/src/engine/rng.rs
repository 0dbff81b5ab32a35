pub(super) fn next_random_u32(state: &mut u32) -> u32 {
    let mut next = state.wrapping_add(0x6d2b79f5);
    *state = next;
    next = (next ^ (next >> 15)).wrapping_mul(next | 1);
    next ^= next.wrapping_add((next ^ (next >> 7)).wrapping_mul(next | 61));
    next ^ (next >> 14)
}

/// Uniform draw in `0..bound`, rejecting the biased tail of the u32 range.
pub(super) fn next_random_bounded(state: &mut u32, bound: u32) -> u32 {
    if bound <= 1 {
        return 0;
    }
    let threshold = (u64::from(u32::MAX) + 1) / u64::from(bound) * u64::from(bound);
    let mut candidate = next_random_u32(state);
    while u64::from(candidate) >= threshold {
        candidate = next_random_u32(state);
    }
    candidate % bound
}

/// Inclusive integer draw; swapped bounds are normalized.
pub(super) fn next_random_in_range(state: &mut u32, min: i64, max: i64) -> i64 {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    let span = (high - low).saturating_add(1).clamp(1, i64::from(u32::MAX)) as u32;
    low + i64::from(next_random_bounded(state, span))
}

#[cfg(test)]
mod rng_tests {
    use super::*;

    #[test]
    fn same_seed_gives_same_sequence() {
        let mut left = 7u32;
        let mut right = 7u32;
        let a = (0..5)
            .map(|_| next_random_u32(&mut left))
            .collect::<Vec<_>>();
        let b = (0..5)
            .map(|_| next_random_u32(&mut right))
            .collect::<Vec<_>>();
        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn ranges_are_inclusive_and_normalized() {
        let mut state = 11u32;
        for _ in 0..200 {
            let value = next_random_in_range(&mut state, 5, 2);
            assert!((2..=5).contains(&value));
        }
        assert_eq!(next_random_in_range(&mut state, 4, 4), 4);
        assert_eq!(next_random_bounded(&mut state, 1), 0);
    }
}
