//! Arithmetic over the prime field used for vote shares.
//!
//! All values handed out by these functions lie in `[0, MODULUS)`. Intermediate
//! results are widened to `u128` so no operation can overflow.

/// The field modulus, the Mersenne prime 2^61 - 1
pub const MODULUS: u64 = (1 << 61) - 1;

/// Reduce any integer into the field
pub fn reduce(x: u128) -> u64 {
    (x % MODULUS as u128) as u64
}

/// (a + b) mod M
pub fn add_mod(a: u64, b: u64) -> u64 {
    reduce(a as u128 + b as u128)
}

/// (a - b) mod M
pub fn sub_mod(a: u64, b: u64) -> u64 {
    let a = reduce(a as u128) as u128;
    let b = reduce(b as u128) as u128;
    reduce(a + MODULUS as u128 - b)
}

/// Sum of all values mod M
pub fn sum_mod<I>(values: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    values.into_iter().fold(0, add_mod)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce() {
        assert_eq!(reduce(0), 0);
        assert_eq!(reduce(MODULUS as u128), 0);
        assert_eq!(reduce(MODULUS as u128 + 5), 5);
        assert_eq!(reduce(u128::MAX), (u128::MAX % MODULUS as u128) as u64);
    }

    #[test]
    fn test_add_sub() {
        assert_eq!(add_mod(MODULUS - 1, 1), 0);
        assert_eq!(add_mod(MODULUS - 1, MODULUS - 1), MODULUS - 2);
        assert_eq!(sub_mod(0, 1), MODULUS - 1);
        assert_eq!(sub_mod(5, 3), 2);

        // Unreduced inputs are still handled
        assert_eq!(add_mod(u64::MAX, u64::MAX), reduce(2 * u64::MAX as u128));
        assert_eq!(sub_mod(u64::MAX, u64::MAX), 0);
    }

    #[test]
    fn test_sum_mod() {
        assert_eq!(sum_mod(Vec::<u64>::new()), 0);
        assert_eq!(sum_mod(vec![MODULUS - 1; 4]), MODULUS - 4);
        assert_eq!(sum_mod(vec![1, 2, 3]), 6);
    }
}
