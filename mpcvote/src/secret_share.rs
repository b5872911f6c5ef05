use crate::*;
use rand::Rng;
use rand_core::{CryptoRng, RngCore};

/// Split a secret into `n` additive shares that sum to the secret mod M.
///
/// The first `n - 1` shares are drawn uniformly from the field, the last one
/// balances the sum. Any `n - 1` shares are independent of the secret.
pub fn split<R: RngCore + CryptoRng>(
    rng: &mut R,
    secret: u64,
    n: usize,
) -> Result<Vec<u64>, Error> {
    if secret >= MODULUS {
        return Err(Error::SecretOutOfRange(secret));
    }
    if n == 0 {
        return Err(Error::InvalidCommitteeSize(n, 1));
    }

    let mut shares: Vec<u64> = Vec::with_capacity(n);
    for _ in 0..n - 1 {
        shares.push(rng.gen_range(0, MODULUS));
    }
    let last = sub_mod(secret, sum_mod(shares.iter().copied()));
    shares.push(last);

    Ok(shares)
}

/// Split a secret using the operating system's RNG
pub fn deal_shares(secret: u64, n: usize) -> Result<Vec<u64>, Error> {
    let mut csprng = rand::rngs::OsRng {};
    split(&mut csprng, secret, n)
}

/// Reconstruct a secret from all of its shares
pub fn reconstruct(shares: &[u64]) -> u64 {
    sum_mod(shares.iter().copied())
}

/// Reconstruct a total from the authorities' independently computed local sums.
///
/// Each local sum is itself a share of the total, so this is the same
/// operation as `reconstruct`. It is the entry point the tally uses.
pub fn reconstruct_from_local_sums(local_sums: &[u64]) -> u64 {
    reconstruct(local_sums)
}
