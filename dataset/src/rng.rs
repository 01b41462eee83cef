use rand::{rngs::StdRng, SeedableRng};
use sha2::{Digest, Sha256};

/// Builds a generator whose stream depends only on `seed`.
///
/// The seed string is hashed with SHA-256 and the digest used as the 32-byte
/// generator seed, so any string (including the empty one) is a valid seed.
pub fn seeded_rng(seed: &str) -> StdRng {
    let digest = Sha256::digest(seed.as_bytes());
    let mut bytes = <StdRng as SeedableRng>::Seed::default();
    bytes.copy_from_slice(&digest);
    StdRng::from_seed(bytes)
}
