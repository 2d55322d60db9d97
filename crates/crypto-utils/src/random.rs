use rand::RngCore;
use rand_core::OsRng;
use zeroize::Zeroize;

use crate::zeroizing::SecretBytes;

/// Generates a fixed-size array of cryptographically secure random bytes.
pub fn random_bytes_fixed<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Generates `N` secure random bytes directly into a zeroizing container,
/// so no unprotected copy of the secret outlives this call.
pub fn random_secret<const N: usize>() -> SecretBytes<N> {
    let mut buf = random_bytes_fixed::<N>();
    let secret = SecretBytes::new(buf);
    buf.zeroize();
    secret
}
