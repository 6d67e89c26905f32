use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;

/// An opaque password-reset secret.
///
/// The raw value is sent to the account holder once and never stored;
/// the database keeps only the fingerprint. Redemption recomputes the
/// fingerprint from whatever raw value the client presents and matches
/// on that.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetSecret {
    /// Hex-encoded random token, 64 characters. Goes into the reset URL.
    pub raw: String,

    /// SHA-256 of `raw`, lower-hex. The only part that is persisted.
    pub fingerprint: String,
}

impl ResetSecret {
    /// Generate a fresh secret from 32 bytes of OS randomness.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);

        let raw = hex::encode(bytes);
        let fingerprint = fingerprint(&raw);

        Self { raw, fingerprint }
    }
}

/// Fingerprint a raw reset secret.
///
/// Deterministic SHA-256, lower-hex. Unlike password digests there is no
/// salt: the input already carries 256 bits of entropy, and lookups need
/// equality on the stored value.
pub fn fingerprint(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
