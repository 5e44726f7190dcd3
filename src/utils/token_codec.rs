use sha2::{Digest, Sha256};
use rand::{rngs::OsRng, RngCore};
use crate::model::token::{RawToken, TokenDigest};

/// 32 bytes = 256 bits of entropy per token.
pub const TOKEN_BYTES: usize = 32;

///
/// Mints reset tokens and derives the digest they are stored under.
///
/// No key material is involved - the digest is only as strong as the token's entropy, which is
/// why raw tokens come straight from the operating system's CSPRNG.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenCodec;

impl TokenCodec {
    ///
    /// URL-safe base64 (no padding) of TOKEN_BYTES random bytes - 43 characters.
    ///
    pub fn generate_raw_token(&self) -> RawToken {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        RawToken::new(base64::encode_config(bytes, base64::URL_SAFE_NO_PAD))
    }

    ///
    /// Lower-case hex SHA-256 - always 64 characters.
    ///
    pub fn digest(&self, raw: &RawToken) -> TokenDigest {
        let mut hasher = Sha256::new();
        hasher.update(raw.expose().as_bytes());
        TokenDigest::new(hex::encode(hasher.finalize()))
    }
}
