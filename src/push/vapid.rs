//! VAPID key handling for Web Push (RFC 8292).
//!
//! The private key is kept as the raw 32-byte P-256 scalar (base64url),
//! which is the form `web_push::VapidSignatureBuilder::from_base64` expects.
//! SEC1 DER and PKCS#8 DER encodings are accepted on input and normalised.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::OsRng;
use thiserror::Error;

/// Errors raised while loading VAPID keys.
#[derive(Debug, Error)]
pub enum VapidError {
    #[error("invalid base64url for VAPID {0} key")]
    Encoding(&'static str),

    #[error("VAPID public key must be a 65-byte uncompressed P-256 point")]
    PublicKeyFormat,

    #[error("VAPID private key is not a raw P-256 scalar, SEC1 DER or PKCS#8 DER")]
    PrivateKeyFormat,

    #[error("VAPID public key does not match the private key")]
    KeyMismatch,
}

/// VAPID keypair used to sign push requests.
#[derive(Clone)]
pub struct VapidKeys {
    /// Raw 32-byte P-256 private key scalar (base64url).
    private_key_b64: String,
    /// Uncompressed public key bytes (base64url, 65 bytes decoded).
    public_key_b64: String,
}

impl std::fmt::Debug for VapidKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidKeys")
            .field("public_key_b64", &self.public_key_b64)
            .finish_non_exhaustive()
    }
}

impl VapidKeys {
    /// Generate a fresh VAPID keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(&signing_key)
    }

    fn from_signing_key(signing_key: &SigningKey) -> Self {
        // SEC1 uncompressed public key (65 bytes: 0x04 || x || y)
        let public_bytes = signing_key.verifying_key().to_encoded_point(false);
        Self {
            private_key_b64: BASE64URL.encode(&signing_key.to_bytes()[..]),
            public_key_b64: BASE64URL.encode(public_bytes.as_bytes()),
        }
    }

    /// Load a keypair from base64url-encoded strings.
    ///
    /// Validates the public key format, decodes the private key in any of the
    /// supported encodings, and checks that both halves belong together.
    pub fn from_base64url(public_key_b64: &str, private_key_b64: &str) -> Result<Self, VapidError> {
        let public_key_b64 = public_key_b64.trim();
        let pub_bytes = decode(public_key_b64).ok_or(VapidError::Encoding("public"))?;
        if pub_bytes.len() != 65 || pub_bytes[0] != 0x04 {
            return Err(VapidError::PublicKeyFormat);
        }

        let priv_bytes = decode(private_key_b64.trim()).ok_or(VapidError::Encoding("private"))?;
        let signing_key = parse_private_key(&priv_bytes)?;

        let keys = Self::from_signing_key(&signing_key);
        if keys.public_key_bytes() != Some(pub_bytes) {
            return Err(VapidError::KeyMismatch);
        }

        Ok(keys)
    }

    /// Base64url-encoded uncompressed public key.
    ///
    /// This is handed to browsers as the `applicationServerKey`.
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }

    /// Base64url-encoded raw 32-byte private key scalar.
    pub fn private_key_base64url(&self) -> &str {
        &self.private_key_b64
    }

    /// Uncompressed public key bytes (65 bytes).
    pub fn public_key_bytes(&self) -> Option<Vec<u8>> {
        BASE64URL.decode(&self.public_key_b64).ok()
    }
}

/// Decode base64url, tolerating trailing `=` padding.
fn decode(input: &str) -> Option<Vec<u8>> {
    BASE64URL.decode(input.trim_end_matches('=')).ok()
}

fn parse_private_key(bytes: &[u8]) -> Result<SigningKey, VapidError> {
    if bytes.len() == 32 {
        return SigningKey::from_bytes(bytes.into()).map_err(|_| VapidError::PrivateKeyFormat);
    }

    if let Ok(secret) = p256::SecretKey::from_sec1_der(bytes) {
        return Ok(SigningKey::from(secret));
    }

    use p256::pkcs8::DecodePrivateKey;
    SigningKey::from_pkcs8_der(bytes).map_err(|_| VapidError::PrivateKeyFormat)
}
