//! Arweave JWK wallet.
//!
//! Loads a 4096-bit RSA key from a JWK keyfile and signs with RSA-PSS
//! (SHA-256, 32-byte salt). The wallet address is the base64url SHA-256 of
//! the public modulus.

use std::fmt;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::pss::{BlindedSigningKey, Signature, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{BigUint, RsaPrivateKey};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::GatewayError;

/// Length of the public modulus (and of every signature) in bytes.
pub const OWNER_LEN: usize = 512;

#[derive(Deserialize)]
struct Jwk {
    kty: String,
    n: String,
    e: String,
    d: String,
    p: String,
    q: String,
}

/// A loaded signing wallet.
pub struct Wallet {
    key: RsaPrivateKey,
    owner: Vec<u8>,
    address: String,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Wallet {
    /// Reads a JWK keyfile.
    pub fn from_file(path: &Path) -> Result<Self, GatewayError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Wallet(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_jwk_json(&content)
    }

    pub fn from_jwk_json(json: &str) -> Result<Self, GatewayError> {
        let jwk: Jwk = serde_json::from_str(json)
            .map_err(|e| GatewayError::Wallet(format!("not a JWK keyfile: {e}")))?;
        if jwk.kty != "RSA" {
            return Err(GatewayError::Wallet(format!(
                "unsupported key type {:?}",
                jwk.kty
            )));
        }

        let owner = decode_field("n", &jwk.n)?;
        if owner.len() != OWNER_LEN {
            return Err(GatewayError::Wallet(format!(
                "expected a {}-bit key, got {} bits",
                OWNER_LEN * 8,
                owner.len() * 8
            )));
        }

        let big = |name: &str, value: &str| {
            decode_field(name, value).map(|bytes| BigUint::from_bytes_be(&bytes))
        };
        let key = RsaPrivateKey::from_components(
            BigUint::from_bytes_be(&owner),
            big("e", &jwk.e)?,
            big("d", &jwk.d)?,
            vec![big("p", &jwk.p)?, big("q", &jwk.q)?],
        )
        .map_err(|e| GatewayError::Wallet(format!("invalid key: {e}")))?;

        let address = URL_SAFE_NO_PAD.encode(Sha256::digest(&owner));
        tracing::debug!(address = %address, "wallet loaded");

        Ok(Self {
            key,
            owner,
            address,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Raw public modulus, as embedded in data items.
    pub fn owner(&self) -> &[u8] {
        &self.owner
    }

    /// Signs `message` with RSA-PSS.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, GatewayError> {
        let signing_key = BlindedSigningKey::<Sha256>::new(self.key.clone());
        let signature = signing_key
            .try_sign_with_rng(&mut rand::thread_rng(), message)
            .map_err(|e| GatewayError::Wallet(format!("signing failed: {e}")))?;
        Ok(signature.to_vec())
    }

    /// Checks a signature produced by [`Wallet::sign`].
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let verifying_key = VerifyingKey::<Sha256>::new(self.key.to_public_key());
        Signature::try_from(signature)
            .map(|sig| verifying_key.verify(message, &sig).is_ok())
            .unwrap_or(false)
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, GatewayError> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| GatewayError::Wallet(format!("invalid JWK field {name}: {e}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::OnceLock;

    pub(crate) const TEST_WALLET: &str = include_str!("../testdata/test-wallet.json");
    pub(crate) const TEST_ADDRESS: &str = "EBTH-yP67HdGaNrZdbVgjrl6XjmKOHyu5TeolCY1bT0";

    /// Shared wallet; key validation is slow in debug builds.
    pub(crate) fn test_wallet() -> &'static Wallet {
        static WALLET: OnceLock<Wallet> = OnceLock::new();
        WALLET.get_or_init(|| Wallet::from_jwk_json(TEST_WALLET).unwrap())
    }

    #[test]
    fn address_is_hash_of_modulus() {
        let wallet = test_wallet();
        assert_eq!(wallet.address(), TEST_ADDRESS);
        assert_eq!(wallet.owner().len(), OWNER_LEN);
    }

    #[test]
    fn sign_and_verify() {
        let wallet = test_wallet();
        let signature = wallet.sign(b"message").unwrap();
        assert_eq!(signature.len(), OWNER_LEN);
        assert!(wallet.verify(b"message", &signature));
        assert!(!wallet.verify(b"other", &signature));
    }

    #[test]
    fn from_file_reads_keyfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        std::fs::write(&path, TEST_WALLET).unwrap();
        let wallet = Wallet::from_file(&path).unwrap();
        assert_eq!(wallet.address(), TEST_ADDRESS);
    }

    #[test]
    fn missing_file_is_wallet_error() {
        let err = Wallet::from_file(Path::new("/nonexistent/wallet.json")).unwrap_err();
        assert!(matches!(err, GatewayError::Wallet(_)));
    }

    #[test]
    fn rejects_non_rsa_and_garbage() {
        assert!(matches!(
            Wallet::from_jwk_json("not json"),
            Err(GatewayError::Wallet(_))
        ));
        let ec = r#"{"kty":"EC","n":"","e":"","d":"","p":"","q":""}"#;
        assert!(matches!(Wallet::from_jwk_json(ec), Err(GatewayError::Wallet(_))));
    }

    #[test]
    fn rejects_short_modulus() {
        let short = r#"{"kty":"RSA","n":"AQAB","e":"AQAB","d":"AQAB","p":"AQAB","q":"AQAB"}"#;
        let err = Wallet::from_jwk_json(short).unwrap_err();
        assert!(err.to_string().contains("4096-bit"));
    }

    #[test]
    fn debug_hides_key() {
        let debug = format!("{:?}", test_wallet());
        assert!(debug.contains(TEST_ADDRESS));
        assert!(!debug.contains("BigUint"));
    }
}
