//! Deterministic cryptographic fixtures for testing
//!
//! Two fixed 2048-bit RSA keypairs, stored as PEM files under `fixtures/`.
//! Keys are never generated at test time, so every run signs with the same
//! material and the public halves below are stable.

use jsonwebtoken::EncodingKey;
use serde_json::json;

/// Public exponent shared by both fixture keys (65537).
const RSA_EXPONENT: &str = "AQAB";

const K1_PRIVATE_PEM: &str = include_str!("../fixtures/test-key-k1.pem");
const K1_MODULUS: &str = "5XV1HX4pmGB1xhqFly79hryC7H1EWl1CJPsrHnhvfssqx5Qam-Pld8E5LeiSt6nRprs1XaVDq9A9b7uHY4AjYX1yCxIQSvr8wMX0V0qUHrVqpO5W0O6EVJ6CEpj6NziggFUnajrhIy7hbJRTe_12oJFrS7K2CaS9yKYYtio89NI6vTLVOAWeIitbXBo7Yx2mBwYkhFpnJ5ZNxF2Ah4yfX0TQAdP24OvxCu-F2UsSGBnMY05g6UiSbSF4KK2tUE0_KMEmEgyDYvJS8ot8ULxTKvTrvdm6jLO6poi7BaGtakVotAc24z970Zfgm1kmcwPK_XVzKXzGjQ9Eq99UuhcLtw";

const K2_PRIVATE_PEM: &str = include_str!("../fixtures/test-key-k2.pem");
const K2_MODULUS: &str = "tdEBHZa0WZB6Tzn8Id5yCabMmCBNHjGK0MYt4LgWX6f_9eac9DLiX5m5Xku2pNOHRZ-5rF3iJkX-tBtMlUHgtWyxR-4PJ3TYFca14lrNDm6GEdionZY3t684jFjEcqu8nu-Dyb0YDhmmLKLAWI4fK4LLQyPfngEi6fOBbIg_lAqabjRuTsiGgnFAFj8Kdj9_zNlaCyv_eRjBL3lmfcHOAIfZH5Qu8ZnpGSzzxBBUJZeUKMQ4bHKypDwvyoF25-8LACJ1hYNUlFEISGm1gXu36Am9zQDR2IJpNR4UTyM6JdMBYtsW5RwMnVuqOxADxaAbeTTkwCeZCoYiYvJ4rI8Ldw";

/// An RSA signing key with its published JWK half.
///
/// # Example
/// ```rust,ignore
/// let keypair = TestKeypair::k1();
/// let jwks = serde_json::json!({ "keys": [keypair.jwk()] });
/// ```
#[derive(Debug, Clone)]
pub struct TestKeypair {
    kid: &'static str,
    private_pem: &'static str,
    modulus: &'static str,
}

impl TestKeypair {
    /// Primary fixture key, `kid = "K1"`.
    pub fn k1() -> Self {
        Self {
            kid: "K1",
            private_pem: K1_PRIVATE_PEM,
            modulus: K1_MODULUS,
        }
    }

    /// Second fixture key, `kid = "K2"`. Useful as an impostor or a rotated key.
    pub fn k2() -> Self {
        Self {
            kid: "K2",
            private_pem: K2_PRIVATE_PEM,
            modulus: K2_MODULUS,
        }
    }

    pub fn kid(&self) -> &str {
        self.kid
    }

    /// Base64url modulus (`n`).
    pub fn modulus(&self) -> &str {
        self.modulus
    }

    /// Base64url public exponent (`e`).
    pub fn exponent(&self) -> &str {
        RSA_EXPONENT
    }

    /// Signing key for `jsonwebtoken::encode`.
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_rsa_pem(self.private_pem.as_bytes())
            .expect("fixture PEM should be a valid RSA private key")
    }

    /// The key as it appears in a key-discovery document.
    pub fn jwk(&self) -> serde_json::Value {
        json!({
            "kty": "RSA",
            "kid": self.kid,
            "use": "sig",
            "alg": "RS256",
            "n": self.modulus,
            "e": RSA_EXPONENT,
        })
    }
}

/// A key-discovery document publishing `keypairs`.
pub fn jwks_document(keypairs: &[&TestKeypair]) -> serde_json::Value {
    json!({ "keys": keypairs.iter().map(|k| k.jwk()).collect::<Vec<_>>() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, Header, Validation};

    #[test]
    fn test_fixture_keys_load() {
        let _ = TestKeypair::k1().encoding_key();
        let _ = TestKeypair::k2().encoding_key();
    }

    #[test]
    fn test_published_half_verifies_private_half() {
        for keypair in [TestKeypair::k1(), TestKeypair::k2()] {
            let claims = json!({"sub": "fixture", "exp": 4_102_444_800_i64});
            let token = encode(
                &Header::new(Algorithm::RS256),
                &claims,
                &keypair.encoding_key(),
            )
            .unwrap();

            let decoding_key =
                DecodingKey::from_rsa_components(keypair.modulus(), keypair.exponent()).unwrap();
            let decoded =
                decode::<serde_json::Value>(&token, &decoding_key, &Validation::new(Algorithm::RS256))
                    .unwrap();
            assert_eq!(decoded.claims["sub"], "fixture");
        }
    }

    #[test]
    fn test_keys_are_distinct() {
        assert_ne!(TestKeypair::k1().modulus(), TestKeypair::k2().modulus());
        assert_ne!(TestKeypair::k1().kid(), TestKeypair::k2().kid());
    }

    #[test]
    fn test_jwks_document_shape() {
        let doc = jwks_document(&[&TestKeypair::k1(), &TestKeypair::k2()]);
        let keys = doc["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0]["kid"], "K1");
        assert_eq!(keys[1]["kty"], "RSA");
    }
}
