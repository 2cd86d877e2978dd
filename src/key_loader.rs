//! Private signing key loading.

use crate::algorithm::KeyFamily;
use crate::constants::{ENCRYPTED_PRIVATE_KEY_TYPE, MIN_RSA_KEY_BITS, PRIVATE_KEY_SUFFIX};
use crate::error::{PolicyError, Result};
use crate::pem_blocks;
use openssl::pkey::{PKey, Private};
use std::fmt;

/// A decoded private key together with its family and size.
pub struct SigningKey {
    key: PKey<Private>,
    family: KeyFamily,
    bits: u32,
}

impl SigningKey {
    /// Decode the single private-key PEM block in `bytes` and require it to
    /// belong to `expected`.
    ///
    /// Accepts PKCS#8 `PRIVATE KEY` as well as the PKCS#1 `RSA PRIVATE KEY`
    /// and SEC1 `EC PRIVATE KEY` forms. Certificates or other blocks in the
    /// same file are ignored. Encrypted keys are refused; the body is decoded
    /// as DER, so no passphrase prompt can ever be triggered.
    pub fn load(bytes: &[u8], expected: KeyFamily) -> Result<Self> {
        let mut key_blocks = pem_blocks::parse_blocks(bytes)
            .into_iter()
            .filter(|block| block.label.ends_with(PRIVATE_KEY_SUFFIX));
        let block = match (key_blocks.next(), key_blocks.next()) {
            (Some(block), None) => block,
            (None, _) => {
                return Err(PolicyError::InvalidKey(
                    "no private key block found".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(PolicyError::InvalidKey(
                    "more than one private key block found".to_string(),
                ))
            }
        };
        if block.label == ENCRYPTED_PRIVATE_KEY_TYPE {
            return Err(PolicyError::InvalidKey(
                "encrypted private keys are not supported".to_string(),
            ));
        }
        let der = block.contents.map_err(PolicyError::InvalidKey)?;
        let key = PKey::private_key_from_der(&der)
            .map_err(|e| PolicyError::InvalidKey(format!("{}: {}", block.label, e)))?;
        let signing_key = Self::from_pkey(key);

        if signing_key.family != expected {
            return Err(PolicyError::KeyFamilyMismatch {
                expected,
                found: signing_key.family,
            });
        }
        if signing_key.family == KeyFamily::Rsa && signing_key.bits < MIN_RSA_KEY_BITS {
            return Err(PolicyError::InvalidKey(format!(
                "RSA key is {} bits, minimum is {}",
                signing_key.bits, MIN_RSA_KEY_BITS
            )));
        }
        tracing::debug!(family = %signing_key.family, bits = signing_key.bits, "loaded private key");
        Ok(signing_key)
    }

    /// Wrap an already decoded key without family or size checks.
    pub fn from_pkey(key: PKey<Private>) -> Self {
        let family = KeyFamily::from_id(key.id());
        let bits = key.bits();
        Self { key, family, bits }
    }

    pub fn family(&self) -> KeyFamily {
        self.family
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub(crate) fn pkey(&self) -> &PKey<Private> {
        &self.key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("family", &self.family)
            .field("bits", &self.bits)
            .field("key", &"<redacted>")
            .finish()
    }
}
