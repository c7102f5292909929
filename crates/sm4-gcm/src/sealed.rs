//! Serialized container for an authenticated message.

use serde::{Deserialize, Serialize};
use sm4_core::{Error, Result};

use crate::gcm::{Sm4Gcm, IV_SIZE};

/// IV, associated data, ciphertext and tag, stored together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedMessage {
    /// Container format version.
    pub version: u32,
    /// 96-bit IV used for this message.
    pub iv: [u8; IV_SIZE],
    /// Associated data (authenticated, not encrypted).
    pub aad: Vec<u8>,
    /// Ciphertext, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// Authentication tag.
    pub tag: Vec<u8>,
}

impl SealedMessage {
    /// Version written by this build.
    pub const VERSION: u32 = 1;

    /// Encrypts `plaintext` under `cipher` and packs the result.
    pub fn seal(
        cipher: &Sm4Gcm,
        iv: [u8; IV_SIZE],
        plaintext: &[u8],
        aad: Vec<u8>,
    ) -> Result<Self> {
        let (ciphertext, tag) = cipher.encrypt(&iv, plaintext, &aad)?;
        Ok(Self {
            version: Self::VERSION,
            iv,
            aad,
            ciphertext,
            tag: tag.as_bytes().to_vec(),
        })
    }

    /// Verifies and decrypts the message.
    pub fn open(&self, cipher: &Sm4Gcm) -> Result<Vec<u8>> {
        if self.version != Self::VERSION {
            return Err(Error::UnsupportedVersion {
                version: self.version,
            });
        }
        cipher.decrypt(&self.iv, &self.ciphertext, &self.aad, &self.tag)
    }

    /// Serializes the container with `bincode`.
    pub fn to_bytes(&self) -> core::result::Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserializes a container with `bincode`.
    pub fn from_bytes(bytes: &[u8]) -> core::result::Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sm4_core::Sm4Key;

    #[test]
    fn serialize_roundtrip_and_open() {
        let gcm = Sm4Gcm::new(&Sm4Key::from([9u8; 16]));
        let sealed = SealedMessage::seal(&gcm, [1u8; IV_SIZE], b"payload", b"meta".to_vec())
            .expect("seal");
        let bytes = sealed.to_bytes().expect("serialize");
        let decoded = SealedMessage::from_bytes(&bytes).expect("deserialize");
        assert_eq!(decoded, sealed);
        assert_eq!(decoded.open(&gcm).expect("open"), b"payload");
    }

    #[test]
    fn unknown_version_is_rejected() {
        let gcm = Sm4Gcm::new(&Sm4Key::from([9u8; 16]));
        let mut sealed =
            SealedMessage::seal(&gcm, [1u8; IV_SIZE], b"payload", Vec::new()).expect("seal");
        sealed.version = 7;
        assert_eq!(
            sealed.open(&gcm),
            Err(Error::UnsupportedVersion { version: 7 })
        );
    }

    #[test]
    fn tampered_aad_fails() {
        let gcm = Sm4Gcm::new(&Sm4Key::from([9u8; 16]));
        let mut sealed =
            SealedMessage::seal(&gcm, [1u8; IV_SIZE], b"payload", b"meta".to_vec()).expect("seal");
        sealed.aad[0] ^= 0x80;
        assert_eq!(sealed.open(&gcm), Err(Error::AuthenticationFailed));
    }

    #[test]
    fn truncated_tag_is_rejected() {
        let gcm = Sm4Gcm::new(&Sm4Key::from([9u8; 16]));
        let mut sealed =
            SealedMessage::seal(&gcm, [1u8; IV_SIZE], b"payload", b"meta".to_vec()).expect("seal");
        sealed.tag.truncate(4);
        assert_eq!(sealed.open(&gcm), Err(Error::InvalidTagLength { len: 4 }));
    }
}
