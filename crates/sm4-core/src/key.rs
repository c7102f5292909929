//! Key types for SM4.

use core::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Number of cipher rounds, and of subkeys in a schedule.
pub const ROUNDS: usize = 32;

/// Key size in bytes.
pub const KEY_SIZE: usize = 16;

/// SM4 128-bit master key. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Sm4Key(pub(crate) [u8; KEY_SIZE]);

impl Sm4Key {
    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl From<[u8; KEY_SIZE]> for Sm4Key {
    fn from(value: [u8; KEY_SIZE]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for Sm4Key {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_SIZE] = value
            .try_into()
            .map_err(|_| Error::InvalidKeyLength { len: value.len() })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Sm4Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sm4Key(..)")
    }
}

/// Direction in which a schedule is consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Subkeys in schedule order.
    Encrypt,
    /// Subkeys in reverse order.
    Decrypt,
}

/// Expanded round keys for SM4.
///
/// Decryption walks the same 32 words backwards; no inverse schedule exists.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RoundKeys(pub(crate) [u32; ROUNDS]);

impl RoundKeys {
    /// Returns the subkey at the requested schedule position (0..32).
    #[inline]
    pub fn get(&self, round: usize) -> u32 {
        self.0[round]
    }

    /// Returns the subkey consumed by `round` when running in `direction`.
    #[inline]
    pub fn subkey(&self, direction: Direction, round: usize) -> u32 {
        match direction {
            Direction::Encrypt => self.0[round],
            Direction::Decrypt => self.0[ROUNDS - 1 - round],
        }
    }

    /// The full schedule in encryption order.
    pub fn as_words(&self) -> &[u32; ROUNDS] {
        &self.0
    }
}

impl fmt::Debug for RoundKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RoundKeys(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_key_rejects_wrong_length() {
        assert_eq!(
            Sm4Key::try_from(&[0u8; 15][..]),
            Err(Error::InvalidKeyLength { len: 15 })
        );
        assert_eq!(
            Sm4Key::try_from(&[0u8; 32][..]),
            Err(Error::InvalidKeyLength { len: 32 })
        );
        assert!(Sm4Key::try_from(&[7u8; 16][..]).is_ok());
    }

    #[test]
    fn decrypt_reads_schedule_backwards() {
        let keys = RoundKeys(core::array::from_fn(|i| i as u32));
        assert_eq!(keys.subkey(Direction::Encrypt, 0), 0);
        assert_eq!(keys.subkey(Direction::Decrypt, 0), 31);
        assert_eq!(keys.subkey(Direction::Decrypt, 31), 0);
    }

    #[test]
    fn debug_does_not_print_secrets() {
        let key = Sm4Key::from([0xab; 16]);
        assert_eq!(format!("{key:?}"), "Sm4Key(..)");
    }
}
