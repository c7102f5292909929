//! SM4-GCM: counter-mode encryption authenticated with GHASH.
//!
//! A message moves through the states of the mode as types: binding a key
//! yields [`Sm4Gcm`], binding a 96-bit IV yields a single-use [`Message`], and
//! `Message::encrypt` / `Message::decrypt` consume it.

use core::fmt;
use std::sync::Arc;

use sm4_batch::{keystream, BatchScheduler};
use sm4_core::{
    expand_key, xor_in_place, Block, Direction, Engine, Error, Result, RoundKeys, Sm4Key,
};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::ghash::Ghash;

/// IV size in bytes. No other size is accepted.
pub const IV_SIZE: usize = 12;

/// Full tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Shortest tag that may be requested.
pub const MIN_TAG_SIZE: usize = 4;

const MAX_PLAINTEXT_LEN: u64 = (1 << 36) - 32;
const MAX_AAD_LEN: u64 = (1 << 61) - 1;

/// Authentication tag, possibly truncated.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    bytes: [u8; TAG_SIZE],
    len: usize,
}

impl Tag {
    /// The tag bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Tag length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; tags are at least [`MIN_TAG_SIZE`] bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for Tag {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tag(")?;
        for b in self.as_bytes() {
            write!(f, "{b:02x}")?;
        }
        f.write_str(")")
    }
}

/// SM4-GCM bound to a key.
///
/// Holds the round keys and the hash subkey `H = E_K(0^128)`; both are wiped on
/// drop. The block engine and an optional [`BatchScheduler`] for the keystream
/// are configurable and never change the output.
pub struct Sm4Gcm {
    round_keys: RoundKeys,
    hash_key: Zeroizing<Block>,
    engine: Engine,
    scheduler: Option<Arc<BatchScheduler>>,
    tag_len: usize,
}

impl Sm4Gcm {
    /// Derives the round keys and hash subkey for `key`.
    pub fn new(key: &Sm4Key) -> Self {
        let round_keys = expand_key(key);
        let engine = Engine::default();
        let hash_key =
            Zeroizing::new(engine.crypt_block(&[0u8; 16], &round_keys, Direction::Encrypt));
        tracing::debug!(%engine, "bound SM4-GCM key");
        Self {
            round_keys,
            hash_key,
            engine,
            scheduler: None,
            tag_len: TAG_SIZE,
        }
    }

    /// Like [`Sm4Gcm::new`] but from a slice; fails unless it is 16 bytes.
    pub fn new_from_slice(key: &[u8]) -> Result<Self> {
        Ok(Self::new(&Sm4Key::try_from(key)?))
    }

    /// Selects the block engine.
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Runs keystream generation on `scheduler`.
    pub fn with_scheduler(mut self, scheduler: Arc<BatchScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Truncates tags to `len` bytes, `MIN_TAG_SIZE..=TAG_SIZE`.
    pub fn with_tag_len(mut self, len: usize) -> Result<Self> {
        if !(MIN_TAG_SIZE..=TAG_SIZE).contains(&len) {
            return Err(Error::InvalidTagLength { len });
        }
        self.tag_len = len;
        Ok(self)
    }

    /// Configured block engine.
    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// Configured tag length in bytes.
    pub fn tag_len(&self) -> usize {
        self.tag_len
    }

    /// Binds a 96-bit IV and derives `J0 = IV || 0x00000001`.
    ///
    /// Other IV lengths are rejected: the hash-based `J0` derivation for them is
    /// not implemented.
    pub fn bind_iv(&self, iv: &[u8]) -> Result<Message<'_>> {
        if iv.len() != IV_SIZE {
            return Err(Error::InvalidIvLength { len: iv.len() });
        }
        let mut j0 = [0u8; 16];
        j0[..IV_SIZE].copy_from_slice(iv);
        j0[15] = 1;
        Ok(Message { cipher: self, j0 })
    }

    /// Encrypts `plaintext` and authenticates it together with `aad`.
    pub fn encrypt(&self, iv: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<(Vec<u8>, Tag)> {
        self.bind_iv(iv)?.encrypt(plaintext, aad)
    }

    /// Verifies `tag` and decrypts `ciphertext`.
    pub fn decrypt(
        &self,
        iv: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>> {
        self.bind_iv(iv)?.decrypt(ciphertext, aad, tag)
    }

    /// Like [`Sm4Gcm::decrypt`] but reports a tag mismatch as `(empty, false)`.
    /// Configuration errors are still returned as `Err`.
    pub fn decrypt_verified(
        &self,
        iv: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
        tag: &[u8],
    ) -> Result<(Vec<u8>, bool)> {
        match self.decrypt(iv, ciphertext, aad, tag) {
            Ok(plaintext) => Ok((plaintext, true)),
            Err(Error::AuthenticationFailed) => Ok((Vec::new(), false)),
            Err(e) => Err(e),
        }
    }

    fn apply_keystream(&self, counter: &Block, data: &mut [u8]) {
        match &self.scheduler {
            Some(scheduler) => {
                scheduler.apply_keystream(self.engine, &self.round_keys, counter, data)
            }
            None => keystream::apply_keystream(self.engine, &self.round_keys, counter, 0, data),
        }
    }

    fn compute_tag(&self, j0: &Block, aad: &[u8], ciphertext: &[u8]) -> Tag {
        let mut ghash = Ghash::new(&self.hash_key);
        ghash.update_padded(aad);
        ghash.update_padded(ciphertext);
        let mut bytes = ghash.finalize(aad.len() as u64, ciphertext.len() as u64);
        let mask = self
            .engine
            .crypt_block(j0, &self.round_keys, Direction::Encrypt);
        xor_in_place(&mut bytes, &mask);
        Tag {
            bytes,
            len: self.tag_len,
        }
    }
}

impl fmt::Debug for Sm4Gcm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sm4Gcm")
            .field("engine", &self.engine)
            .field("scheduler", &self.scheduler)
            .field("tag_len", &self.tag_len)
            .finish_non_exhaustive()
    }
}

/// A single-use message context bound to one IV.
#[derive(Debug)]
pub struct Message<'a> {
    cipher: &'a Sm4Gcm,
    j0: Block,
}

impl Message<'_> {
    /// Pre-counter block `J0`.
    pub fn j0(&self) -> &Block {
        &self.j0
    }

    /// First keystream counter, `inc32(J0)`.
    fn first_counter(&self) -> Block {
        keystream::counter_at(&self.j0, 1)
    }

    /// Encrypts and returns the ciphertext (same length as `plaintext`) and tag.
    pub fn encrypt(self, plaintext: &[u8], aad: &[u8]) -> Result<(Vec<u8>, Tag)> {
        check_lengths(plaintext.len(), aad.len())?;
        let mut ciphertext = plaintext.to_vec();
        self.cipher
            .apply_keystream(&self.first_counter(), &mut ciphertext);
        let tag = self.cipher.compute_tag(&self.j0, aad, &ciphertext);
        Ok((ciphertext, tag))
    }

    /// Verifies `tag` over `aad` and `ciphertext`, then decrypts.
    ///
    /// The tag is checked in constant time before any plaintext is produced;
    /// on mismatch nothing is decrypted and [`Error::AuthenticationFailed`] is
    /// returned.
    pub fn decrypt(self, ciphertext: &[u8], aad: &[u8], tag: &[u8]) -> Result<Vec<u8>> {
        if tag.len() != self.cipher.tag_len {
            return Err(Error::InvalidTagLength { len: tag.len() });
        }
        check_lengths(ciphertext.len(), aad.len())?;
        let expected = self.cipher.compute_tag(&self.j0, aad, ciphertext);
        if !bool::from(expected.as_bytes().ct_eq(tag)) {
            tracing::debug!("SM4-GCM tag mismatch");
            return Err(Error::AuthenticationFailed);
        }
        let mut plaintext = ciphertext.to_vec();
        self.cipher
            .apply_keystream(&self.first_counter(), &mut plaintext);
        Ok(plaintext)
    }
}

fn check_lengths(text_len: usize, aad_len: usize) -> Result<()> {
    if text_len as u64 > MAX_PLAINTEXT_LEN || aad_len as u64 > MAX_AAD_LEN {
        return Err(Error::MessageTooLong);
    }
    Ok(())
}
