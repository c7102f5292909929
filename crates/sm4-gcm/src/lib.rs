//! SM4-GCM authenticated encryption.
//!
//! Counter-mode encryption with the [`sm4_core`] engines, authenticated by
//! GHASH over the associated data and ciphertext. Only 96-bit IVs are
//! supported; tags may be truncated to 4..=16 bytes. Tag comparison is
//! constant-time, the block cipher and field multiply are not.
//!
//! ```
//! use sm4_core::Sm4Key;
//! use sm4_gcm::Sm4Gcm;
//!
//! let gcm = Sm4Gcm::new(&Sm4Key::from([0u8; 16]));
//! let iv = [0u8; 12];
//! let (ct, tag) = gcm.encrypt(&iv, b"hello", b"header").unwrap();
//! let pt = gcm.decrypt(&iv, &ct, b"header", tag.as_bytes()).unwrap();
//! assert_eq!(pt, b"hello");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod gcm;
pub mod ghash;
mod sealed;

pub use crate::gcm::{Message, Sm4Gcm, Tag, IV_SIZE, MIN_TAG_SIZE, TAG_SIZE};
pub use crate::sealed::SealedMessage;
