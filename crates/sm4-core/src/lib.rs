//! SM4 block cipher engine.
//!
//! This crate provides:
//! - The SM4 key schedule (32 subkeys from a 128-bit key).
//! - A scalar reference transform built from the S-box and diffusion layer.
//! - A fused-table transform using four process-wide lookup tables.
//! - An eight-lane batch transform over the same tables.
//! - [`Engine`], selecting between the three, and a conformance checker that
//!   compares them.
//!
//! All engines are bit-identical. None of them is constant-time: table lookups
//! are indexed by secret data.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod block;
mod cipher;
pub mod conformance;
mod engine;
mod error;
mod key;
mod round;
mod sbox;
pub mod tables;
pub mod vector;

pub use crate::block::{xor_in_place, Block, BLOCK_SIZE};
pub use crate::cipher::{crypt_block, decrypt_block, encrypt_block, expand_key};
pub use crate::engine::{Engine, ParseEngineError};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::key::{Direction, RoundKeys, Sm4Key, KEY_SIZE, ROUNDS};
pub use crate::round::{key_function, l_key, l_round, round_function};
pub use crate::sbox::{sbox, tau};
pub use crate::tables::{round_tables, table_round_function, RoundTables};
pub use crate::vector::{Lanes, LANES};
