//! Fused substitution + diffusion lookup tables.
//!
//! `T(x) = L(τ(x))` splits over the four bytes of `x` because `L` is linear.
//! Table `j` holds `L(S(b) << (24 - 8j))` for byte position `j` (most significant
//! first), so one round costs four reads and three XORs. Since `L` commutes with
//! word rotation every table is a rotation of the first.
//!
//! The tables depend only on the S-box. They are built once per process on first
//! use and never written again.

use std::sync::OnceLock;

use crate::block::{load_words, store_reversed, Block};
use crate::key::{Direction, RoundKeys, ROUNDS};
use crate::round::l_round;
use crate::sbox::sbox;

static TABLES: OnceLock<RoundTables> = OnceLock::new();

/// Four 256-entry tables, one per input byte position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundTables {
    tables: [[u32; 256]; 4],
}

impl RoundTables {
    fn compute() -> Self {
        let mut tables = [[0u32; 256]; 4];
        for b in 0..256usize {
            let t0 = l_round(u32::from(sbox(b as u8)) << 24);
            tables[0][b] = t0;
            tables[1][b] = t0.rotate_left(24);
            tables[2][b] = t0.rotate_left(16);
            tables[3][b] = t0.rotate_left(8);
        }
        tracing::trace!("computed fused SM4 round tables");
        Self { tables }
    }

    /// Returns the table for byte position `position` (0 = most significant).
    #[inline]
    pub fn table(&self, position: usize) -> &[u32; 256] {
        &self.tables[position]
    }

    /// Evaluates the round transform `T(x)` with four lookups.
    #[inline]
    pub fn transform(&self, x: u32) -> u32 {
        let [b0, b1, b2, b3] = x.to_be_bytes();
        self.tables[0][b0 as usize]
            ^ self.tables[1][b1 as usize]
            ^ self.tables[2][b2 as usize]
            ^ self.tables[3][b3 as usize]
    }
}

/// Returns the process-wide tables, computing them on first call.
pub fn round_tables() -> &'static RoundTables {
    TABLES.get_or_init(RoundTables::compute)
}

/// Table-driven round transform; equal to [`crate::round_function`] for every input.
#[inline]
pub fn table_round_function(x: u32) -> u32 {
    round_tables().transform(x)
}

/// Runs the 32-round transform using the fused tables.
pub fn crypt_block(block: &Block, round_keys: &RoundKeys, direction: Direction) -> Block {
    let tables = round_tables();
    let mut x = load_words(block);
    for round in 0..ROUNDS {
        let rk = round_keys.subkey(direction, round);
        let next = x[0] ^ tables.transform(x[1] ^ x[2] ^ x[3] ^ rk);
        x = [x[1], x[2], x[3], next];
    }
    store_reversed(x)
}

/// Encrypts a block with the fused tables.
pub fn encrypt_block(block: &Block, round_keys: &RoundKeys) -> Block {
    crypt_block(block, round_keys, Direction::Encrypt)
}

/// Decrypts a block with the fused tables.
pub fn decrypt_block(block: &Block, round_keys: &RoundKeys) -> Block {
    crypt_block(block, round_keys, Direction::Decrypt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{self, expand_key};
    use crate::key::Sm4Key;
    use crate::round::round_function;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn every_single_byte_input_matches_scalar() {
        for position in 0..4 {
            for b in 0..=255u32 {
                let x = b << (24 - 8 * position);
                assert_eq!(table_round_function(x), round_function(x), "x = {x:#010x}");
            }
        }
    }

    #[test]
    fn random_words_match_scalar() {
        let mut rng = ChaCha20Rng::from_seed([5u8; 32]);
        for _ in 0..10_000 {
            let x = rng.next_u32();
            assert_eq!(table_round_function(x), round_function(x));
        }
    }

    #[test]
    fn tables_are_rotations_of_first() {
        let t = round_tables();
        for b in 0..256 {
            assert_eq!(t.table(3)[b], t.table(0)[b].rotate_left(8));
            assert_eq!(t.table(2)[b], t.table(0)[b].rotate_left(16));
            assert_eq!(t.table(1)[b], t.table(0)[b].rotate_left(24));
        }
    }

    #[test]
    fn initialisation_is_shared() {
        assert!(core::ptr::eq(round_tables(), round_tables()));
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| round_tables() as *const RoundTables as usize))
            .collect();
        let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addrs.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn block_output_matches_scalar() {
        let mut rng = ChaCha20Rng::from_seed([6u8; 32]);
        for _ in 0..50 {
            let mut key = [0u8; 16];
            let mut block = [0u8; 16];
            rng.fill_bytes(&mut key);
            rng.fill_bytes(&mut block);
            let rks = expand_key(&Sm4Key::from(key));
            let ct = encrypt_block(&block, &rks);
            assert_eq!(ct, cipher::encrypt_block(&block, &rks));
            assert_eq!(decrypt_block(&ct, &rks), block);
        }
    }
}
