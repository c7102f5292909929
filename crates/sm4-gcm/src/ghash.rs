//! GHASH universal hash over GF(2^128).
//!
//! Blocks are read as big-endian 128-bit integers in GCM's reflected bit order:
//! the most significant bit of byte 0 is the coefficient of `x^0`. Reduction uses
//! `x^128 + x^7 + x^2 + x + 1`, which in that order is the constant
//! `0xe1 << 120`.

use sm4_core::Block;
use zeroize::{Zeroize, ZeroizeOnDrop};

const R: u128 = 0xe1 << 120;

/// Carry-less multiplication of `x` and `y` reduced modulo the GCM polynomial.
pub fn gf_mul(x: u128, y: u128) -> u128 {
    let mut z = 0u128;
    let mut v = y;
    for i in 0..128 {
        if x & (1u128 << (127 - i)) != 0 {
            z ^= v;
        }
        v = if v & 1 != 0 { (v >> 1) ^ R } else { v >> 1 };
    }
    z
}

/// GHASH accumulator keyed by the hash subkey `H`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Ghash {
    h: u128,
    acc: u128,
}

impl Ghash {
    /// Starts a new accumulation under `h`.
    pub fn new(h: &Block) -> Self {
        Self {
            h: u128::from_be_bytes(*h),
            acc: 0,
        }
    }

    /// Absorbs one full block: `acc = (acc ^ block) * H`.
    #[inline]
    pub fn update_block(&mut self, block: &Block) {
        self.acc = gf_mul(self.acc ^ u128::from_be_bytes(*block), self.h);
    }

    /// Absorbs `data`, zero-padding the final partial block.
    pub fn update_padded(&mut self, data: &[u8]) {
        for chunk in data.chunks(16) {
            let mut block = [0u8; 16];
            block[..chunk.len()].copy_from_slice(chunk);
            self.update_block(&block);
        }
    }

    /// Absorbs the length block (bit lengths of AAD and ciphertext, big-endian)
    /// and returns the digest.
    pub fn finalize(mut self, aad_len: u64, ciphertext_len: u64) -> Block {
        let mut lengths = [0u8; 16];
        lengths[..8].copy_from_slice(&(aad_len * 8).to_be_bytes());
        lengths[8..].copy_from_slice(&(ciphertext_len * 8).to_be_bytes());
        self.update_block(&lengths);
        self.acc.to_be_bytes()
    }
}
