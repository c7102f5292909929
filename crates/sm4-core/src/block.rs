//! Block representation helpers.

/// SM4 block of 16 bytes.
pub type Block = [u8; 16];

/// Block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// XORs two blocks, writing the result into `dst`.
#[inline]
pub fn xor_in_place(dst: &mut Block, rhs: &Block) {
    for (d, r) in dst.iter_mut().zip(rhs.iter()) {
        *d ^= *r;
    }
}

/// Splits a block into four big-endian words.
#[inline]
pub(crate) fn load_words(block: &Block) -> [u32; 4] {
    core::array::from_fn(|i| {
        u32::from_be_bytes([
            block[4 * i],
            block[4 * i + 1],
            block[4 * i + 2],
            block[4 * i + 3],
        ])
    })
}

/// Emits the final state `(X32, X33, X34, X35)` in reverse order as big-endian bytes.
#[inline]
pub(crate) fn store_reversed(state: [u32; 4]) -> Block {
    let mut out = [0u8; 16];
    for (i, word) in state.iter().rev().enumerate() {
        out[4 * i..4 * i + 4].copy_from_slice(&word.to_be_bytes());
    }
    out
}
