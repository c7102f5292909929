//! Counter-mode keystream over a byte buffer.

use sm4_core::{Block, Direction, Engine, RoundKeys, BLOCK_SIZE, LANES};

/// Returns `counter` with its low 32-bit big-endian word advanced by `offset`
/// (wrapping, as GCM's `inc32`).
#[inline]
pub fn counter_at(counter: &Block, offset: u64) -> Block {
    let mut out = *counter;
    let ctr = u32::from_be_bytes([counter[12], counter[13], counter[14], counter[15]]);
    out[12..].copy_from_slice(&ctr.wrapping_add(offset as u32).to_be_bytes());
    out
}

/// XORs the keystream `E(counter + first_block + j)` into block `j` of `data`.
/// A trailing partial block is XORed over its actual length only.
pub fn apply_keystream(
    engine: Engine,
    round_keys: &RoundKeys,
    counter: &Block,
    first_block: u64,
    data: &mut [u8],
) {
    let mut keystream: Vec<Block> = Vec::with_capacity(LANES);
    for (batch_index, batch) in data.chunks_mut(LANES * BLOCK_SIZE).enumerate() {
        let base = first_block + (batch_index * LANES) as u64;
        let blocks = batch.len().div_ceil(BLOCK_SIZE);
        keystream.clear();
        keystream.extend((0..blocks as u64).map(|j| counter_at(counter, base + j)));
        engine.crypt_blocks(&mut keystream, round_keys, Direction::Encrypt);
        for (bytes, ks) in batch.chunks_mut(BLOCK_SIZE).zip(&keystream) {
            for (b, k) in bytes.iter_mut().zip(ks) {
                *b ^= *k;
            }
        }
    }
}
