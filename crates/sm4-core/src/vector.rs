//! Eight-lane batch engine.
//!
//! Each [`Lanes`] value carries one state word from eight independent blocks.
//! A round broadcasts its subkey to every lane and evaluates the fused-table
//! transform lane-wise, so lane `i` follows exactly the scalar computation for
//! block `i`. The lane operations are plain fixed-width array loops that the
//! compiler can lower to vector instructions.

use core::ops::{BitXor, BitXorAssign};

use crate::block::{load_words, store_reversed, Block};
use crate::key::{Direction, RoundKeys, ROUNDS};
use crate::tables::{self, round_tables, RoundTables};

/// Number of blocks processed together.
pub const LANES: usize = 8;

/// A batch of blocks transformed in lockstep.
pub type Batch = [Block; LANES];

/// Eight 32-bit lanes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Lanes(pub [u32; LANES]);

impl Lanes {
    /// Broadcasts `value` into every lane.
    #[inline]
    pub fn splat(value: u32) -> Self {
        Self([value; LANES])
    }

    /// Extracts byte `position` (0 = most significant) of every lane as a table index.
    #[inline]
    fn byte(self, position: u32) -> [usize; LANES] {
        let shift = 24 - 8 * position;
        self.0.map(|w| ((w >> shift) & 0xff) as usize)
    }

    /// Gathers `table[index[i]]` into lane `i`.
    #[inline]
    fn gather(table: &[u32; 256], index: [usize; LANES]) -> Self {
        Self(index.map(|i| table[i]))
    }
}

impl BitXor for Lanes {
    type Output = Lanes;

    #[inline]
    fn bitxor(mut self, rhs: Lanes) -> Lanes {
        self ^= rhs;
        self
    }
}

impl BitXorAssign for Lanes {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Lanes) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a ^= b;
        }
    }
}

#[inline]
fn transform(tables: &RoundTables, x: Lanes) -> Lanes {
    Lanes::gather(tables.table(0), x.byte(0))
        ^ Lanes::gather(tables.table(1), x.byte(1))
        ^ Lanes::gather(tables.table(2), x.byte(2))
        ^ Lanes::gather(tables.table(3), x.byte(3))
}

/// Transforms eight blocks in place.
pub fn crypt_batch(batch: &mut Batch, round_keys: &RoundKeys, direction: Direction) {
    let tables = round_tables();
    let words: [[u32; 4]; LANES] = core::array::from_fn(|lane| load_words(&batch[lane]));
    let mut x: [Lanes; 4] = core::array::from_fn(|w| Lanes(words.map(|lane| lane[w])));

    for round in 0..ROUNDS {
        let rk = Lanes::splat(round_keys.subkey(direction, round));
        let next = x[0] ^ transform(tables, x[1] ^ x[2] ^ x[3] ^ rk);
        x = [x[1], x[2], x[3], next];
    }

    for (lane, block) in batch.iter_mut().enumerate() {
        *block = store_reversed([x[0].0[lane], x[1].0[lane], x[2].0[lane], x[3].0[lane]]);
    }
}

/// Transforms any number of blocks: whole batches take the lane path, the
/// remaining `len % 8` blocks fall back to the table engine.
pub fn crypt_blocks(blocks: &mut [Block], round_keys: &RoundKeys, direction: Direction) {
    let mut chunks = blocks.chunks_exact_mut(LANES);
    for chunk in &mut chunks {
        if let Ok(batch) = <&mut Batch>::try_from(chunk) {
            crypt_batch(batch, round_keys, direction);
        }
    }
    for block in chunks.into_remainder() {
        *block = tables::crypt_block(block, round_keys, direction);
    }
}
