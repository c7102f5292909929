//! One block-transform capability with three interchangeable implementations.

use core::fmt;
use core::str::FromStr;

use crate::block::{Block, BLOCK_SIZE};
use crate::cipher;
use crate::error::{Error, Result};
use crate::key::{Direction, RoundKeys};
use crate::tables;
use crate::vector::{self, Batch, LANES};

/// Block engine selection. Every variant produces bit-identical output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Engine {
    /// S-box and diffusion evaluated explicitly each round.
    Scalar,
    /// Four fused lookup tables per round.
    TableFused,
    /// Eight blocks per pass over the fused tables; remainders use `TableFused`.
    #[default]
    VectorBatch,
}

impl Engine {
    /// All engines, reference first.
    pub const ALL: [Engine; 3] = [Engine::Scalar, Engine::TableFused, Engine::VectorBatch];

    /// Short name used in logs and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Engine::Scalar => "scalar",
            Engine::TableFused => "table",
            Engine::VectorBatch => "vector",
        }
    }

    /// Transforms a single block.
    pub fn crypt_block(self, block: &Block, round_keys: &RoundKeys, direction: Direction) -> Block {
        match self {
            Engine::Scalar => cipher::crypt_block(block, round_keys, direction),
            Engine::TableFused | Engine::VectorBatch => {
                tables::crypt_block(block, round_keys, direction)
            }
        }
    }

    /// Transforms blocks in place.
    pub fn crypt_blocks(self, blocks: &mut [Block], round_keys: &RoundKeys, direction: Direction) {
        match self {
            Engine::VectorBatch => vector::crypt_blocks(blocks, round_keys, direction),
            _ => {
                for block in blocks.iter_mut() {
                    *block = self.crypt_block(block, round_keys, direction);
                }
            }
        }
    }

    /// Transforms a byte buffer holding whole blocks in place.
    pub fn crypt_bytes(
        self,
        data: &mut [u8],
        round_keys: &RoundKeys,
        direction: Direction,
    ) -> Result<()> {
        if data.len() % BLOCK_SIZE != 0 {
            return Err(Error::InvalidBufferLength { len: data.len() });
        }

        let batch_bytes = if self == Engine::VectorBatch {
            LANES * BLOCK_SIZE
        } else {
            BLOCK_SIZE
        };
        let mut chunks = data.chunks_exact_mut(batch_bytes);
        for chunk in &mut chunks {
            let mut blocks: Batch = [[0u8; BLOCK_SIZE]; LANES];
            let blocks = &mut blocks[..chunk.len() / BLOCK_SIZE];
            for (block, bytes) in blocks.iter_mut().zip(chunk.chunks_exact(BLOCK_SIZE)) {
                block.copy_from_slice(bytes);
            }
            self.crypt_blocks(blocks, round_keys, direction);
            for (bytes, block) in chunk.chunks_exact_mut(BLOCK_SIZE).zip(blocks.iter()) {
                bytes.copy_from_slice(block);
            }
        }
        for bytes in chunks.into_remainder().chunks_exact_mut(BLOCK_SIZE) {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(bytes);
            bytes.copy_from_slice(&self.crypt_block(&block, round_keys, direction));
        }
        Ok(())
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown engine name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown engine {0:?}; expected scalar, table or vector")]
pub struct ParseEngineError(String);

impl FromStr for Engine {
    type Err = ParseEngineError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        Engine::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEngineError(s.to_owned()))
    }
}
