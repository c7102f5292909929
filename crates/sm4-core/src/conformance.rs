//! Cross-engine conformance checks.
//!
//! Runs every optimized engine against the scalar reference and reports the
//! first divergence as [`Error::Consistency`]. Used by the test suites and by
//! the `check` command of the CLI; a correct build never fails these checks.

use crate::block::Block;
use crate::cipher::expand_key;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::key::{Direction, Sm4Key};
use crate::round::round_function;
use crate::tables::table_round_function;

/// Compares the table round transform with the scalar one for `inputs`.
pub fn check_round_function(inputs: impl IntoIterator<Item = u32>) -> Result<()> {
    for x in inputs {
        if table_round_function(x) != round_function(x) {
            return Err(Error::Consistency {
                engine: Engine::TableFused.name(),
            });
        }
    }
    Ok(())
}

/// Encrypts and decrypts `blocks` with every engine under `key` and compares
/// each result with the scalar reference.
pub fn check_engines(key: &Sm4Key, blocks: &[Block]) -> Result<()> {
    let round_keys = expand_key(key);
    let mut reference = blocks.to_vec();
    Engine::Scalar.crypt_blocks(&mut reference, &round_keys, Direction::Encrypt);

    for engine in Engine::ALL {
        let mut out = blocks.to_vec();
        engine.crypt_blocks(&mut out, &round_keys, Direction::Encrypt);
        if out != reference {
            return Err(Error::Consistency {
                engine: engine.name(),
            });
        }
        engine.crypt_blocks(&mut out, &round_keys, Direction::Decrypt);
        if out != blocks {
            return Err(Error::Consistency {
                engine: engine.name(),
            });
        }
    }
    tracing::debug!(blocks = blocks.len(), "engines agree with scalar reference");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhaustive_single_byte_inputs_pass() {
        let inputs = (0..4u32).flat_map(|p| (0..=255u32).map(move |b| b << (8 * p)));
        assert_eq!(check_round_function(inputs), Ok(()));
    }

    #[test]
    fn engines_pass_on_odd_block_counts() {
        let key = Sm4Key::from([0x11; 16]);
        let blocks: Vec<Block> = (0..23u8).map(|i| [i; 16]).collect();
        assert_eq!(check_engines(&key, &blocks), Ok(()));
        assert_eq!(check_engines(&key, &[]), Ok(()));
    }
}
