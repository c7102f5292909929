//! Bounded worker pool mapping block engines over disjoint buffer slices.

use core::fmt;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use sm4_core::{Block, Direction, Engine, Error, Result, RoundKeys, BLOCK_SIZE, LANES};

use crate::keystream;

/// Tasks handed to each worker per call; more than one evens out load.
const TASKS_PER_WORKER: usize = 4;

/// Splits buffers into whole batches and transforms them on a fixed pool.
///
/// Every task owns a disjoint `&mut` slice of the output, so no locking is
/// needed. Results do not depend on the worker count or the split.
pub struct BatchScheduler {
    pool: ThreadPool,
    workers: usize,
    partitions: usize,
}

impl BatchScheduler {
    /// Creates a scheduler with `workers` threads, clamped to
    /// `1..=available_parallelism`.
    pub fn new(workers: usize) -> Result<Self> {
        Self::build(workers.clamp(1, max_workers()))
    }

    /// Builds a pool of exactly `workers` threads, ignoring the machine size.
    #[cfg(test)]
    pub(crate) fn uncapped(workers: usize) -> Result<Self> {
        Self::build(workers.max(1))
    }

    fn build(workers: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sm4-worker-{i}"))
            .build()
            .map_err(|e| Error::WorkerPool {
                reason: e.to_string(),
            })?;
        tracing::debug!(workers, "started SM4 batch scheduler");
        Ok(Self {
            pool,
            workers,
            partitions: workers * TASKS_PER_WORKER,
        })
    }

    /// Creates a scheduler sized to the machine.
    pub fn with_available_parallelism() -> Result<Self> {
        Self::new(max_workers())
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Sets how many tasks a buffer is split into, independent of the
    /// number of threads. Defaults to four per worker.
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions.max(1);
        self
    }

    /// Number of tasks a large buffer is split into.
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Blocks per task for a buffer of `blocks` blocks: a whole number of batches.
    pub fn chunk_blocks(&self, blocks: usize) -> usize {
        let batches = blocks.div_ceil(LANES);
        batches.div_ceil(self.partitions).max(1) * LANES
    }

    /// Transforms blocks in place.
    pub fn crypt_blocks(
        &self,
        engine: Engine,
        round_keys: &RoundKeys,
        direction: Direction,
        blocks: &mut [Block],
    ) {
        let chunk = self.chunk_blocks(blocks.len());
        tracing::trace!(blocks = blocks.len(), chunk, %engine, "dispatching block batches");
        self.pool.install(|| {
            blocks
                .par_chunks_mut(chunk)
                .for_each(|part| engine.crypt_blocks(part, round_keys, direction));
        });
    }

    /// Transforms a byte buffer of whole blocks in place.
    pub fn crypt_bytes(
        &self,
        engine: Engine,
        round_keys: &RoundKeys,
        direction: Direction,
        data: &mut [u8],
    ) -> Result<()> {
        if data.len() % BLOCK_SIZE != 0 {
            return Err(Error::InvalidBufferLength { len: data.len() });
        }
        let chunk = self.chunk_blocks(data.len() / BLOCK_SIZE) * BLOCK_SIZE;
        tracing::trace!(bytes = data.len(), chunk, %engine, "dispatching byte batches");
        self.pool.install(|| {
            data.par_chunks_mut(chunk)
                .try_for_each(|part| engine.crypt_bytes(part, round_keys, direction))
        })
    }

    /// XORs the counter-mode keystream starting at `counter` into `data`.
    pub fn apply_keystream(
        &self,
        engine: Engine,
        round_keys: &RoundKeys,
        counter: &Block,
        data: &mut [u8],
    ) {
        let chunk_blocks = self.chunk_blocks(data.len().div_ceil(BLOCK_SIZE));
        let chunk = chunk_blocks * BLOCK_SIZE;
        self.pool.install(|| {
            data.par_chunks_mut(chunk)
                .enumerate()
                .for_each(|(i, part)| {
                    let first = (i * chunk_blocks) as u64;
                    keystream::apply_keystream(engine, round_keys, counter, first, part);
                });
        });
    }
}

impl fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("workers", &self.workers)
            .field("partitions", &self.partitions)
            .finish()
    }
}

fn max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;
    use sm4_core::{encrypt_block, expand_key, Sm4Key};

    #[test]
    fn worker_count_is_clamped() {
        assert_eq!(BatchScheduler::new(0).unwrap().workers(), 1);
        assert!(BatchScheduler::new(10_000).unwrap().workers() <= max_workers());
    }

    #[test]
    fn uncapped_pools_split_differently_but_agree() {
        let rks = expand_key(&Sm4Key::from([0x2c; 16]));
        let mut rng = ChaCha20Rng::from_seed([6u8; 32]);
        let mut plain = vec![0u8; 16 * 1003];
        rng.fill_bytes(&mut plain);

        let mut chunks = Vec::new();
        let mut outputs = Vec::new();
        for workers in [1, 2, 8] {
            let scheduler = BatchScheduler::uncapped(workers).unwrap();
            assert_eq!(scheduler.workers(), workers);
            chunks.push(scheduler.chunk_blocks(1003));
            let mut data = plain.clone();
            scheduler
                .crypt_bytes(Engine::VectorBatch, &rks, Direction::Encrypt, &mut data)
                .unwrap();
            outputs.push(data);
        }
        assert_eq!(chunks, [256, 128, 32]);
        assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn partitions_override_default_split() {
        let s = BatchScheduler::new(1).unwrap();
        assert_eq!(s.partitions(), s.workers() * TASKS_PER_WORKER);
        let s = s.with_partitions(0);
        assert_eq!(s.partitions(), 1);
        assert_eq!(s.chunk_blocks(100), 104);
    }

    #[test]
    fn chunks_are_whole_batches() {
        let s = BatchScheduler::new(2).unwrap();
        for n in [0, 1, 8, 9, 1000] {
            assert_eq!(s.chunk_blocks(n) % LANES, 0);
        }
    }

    #[test]
    fn blocks_match_single_block_reference() {
        let mut rng = ChaCha20Rng::from_seed([4u8; 32]);
        let rks = expand_key(&Sm4Key::from([5u8; 16]));
        let input: Vec<Block> = (0..77)
            .map(|_| {
                let mut b = [0u8; 16];
                rng.fill_bytes(&mut b);
                b
            })
            .collect();
        let scheduler = BatchScheduler::new(3).unwrap();
        let mut blocks = input.clone();
        scheduler.crypt_blocks(Engine::VectorBatch, &rks, Direction::Encrypt, &mut blocks);
        for (got, plain) in blocks.iter().zip(&input) {
            assert_eq!(*got, encrypt_block(plain, &rks));
        }
    }

    #[test]
    fn bytes_reject_partial_block() {
        let rks = expand_key(&Sm4Key::from([5u8; 16]));
        let scheduler = BatchScheduler::new(1).unwrap();
        let mut data = vec![0u8; 20];
        assert_eq!(
            scheduler.crypt_bytes(Engine::Scalar, &rks, Direction::Encrypt, &mut data),
            Err(Error::InvalidBufferLength { len: 20 })
        );
    }
}
