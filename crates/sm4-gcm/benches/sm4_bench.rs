use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use sm4_batch::BatchScheduler;
use sm4_core::{expand_key, Direction, Engine, Sm4Key};
use sm4_gcm::Sm4Gcm;

const BUFFER: usize = 64 * 1024;

fn random_buffer(seed: u8) -> Vec<u8> {
    let mut data = vec![0u8; BUFFER];
    ChaCha20Rng::from_seed([seed; 32]).fill_bytes(&mut data);
    data
}

fn bench_engines(c: &mut Criterion) {
    let round_keys = expand_key(&Sm4Key::from([0u8; 16]));
    let data = random_buffer(1);

    let mut group = c.benchmark_group("ecb");
    group.throughput(Throughput::Bytes(BUFFER as u64));
    for engine in Engine::ALL {
        group.bench_function(engine.name(), |b| {
            let mut buf = data.clone();
            b.iter(|| {
                engine
                    .crypt_bytes(&mut buf, &round_keys, Direction::Encrypt)
                    .unwrap()
            });
        });
    }
    let scheduler = BatchScheduler::with_available_parallelism().unwrap();
    group.bench_function("vector_scheduled", |b| {
        let mut buf = data.clone();
        b.iter(|| {
            scheduler
                .crypt_bytes(Engine::VectorBatch, &round_keys, Direction::Encrypt, &mut buf)
                .unwrap()
        });
    });
    group.finish();
}

fn bench_gcm(c: &mut Criterion) {
    let data = random_buffer(2);
    let iv = [0u8; 12];
    let scheduler = Arc::new(BatchScheduler::with_available_parallelism().unwrap());

    let mut group = c.benchmark_group("gcm");
    group.throughput(Throughput::Bytes(BUFFER as u64));
    group.sample_size(20);
    group.bench_function("encrypt_sequential", |b| {
        let gcm = Sm4Gcm::new(&Sm4Key::from([1u8; 16]));
        b.iter(|| gcm.encrypt(&iv, &data, b"aad").unwrap());
    });
    group.bench_function("encrypt_scheduled", |b| {
        let gcm = Sm4Gcm::new(&Sm4Key::from([1u8; 16])).with_scheduler(Arc::clone(&scheduler));
        b.iter(|| gcm.encrypt(&iv, &data, b"aad").unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_engines, bench_gcm);
criterion_main!(benches);
