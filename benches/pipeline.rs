#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};

use dot20_indexer::driver::process_block;
use dot20_indexer::filter::TicksModeCache;
use dot20_indexer::remark::RawRemark;
use dot20_indexer::store::mem::MemStore;

fn mint_remark(ext: u32, batch: u32, user: &str, tick: &str) -> RawRemark {
    RawRemark {
        block_num: 1,
        extrinsic_index: ext,
        batchall_index: batch,
        remark_index: 0,
        origin: user.to_string(),
        user: user.to_string(),
        memo: serde_json::json!({"op": "mint", "tick": tick}),
    }
}

fn deploy_store(tick: &str) -> MemStore {
    let mut store = MemStore::new();
    let mut ticks_mode = TicksModeCache::new();
    let remarks = vec![RawRemark {
        block_num: 0,
        extrinsic_index: 0,
        batchall_index: 0,
        remark_index: 0,
        origin: "deployer".to_string(),
        user: "deployer".to_string(),
        memo: serde_json::json!({
            "op": "deploy",
            "tick": tick,
            "mode": "fair",
            "amt": 1_000_000_000u64,
        }),
    }];
    process_block(&mut store, &mut ticks_mode, remarks, 0).unwrap();
    store
}

/// One block of `n` distinct submitters each submitting a single fair-mode
/// mint for the same ticker: Grouper -> Base Filter -> Classifier ->
/// Executor end to end, the path spec.md §2 calls ~75% of the repo.
fn bench_fair_mint_block(c: &mut Criterion) {
    c.bench_function("fair_mint_block_100", |b| {
        b.iter(|| {
            let mut store = deploy_store("bar");
            let mut ticks_mode = TicksModeCache::new();
            ticks_mode.insert("bar".to_string(), dot20_indexer::remark::Mode::Fair);
            let remarks: Vec<RawRemark> = (0..100)
                .map(|i| mint_remark(i, 0, &format!("user{}", i), "bar"))
                .collect();
            process_block(
                black_box(&mut store),
                black_box(&mut ticks_mode),
                black_box(remarks),
                1,
            )
            .unwrap();
        })
    });
}

fn bench_deploy(c: &mut Criterion) {
    c.bench_function("deploy_single_tick", |b| {
        b.iter(|| {
            black_box(deploy_store("benchtick"));
        })
    });
}

criterion_group!(benches, bench_fair_mint_block, bench_deploy);
criterion_main!(benches);
