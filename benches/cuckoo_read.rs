use criterion::{criterion_group, criterion_main, Criterion};
use cuckoo_table::{
    coding::Encode,
    file::TABLE_FILE_EXTENSION,
    get_tmp_folder,
    table::{Builder, Reader},
    BuildOptions, InternalKey, ValueType, Xxh3Hash,
};
use rand::seq::SliceRandom;

/// Builds a last level table, values are a prefix of the key
fn build(path: &std::path::Path, item_count: u64, ratio: f64) -> Vec<Vec<u8>> {
    let opts = BuildOptions::default()
        .hash_table_ratio(ratio)
        .max_search_depth(1_000)
        .last_level_file(true);

    let mut builder = Builder::create(path, opts, Xxh3Hash).unwrap();

    let keys = (0..item_count)
        .map(|idx| {
            let mut user_key = vec![b'k'; 8];
            user_key.extend(idx.to_le_bytes());
            InternalKey::new(user_key, item_count, ValueType::Value).encode_into_vec()
        })
        .collect::<Vec<_>>();

    for key in &keys {
        builder.add(key, &key[..8]).unwrap();
    }
    builder.finish().unwrap();
    builder.sync().unwrap();

    keys
}

fn cuckoo_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("cuckoo read");

    for ratio in [0.5, 0.75, 0.9] {
        for item_count in [1_000, 100_000, 1_000_000] {
            let folder = get_tmp_folder();
            let path = folder.path().join(format!("1.{TABLE_FILE_EXTENSION}"));

            let mut keys = build(&path, item_count, ratio);
            keys.shuffle(&mut rand::rng());

            let reader = Reader::open_path(&path, Xxh3Hash).unwrap();
            eprintln!(
                "{item_count} items, ratio {ratio}: {} hash functions",
                reader.properties().num_hash_functions,
            );

            let mut idx = 0;

            group.bench_function(format!("{item_count} items, ratio {ratio}"), |b| {
                b.iter(|| {
                    let key = &keys[idx % keys.len()];
                    idx += 1;
                    reader.get(key, |_, _| false).unwrap();
                });
            });
        }
    }
}

fn cuckoo_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("cuckoo build");
    group.sample_size(10);

    for item_count in [10_000, 100_000] {
        let keys = (0..item_count)
            .map(|idx: u64| {
                InternalKey::new(idx.to_be_bytes(), idx, ValueType::Value).encode_into_vec()
            })
            .collect::<Vec<_>>();

        group.bench_function(format!("{item_count} items"), |b| {
            b.iter(|| {
                let mut builder =
                    Builder::new(Vec::new(), BuildOptions::default(), Xxh3Hash).unwrap();

                for key in &keys {
                    builder.add(key, b"value").unwrap();
                }
                builder.finish().unwrap();
            });
        });
    }
}

criterion_group!(benches, cuckoo_read, cuckoo_build);
criterion_main!(benches);
