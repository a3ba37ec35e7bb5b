use cuckoo_table::{
    coding::Encode,
    file::TABLE_FILE_EXTENSION,
    get_tmp_folder,
    table::{Builder, Reader},
    BuildOptions, InternalKey, ValueType, Xxh3Hash,
};
use std::{fs::File, sync::Arc};
use test_log::test;

const ITEM_COUNT: u64 = 10_000;

fn key(idx: u64) -> Vec<u8> {
    InternalKey::new(format!("{idx:0>12}"), idx, ValueType::Value).encode_into_vec()
}

fn value(idx: u64) -> [u8; 8] {
    (idx * 3).to_le_bytes()
}

fn write_table(path: &std::path::Path, opts: BuildOptions) -> cuckoo_table::Result<u64> {
    let mut builder = Builder::create(path, opts, Xxh3Hash)?;

    for idx in 0..ITEM_COUNT {
        builder.add(&key(idx), &value(idx))?;
    }
    builder.finish()?;
    builder.sync()?;

    assert_eq!(ITEM_COUNT, builder.num_entries());
    Ok(builder.file_size().expect("should be finished"))
}

#[test]
fn cuckoo_file_point_reads_mmap() -> cuckoo_table::Result<()> {
    let folder = get_tmp_folder();
    let path = folder.path().join(format!("1.{TABLE_FILE_EXTENSION}"));

    let file_size = write_table(&path, BuildOptions::default())?;

    let reader = Reader::open_path(&path, Xxh3Hash)?;
    assert_eq!(file_size, reader.file_size());
    assert_eq!(ITEM_COUNT, reader.properties().num_entries);
    reader.verify_checksum()?;

    for idx in 0..ITEM_COUNT {
        let (stored, stored_value) = reader.point_read(&key(idx))?.expect("should exist");
        assert_eq!(idx, stored.seqno);
        assert_eq!(value(idx).as_slice(), stored_value);
    }

    for idx in ITEM_COUNT..(ITEM_COUNT * 2) {
        assert!(reader.point_read(&key(idx))?.is_none());
    }

    Ok(())
}

#[test]
fn cuckoo_file_point_reads_pread() -> cuckoo_table::Result<()> {
    let folder = get_tmp_folder();
    let path = folder.path().join(format!("1.{TABLE_FILE_EXTENSION}"));

    let file_size = write_table(&path, BuildOptions::default().last_level_file(true))?;

    let reader = Reader::open(File::open(&path)?, file_size, Xxh3Hash)?;
    assert!(reader.properties().is_last_level);
    reader.verify_checksum()?;

    for idx in (0..ITEM_COUNT).step_by(7) {
        let (stored, stored_value) = reader.point_read(&key(idx))?.expect("should exist");
        assert_eq!(0, stored.seqno);
        assert_eq!(value(idx).as_slice(), stored_value);
    }

    Ok(())
}

#[test]
fn cuckoo_file_point_reads_concurrent() -> cuckoo_table::Result<()> {
    let folder = get_tmp_folder();
    let path = folder.path().join(format!("1.{TABLE_FILE_EXTENSION}"));

    write_table(&path, BuildOptions::default().hash_table_ratio(0.75))?;

    let reader = Arc::new(Reader::open_path(&path, Xxh3Hash)?);

    let handles = (0..4)
        .map(|thread_idx| {
            let reader = reader.clone();

            std::thread::spawn(move || -> cuckoo_table::Result<()> {
                for idx in (thread_idx..ITEM_COUNT).step_by(4) {
                    let mut call_count = 0;

                    reader.get(&key(idx), |stored, stored_value| {
                        assert_eq!(idx, stored.seqno);
                        assert_eq!(value(idx).as_slice(), stored_value);
                        call_count += 1;
                        true
                    })?;

                    assert_eq!(1, call_count);
                }
                Ok(())
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.join().expect("thread should not panic")?;
    }

    Ok(())
}
