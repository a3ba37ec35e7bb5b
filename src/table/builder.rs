// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{
    bucket::{BucketLayout, EntryBuffer, KeyFormat},
    footer::{Footer, FOOTER_SIZE},
    placement::{place, EMPTY_BUCKET},
    properties::TableProperties,
    sentinel::select_empty_key,
};
use crate::{
    checksum::ChecksummedWriter, coding::Encode, file::fsync_directory, BuildOptions, Error,
    HashFunction, ParsedInternalKey, ValueType,
};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Outcome of a successful build
struct Finished {
    file_size: u64,
    properties: TableProperties,
}

/// Builds a cuckoo table
///
/// Entries are buffered in memory in any order; all placement work and all
/// writes happen in [`Builder::finish`].
///
/// ```
/// # use cuckoo_table::{coding::Encode, BuildOptions, InternalKey, ValueType, Xxh3Hash};
/// # use cuckoo_table::table::{Builder, Reader};
/// let mut builder = Builder::new(Vec::new(), BuildOptions::default(), Xxh3Hash)?;
///
/// for (idx, key) in [b"abc", b"def", b"ghi"].into_iter().enumerate() {
///     let key = InternalKey::new(*key, idx as u64, ValueType::Value);
///     builder.add(&key.encode_into_vec(), b"value")?;
/// }
/// builder.finish()?;
///
/// let file_size = builder.file_size().expect("should be finished");
/// let reader = Reader::open(builder.into_inner(), file_size, Xxh3Hash)?;
///
/// let key = InternalKey::new(*b"def", 1, ValueType::Value).encode_into_vec();
/// let (_, value) = reader.point_read(&key)?.expect("should exist");
/// assert_eq!(b"value", &*value);
/// # Ok::<(), cuckoo_table::Error>(())
/// ```
pub struct Builder<W: Write, H: HashFunction> {
    writer: W,
    hash_fn: H,
    options: BuildOptions,
    format: KeyFormat,

    /// Buffered entries, created by the first `add`
    entries: Option<EntryBuffer>,

    num_entries: u64,

    finished: Option<Finished>,

    /// Set once `finish` started writing; the output is unusable if it never completes
    poisoned: bool,

    /// Table file path, if the table is written into a file
    path: Option<PathBuf>,
}

impl<W: Write, H: HashFunction> Builder<W, H> {
    /// Creates a builder that writes the table into `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the options are malformed.
    pub fn new(writer: W, options: BuildOptions, hash_fn: H) -> crate::Result<Self> {
        options.validate()?;

        Ok(Self {
            writer,
            hash_fn,
            format: KeyFormat::for_level(options.is_last_level_file),
            options,
            entries: None,
            num_entries: 0,
            finished: None,
            poisoned: false,
            path: None,
        })
    }

    /// Buffers an entry.
    ///
    /// The first entry fixes the key and value length of the table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corruption`] if the key is not an internal key.
    ///
    /// Returns [`Error::InvalidArgument`] if the key or value length differs from
    /// the first entry, if a last level table gets a non-value entry, if the
    /// key or value is too long, or if the table is already finished.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> crate::Result<()> {
        self.check_writable()?;

        let parsed = ParsedInternalKey::parse(key)?;

        if self.format == KeyFormat::UserKeyOnly && parsed.value_type != ValueType::Value {
            return Err(Error::InvalidArgument(
                "last level tables can only store values",
            ));
        }

        let bucket_key = self.format.bucket_key(key, &parsed);

        let layout = BucketLayout::checked(bucket_key.len(), value.len())?;

        match self.entries.as_ref().map(EntryBuffer::layout) {
            Some(expected) if expected.key_len != layout.key_len => {
                return Err(Error::InvalidArgument("key length differs from first entry"));
            }
            Some(expected) if expected.value_len != layout.value_len => {
                return Err(Error::InvalidArgument(
                    "value length differs from first entry",
                ));
            }
            None if layout.key_len == 0 => {
                return Err(Error::InvalidArgument("bucket key can not be empty"));
            }
            _ => {}
        }

        let format = self.format;

        self.entries
            .get_or_insert_with(|| EntryBuffer::new(layout, format))
            .push(bucket_key, value);
        self.num_entries += 1;

        Ok(())
    }

    fn check_writable(&self) -> crate::Result<()> {
        if self.finished.is_some() {
            return Err(Error::InvalidArgument("table is already finished"));
        }

        if self.poisoned {
            return Err(Error::InvalidArgument("a previous finish failed to write the table"));
        }

        Ok(())
    }

    /// Returns the number of entries that were added.
    #[must_use]
    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }

    /// Returns the size of the written table, once finished.
    #[must_use]
    pub fn file_size(&self) -> Option<u64> {
        self.finished.as_ref().map(|x| x.file_size)
    }

    /// Returns the properties of the written table, once finished.
    #[must_use]
    pub fn properties(&self) -> Option<&TableProperties> {
        self.finished.as_ref().map(|x| &x.properties)
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Places all entries and writes the table.
    ///
    /// Nothing is written if no placement can be found.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BuildFailure`] if the entries can not be placed within
    /// the configured limits. The caller should use another table format then.
    ///
    /// Returns [`Error::InvalidArgument`] if no entry was added, or the table
    /// is already finished.
    ///
    /// Will return `Err` if an IO error occurs. The writer then holds a partial
    /// table and the builder rejects any further call.
    pub fn finish(&mut self) -> crate::Result<()> {
        self.check_writable()?;

        let Some(entries) = &self.entries else {
            return Err(Error::InvalidArgument("can not build an empty table"));
        };

        let bucket_count = self.options.bucket_count(self.num_entries);

        let build_failure = || Error::BuildFailure {
            entry_count: self.num_entries,
            bucket_count,
            max_num_hash_functions: self.options.max_num_hash_functions,
        };

        let Ok(bucket_count_usize) = usize::try_from(bucket_count) else {
            return Err(Error::InvalidArgument("too many entries"));
        };

        let Some(placement) = place(entries, bucket_count_usize, &self.options, &self.hash_fn)
        else {
            log::warn!(
                "Could not place {} entries into {bucket_count} buckets using up to {} hash functions",
                self.num_entries,
                self.options.max_num_hash_functions,
            );
            return Err(build_failure());
        };

        let Some(empty_key) = select_empty_key(entries) else {
            log::warn!("Could not find a free key to mark empty buckets");
            return Err(build_failure());
        };

        let layout = entries.layout();

        self.poisoned = true;

        // Write buckets
        let mut data_writer = ChecksummedWriter::new(&mut self.writer);
        let empty_value = vec![0; layout.value_len];

        for &entry in &placement.buckets {
            if entry == EMPTY_BUCKET {
                data_writer.write_all(&empty_key)?;
                data_writer.write_all(&empty_value)?;
            } else {
                data_writer.write_all(entries.bucket(entry))?;
            }
        }

        let data_checksum = data_writer.checksum();
        let properties_offset = layout.offset(bucket_count);
        debug_assert_eq!(properties_offset, data_writer.written());

        let user_key_len = match self.format {
            KeyFormat::Internal => layout.key_len - crate::key::INTERNAL_KEY_TRAILER_SIZE,
            KeyFormat::UserKeyOnly => layout.key_len,
        };

        #[expect(
            clippy::cast_possible_truncation,
            reason = "lengths are checked by BucketLayout::checked"
        )]
        let properties = TableProperties {
            num_entries: self.num_entries,
            key_length: layout.key_len as u32,
            user_key_length: user_key_len as u32,
            value_length: layout.value_len as u32,
            bucket_count,
            num_hash_functions: placement.num_hash_functions,
            is_last_level: self.format == KeyFormat::UserKeyOnly,
            empty_key,
            hash_table_ratio: self.options.hash_table_ratio,
            data_checksum,
        };

        // Write properties and footer
        let block = properties.to_block().encode_into_vec();
        self.writer.write_all(&block)?;

        Footer { properties_offset }.encode_into(&mut self.writer)?;
        self.writer.flush()?;

        let file_size = properties_offset + block.len() as u64 + FOOTER_SIZE as u64;

        log::debug!(
            "Written {} entries into {bucket_count} buckets ({} hash functions, {:.1}% occupancy), {file_size} bytes",
            self.num_entries,
            placement.num_hash_functions,
            properties.occupancy() * 100.0,
        );

        self.finished = Some(Finished {
            file_size,
            properties,
        });
        self.poisoned = false;

        // NOTE: The buckets are on disk now
        self.entries = None;

        Ok(())
    }
}

impl<H: HashFunction> Builder<BufWriter<File>, H> {
    /// Creates a builder that writes into a new file at `path`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the file already exists, or an IO error occurs.
    pub fn create<P: AsRef<Path>>(path: P, options: BuildOptions, hash_fn: H) -> crate::Result<Self> {
        let path = std::path::absolute(path)?;

        let writer = BufWriter::with_capacity(u16::MAX.into(), File::create_new(&path)?);

        let mut builder = Self::new(writer, options, hash_fn)?;
        builder.path = Some(path);

        Ok(builder)
    }

    /// Makes a finished table file durable, including its directory entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the table is not finished yet.
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn sync(&mut self) -> crate::Result<()> {
        if self.finished.is_none() {
            return Err(Error::InvalidArgument("table is not finished yet"));
        }

        self.writer.get_mut().sync_all()?;

        // IMPORTANT: fsync folder on Unix
        if let Some(folder) = self.path.as_deref().and_then(Path::parent) {
            fsync_directory(folder)?;
        }

        Ok(())
    }

    /// Returns the path of the table file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
