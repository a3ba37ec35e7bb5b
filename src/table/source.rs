// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::{borrow::Cow, fs::File, sync::Arc};

/// Randomly addressable, read-only table storage
///
/// In-memory and memory-mapped sources hand out borrowed slices,
/// files are read with positional reads.
pub trait RandomAccess {
    /// Reads exactly `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::ErrorKind::UnexpectedEof`] if the range is out of bounds.
    fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Cow<'_, [u8]>>;
}

fn slice_at(bytes: &[u8], offset: u64, len: usize) -> std::io::Result<Cow<'_, [u8]>> {
    usize::try_from(offset)
        .ok()
        .and_then(|start| Some(start..start.checked_add(len)?))
        .and_then(|range| bytes.get(range))
        .map(Cow::Borrowed)
        .ok_or_else(|| std::io::ErrorKind::UnexpectedEof.into())
}

impl RandomAccess for [u8] {
    fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Cow<'_, [u8]>> {
        slice_at(self, offset, len)
    }
}

impl RandomAccess for Vec<u8> {
    fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Cow<'_, [u8]>> {
        slice_at(self, offset, len)
    }
}

impl RandomAccess for memmap2::Mmap {
    fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Cow<'_, [u8]>> {
        slice_at(self, offset, len)
    }
}

impl RandomAccess for File {
    fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Cow<'_, [u8]>> {
        let mut buf = vec![0; len];

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;

            self.read_exact_at(&mut buf, offset)?;
        }

        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;

            let mut read = 0;

            while let Some(rest) = buf.get_mut(read..).filter(|rest| !rest.is_empty()) {
                let n = self.seek_read(rest, offset + read as u64)?;

                if n == 0 {
                    return Err(std::io::ErrorKind::UnexpectedEof.into());
                }
                read += n;
            }
        }

        #[cfg(not(any(unix, windows)))]
        {
            compile_error!("unsupported OS");
            unimplemented!();
        }

        Ok(Cow::Owned(buf))
    }
}

impl<T: RandomAccess + ?Sized> RandomAccess for &T {
    fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Cow<'_, [u8]>> {
        (**self).read_at(offset, len)
    }
}

impl<T: RandomAccess + ?Sized> RandomAccess for Arc<T> {
    fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Cow<'_, [u8]>> {
        (**self).read_at(offset, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_log::test;

    #[test]
    fn source_slice_bounds() -> crate::Result<()> {
        let bytes = b"abcdef".to_vec();

        assert_eq!(b"cd", &*bytes.read_at(2, 2)?);
        assert_eq!(b"", &*bytes.read_at(6, 0)?);
        assert!(bytes.read_at(5, 2).is_err());
        assert!(bytes.read_at(u64::MAX, 1).is_err());

        Ok(())
    }

    #[test]
    fn source_file_and_mmap_agree() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("data");

        {
            let mut file = File::create(&path)?;
            file.write_all(b"hello cuckoo")?;
            file.sync_all()?;
        }

        let file = File::open(&path)?;
        assert_eq!(b"cuckoo", &*file.read_at(6, 6)?);
        assert!(file.read_at(10, 6).is_err());

        // SAFETY: The file is not modified while mapped
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        assert_eq!(b"cuckoo", &*mmap.read_at(6, 6)?);

        let shared: Arc<[u8]> = Arc::from(&b"hello"[..]);
        assert_eq!(b"ell", &*shared.read_at(1, 3)?);

        Ok(())
    }
}
