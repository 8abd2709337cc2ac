//! Presents a single seekable byte stream over either the tail of the installer executable or an
//! ordered sequence of external `.bin` slice files.
//!
//! Grounded in `stream::slice_reader` (`original_source/src/stream/slice.cpp`/`.hpp`).

use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

const SLICE_ID_16BIT: &[u8; 8] = b"idska16\x1A";
const SLICE_ID_32BIT: &[u8; 8] = b"idska32\x1A";

#[derive(Error, Debug)]
pub enum SliceError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("bad slice magic number in {0}")]
    BadMagic(Utf8PathBuf),
    #[error("bad slice size in {path}: {size} > {file_size}")]
    SizeExceedsFile {
        path: Utf8PathBuf,
        size: u32,
        file_size: u64,
    },
    #[error("bad slice size in {path}: {size} < current position {position}")]
    SizeBelowPosition {
        path: Utf8PathBuf,
        size: u32,
        position: u64,
    },
    #[error("could not open slice {slice}: {candidate}")]
    NotFound { slice: usize, candidate: String },
    #[error("cannot change slices in a single-file setup")]
    EmbeddedSliceChange,
    #[error("slices per disk must not be zero")]
    ZeroSlicesPerDisk,
}

/// Where the underlying bytes for a [`SliceReader`] come from.
enum Source {
    /// A single open handle on the installer executable; slice changes are never allowed.
    Embedded { file: File, data_offset: u64 },
    /// A directory of external slice files, opened on demand.
    External {
        dir: Utf8PathBuf,
        base_file: String,
        base_file2: String,
        slices_per_disk: usize,
    },
}

/// Builds the expected slice filename for `slice` (0-based) under `basename`.
#[must_use]
pub fn slice_filename(basename: &str, slice: usize, slices_per_disk: usize) -> String {
    assert!(slices_per_disk != 0, "slices per disk must not be zero");
    if slices_per_disk == 1 {
        format!("{basename}-{}.bin", slice + 1)
    } else {
        let major = slice / slices_per_disk + 1;
        let minor = u8::try_from(slice % slices_per_disk).expect("slices_per_disk fits in u8");
        let letter = char::from(b'a' + minor);
        format!("{basename}-{major}{letter}.bin")
    }
}

/// Streams installer payload bytes, transparently spanning the embedded or external slices that
/// make up the archive.
pub struct SliceReader {
    source: Source,
    current_slice: usize,
    slice_size: u64,
    handle: Option<File>,
}

impl SliceReader {
    /// Opens a reader over data embedded in the setup executable itself, starting at
    /// `data_offset` (as given by `loader::SetupLoader::data_offset`).
    pub fn embedded(mut file: File, data_offset: u64) -> Result<Self, SliceError> {
        let file_size = file.seek(SeekFrom::End(0))?;
        let slice_size = (file_size - data_offset.min(file_size)).min(u64::from(i32::MAX as u32));
        file.seek(SeekFrom::Start(data_offset))?;
        Ok(Self {
            source: Source::Embedded { file, data_offset },
            current_slice: 0,
            slice_size,
            handle: None,
        })
    }

    /// Opens a reader over a sequence of external slice files under `dir`, named from
    /// `base_file`/`base_file2` (a fallback base name used by some installer variants) and
    /// grouped `slices_per_disk` slices to a disk.
    pub fn external(
        dir: impl Into<Utf8PathBuf>,
        base_file: impl Into<String>,
        base_file2: impl Into<String>,
        slices_per_disk: usize,
    ) -> Result<Self, SliceError> {
        if slices_per_disk == 0 {
            return Err(SliceError::ZeroSlicesPerDisk);
        }
        let mut reader = Self {
            source: Source::External {
                dir: dir.into(),
                base_file: base_file.into(),
                base_file2: base_file2.into(),
                slices_per_disk,
            },
            current_slice: 0,
            slice_size: 0,
            handle: None,
        };
        reader.open(0)?;
        Ok(reader)
    }

    #[must_use]
    pub const fn slice(&self) -> usize {
        self.current_slice
    }

    fn open_file(&mut self, path: &Utf8Path) -> Result<bool, SliceError> {
        let Ok(mut file) = File::open(path) else {
            return Ok(false);
        };

        let file_size = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;

        let mut magic = [0u8; 8];
        file.read_exact(&mut magic)?;
        if &magic != SLICE_ID_16BIT && &magic != SLICE_ID_32BIT {
            return Err(SliceError::BadMagic(path.to_owned()));
        }

        let mut size_bytes = [0u8; 4];
        file.read_exact(&mut size_bytes)?;
        let size = u32::from_le_bytes(size_bytes);
        let position = file.stream_position()?;

        if u64::from(size) > file_size {
            return Err(SliceError::SizeExceedsFile {
                path: path.to_owned(),
                size,
                file_size,
            });
        }
        if u64::from(size) < position {
            return Err(SliceError::SizeBelowPosition {
                path: path.to_owned(),
                size,
                position,
            });
        }

        self.slice_size = u64::from(size);
        self.handle = Some(file);
        Ok(true)
    }

    fn open_file_case_insensitive(
        &mut self,
        dir: &Utf8Path,
        filename: &str,
    ) -> Result<bool, SliceError> {
        let Ok(entries) = dir.read_dir_utf8() else {
            return Ok(false);
        };
        for entry in entries.filter_map(Result::ok) {
            if entry.file_name().eq_ignore_ascii_case(filename) {
                let path = entry.into_path();
                if self.open_file(&path)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn open(&mut self, slice: usize) -> Result<(), SliceError> {
        self.current_slice = slice;
        self.handle = None;

        let Source::External {
            dir,
            base_file,
            base_file2,
            slices_per_disk,
        } = &self.source
        else {
            return Err(SliceError::EmbeddedSliceChange);
        };
        let dir = dir.clone();
        let primary = slice_filename(base_file, slice, *slices_per_disk);
        let secondary = (!base_file2.is_empty()).then(|| slice_filename(base_file2, slice, *slices_per_disk));

        if self.open_file(&dir.join(&primary))? {
            return Ok(());
        }
        if let Some(secondary) = &secondary {
            if secondary != &primary && self.open_file(&dir.join(secondary))? {
                return Ok(());
            }
        }
        if self.open_file_case_insensitive(&dir, &primary)? {
            return Ok(());
        }
        if let Some(secondary) = &secondary {
            if secondary != &primary && self.open_file_case_insensitive(&dir, secondary)? {
                return Ok(());
            }
        }

        Err(SliceError::NotFound {
            slice,
            candidate: primary,
        })
    }

    fn ensure_slice(&mut self, slice: usize) -> Result<(), SliceError> {
        if slice == self.current_slice && (self.handle.is_some() || matches!(self.source, Source::Embedded { .. }))
        {
            return Ok(());
        }
        match &self.source {
            Source::Embedded { .. } if slice != self.current_slice => Err(SliceError::EmbeddedSliceChange),
            Source::Embedded { .. } => Ok(()),
            Source::External { .. } => self.open(slice),
        }
    }

    fn current_position(&mut self) -> io::Result<u64> {
        match &mut self.source {
            Source::Embedded { file, data_offset } => Ok(file.stream_position()? - *data_offset),
            Source::External { .. } => self
                .handle
                .as_mut()
                .expect("slice opened before reading")
                .stream_position(),
        }
    }

    fn seek_within_slice(&mut self, offset: u64) -> io::Result<()> {
        match &mut self.source {
            Source::Embedded { file, data_offset } => {
                file.seek(SeekFrom::Start(*data_offset + offset))?;
            }
            Source::External { .. } => {
                self.handle
                    .as_mut()
                    .expect("slice opened before reading")
                    .seek(SeekFrom::Start(offset))?;
            }
        }
        Ok(())
    }

    /// Seeks to `offset` within `slice`. Returns `Ok(false)` if `offset` is past the end of the
    /// slice rather than erroring, matching the original's "not a valid position" return value.
    pub fn seek(&mut self, slice: usize, offset: u64) -> Result<bool, SliceError> {
        self.ensure_slice(slice)?;
        if offset > self.slice_size {
            return Ok(false);
        }
        self.seek_within_slice(offset)?;
        Ok(true)
    }

    /// Reads up to `buf.len()` bytes starting at the current slice and offset, transparently
    /// continuing into the next slice when the read crosses a slice boundary. Returns the number
    /// of bytes read, which is less than `buf.len()` only at the very end of the last slice.
    pub fn read(&mut self, mut buf: &mut [u8]) -> Result<usize, SliceError> {
        self.ensure_slice(self.current_slice)?;

        let mut total = 0;
        while !buf.is_empty() {
            let read_pos = self.current_position()?;
            if read_pos > self.slice_size {
                break;
            }
            let mut remaining = self.slice_size - read_pos;
            if remaining == 0 {
                match self.open(self.current_slice + 1) {
                    Ok(()) => {}
                    Err(SliceError::NotFound { .. }) => break,
                    Err(error) => return Err(error),
                }
                let read_pos = self.current_position()?;
                if read_pos > self.slice_size {
                    break;
                }
                remaining = self.slice_size - read_pos;
            }

            let to_read = usize::try_from(remaining).unwrap_or(usize::MAX).min(buf.len());
            let handle = match &mut self.source {
                Source::Embedded { file, .. } => file,
                Source::External { .. } => self.handle.as_mut().expect("slice opened before reading"),
            };
            let read = handle.read(&mut buf[..to_read])?;
            if read == 0 {
                break;
            }
            total += read;
            buf = &mut buf[read..];
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::slice_filename;

    #[test]
    fn single_slice_per_disk_naming() {
        assert_eq!(slice_filename("setup", 0, 1), "setup-1.bin");
        assert_eq!(slice_filename("setup", 4, 1), "setup-5.bin");
    }

    #[test]
    fn multiple_slices_per_disk_naming() {
        assert_eq!(slice_filename("setup", 0, 3), "setup-1a.bin");
        assert_eq!(slice_filename("setup", 2, 3), "setup-1c.bin");
        assert_eq!(slice_filename("setup", 3, 3), "setup-2a.bin");
    }
}
