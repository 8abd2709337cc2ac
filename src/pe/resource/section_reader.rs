use std::io::{self, Read, Seek, SeekFrom};

/// A [`Read`] + [`Seek`] view bounded to a single PE section (or other contiguous byte range),
/// with all offsets relative to the start of that range.
pub struct SectionReader<R> {
    inner: R,
    base_offset: u64,
    len: u64,
    position: u64,
}

impl<R: Read + Seek> SectionReader<R> {
    pub fn new(mut inner: R, base_offset: u64, len: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(base_offset))?;

        Ok(Self {
            inner,
            base_offset,
            len,
            position: 0,
        })
    }
}

impl<R: Read + Seek> Read for SectionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.position);
        let limit = usize::try_from(remaining).unwrap_or(usize::MAX).min(buf.len());

        let read = self.inner.read(&mut buf[..limit])?;
        self.position += read as u64;

        Ok(read)
    }
}

impl<R: Read + Seek> Seek for SectionReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_position = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::Current(offset) => (self.position as i64 + offset).max(0) as u64,
            SeekFrom::End(offset) => (self.len as i64 + offset).max(0) as u64,
        };

        self.inner
            .seek(SeekFrom::Start(self.base_offset + new_position))?;
        self.position = new_position;

        Ok(new_position)
    }
}
