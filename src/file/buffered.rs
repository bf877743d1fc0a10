//! Buffered stream view over the live descriptor.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::core::Result;
use crate::error::FileError;
use crate::options::DEFAULT_BUFFER_SIZE;

/// Buffered reader and buffered writer sharing one descriptor.
///
/// Both halves move the same descriptor offset, so interleaving reads and writes
/// without [`flush`](Write::flush) in between gives unspecified positions.
/// Pending writes are flushed on drop; call [`finish`](Self::finish) to see the error.
#[derive(Debug)]
pub struct BufferedStream<'a> {
    reader: BufReader<&'a File>,
    writer: BufWriter<&'a File>,
    path: &'a Path,
    buffer_size: usize,
}

impl<'a> BufferedStream<'a> {
    /// A zero `buffer_size` falls back to [`DEFAULT_BUFFER_SIZE`].
    pub fn new(file: &'a File, path: &'a Path, buffer_size: usize) -> Self {
        let buffer_size = if buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            buffer_size
        };
        Self {
            reader: BufReader::with_capacity(buffer_size, file),
            writer: BufWriter::with_capacity(buffer_size, file),
            path,
            buffer_size,
        }
    }

    /// Streams everything from the current position to `sink` through a fixed-size
    /// buffer. Pending writes are flushed first.
    pub fn write_all_to<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64> {
        self.writer
            .flush()
            .map_err(|source| FileError::Transfer {
                transferred: 0,
                source,
            })?;
        let mut buf = vec![0u8; self.buffer_size];
        copy_chunks(&mut self.reader, sink, &mut buf)
    }

    /// Streams everything from `source` into the file through a fixed-size buffer.
    pub fn read_all_from<R: Read + ?Sized>(&mut self, source: &mut R) -> Result<u64> {
        let mut buf = vec![0u8; self.buffer_size];
        let transferred = copy_chunks(source, &mut self.writer, &mut buf)?;
        self.writer
            .flush()
            .map_err(|source| FileError::Transfer {
                transferred,
                source,
            })?;
        Ok(transferred)
    }

    /// Flushes pending writes and gives the stream up.
    pub fn finish(mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|source| FileError::io("flush", self.path, source))
    }
}

impl Read for BufferedStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl BufRead for BufferedStream<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt);
    }
}

impl Write for BufferedStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Copies `reader` into `writer` chunk by chunk, honoring short writes.
/// On failure the error carries the number of bytes already written.
fn copy_chunks<R, W>(reader: &mut R, writer: &mut W, buf: &mut [u8]) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut transferred: u64 = 0;
    loop {
        let n = match reader.read(buf) {
            Ok(0) => return Ok(transferred),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(FileError::Transfer { transferred, source }),
        };

        let mut written = 0;
        while written < n {
            match writer.write(&buf[written..n]) {
                Ok(0) => {
                    return Err(FileError::Transfer {
                        transferred,
                        source: io::ErrorKind::WriteZero.into(),
                    });
                }
                Ok(m) => {
                    written += m;
                    transferred += m as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => return Err(FileError::Transfer { transferred, source }),
            }
        }
    }
}
