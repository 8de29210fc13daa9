//! Streaming line source over a gzip-compressed dump

use super::cancel::CancelSignal;
use super::source::ImportError;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// How often the skip loop checks for cancellation
const SKIP_CANCEL_CHECK: u64 = 10_000;

/// One line of a dump, owned by whoever receives it
#[derive(Debug, Clone)]
pub struct RawLine {
    /// Zero-based line number within the decompressed file
    pub number: u64,
    /// Compressed bytes consumed when this line was read
    pub offset: u64,
    pub bytes: Vec<u8>,
}

/// Tracks how many compressed bytes the decoder has pulled from the file
struct CountingReader<R> {
    inner: R,
    consumed: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n as u64;
        Ok(n)
    }
}

/// Reads decompressed lines from a `.gz` dump
pub struct LineSource {
    path: PathBuf,
    file_size: u64,
    reader: BufReader<MultiGzDecoder<CountingReader<File>>>,
    max_line_bytes: usize,
    /// Lines consumed so far
    next_line: u64,
}

impl LineSource {
    /// Open a dump file; concatenated gzip members are read as one stream
    pub fn open(
        path: impl AsRef<Path>,
        read_buffer_bytes: usize,
        max_line_bytes: usize,
    ) -> Result<Self, ImportError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| ImportError::Open {
            path: path.clone(),
            source,
        };

        let file = File::open(&path).map_err(open_err)?;
        let file_size = file.metadata().map_err(open_err)?.len();

        Ok(Self {
            reader: BufReader::with_capacity(
                read_buffer_bytes,
                MultiGzDecoder::new(CountingReader {
                    inner: file,
                    consumed: 0,
                }),
            ),
            path,
            file_size,
            max_line_bytes,
            next_line: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the compressed file in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Compressed bytes consumed so far. Runs ahead of the line position by
    /// at most the decoder's internal buffer.
    fn compressed_offset(&self) -> u64 {
        self.reader.get_ref().get_ref().consumed.min(self.file_size)
    }

    /// Read the next line with its terminator stripped, or `None` at EOF
    fn read_raw(&mut self) -> Result<Option<Vec<u8>>, ImportError> {
        let mut buf = Vec::new();
        let limit = self.max_line_bytes as u64 + 2;

        let n = self
            .reader
            .by_ref()
            .take(limit)
            .read_until(b'\n', &mut buf)
            .map_err(|source| ImportError::Stream {
                line: self.next_line,
                source,
            })?;
        if n == 0 {
            return Ok(None);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        if buf.len() > self.max_line_bytes {
            return Err(ImportError::LineTooLong {
                line: self.next_line,
                limit: self.max_line_bytes,
            });
        }

        self.next_line += 1;
        Ok(Some(buf))
    }

    /// Discard the first `count` lines. Returns how many were skipped, which
    /// is less than `count` only at EOF or on cancellation.
    pub fn skip(&mut self, count: u64, cancel: &CancelSignal) -> Result<u64, ImportError> {
        let start = self.next_line;
        while self.next_line - start < count {
            if (self.next_line - start) % SKIP_CANCEL_CHECK == 0 && cancel.is_cancelled() {
                break;
            }
            if self.read_raw()?.is_none() {
                break;
            }
        }
        Ok(self.next_line - start)
    }

    /// Next line with its number and offset, or `None` at EOF
    pub fn next_line(&mut self) -> Result<Option<RawLine>, ImportError> {
        let number = self.next_line;
        Ok(self.read_raw()?.map(|bytes| RawLine {
            number,
            offset: self.compressed_offset(),
            bytes,
        }))
    }

    /// Skip `skip` lines, then send every remaining line into `tx`.
    ///
    /// Blocking; run it on a blocking task. Stops early, without error, when
    /// cancelled or when the receiver is gone. Returns the number of lines
    /// sent.
    pub fn stream(
        mut self,
        skip: u64,
        tx: mpsc::Sender<RawLine>,
        cancel: CancelSignal,
    ) -> Result<u64, ImportError> {
        if skip > 0 {
            let skipped = self.skip(skip, &cancel)?;
            info!("Skipped {} already-imported lines of {}", skipped, self.path.display());
        }

        let mut sent = 0u64;
        while !cancel.is_cancelled() {
            let Some(line) = self.next_line()? else {
                break;
            };
            if tx.blocking_send(line).is_err() {
                debug!("Line queue closed, reader stopping");
                break;
            }
            sent += 1;
        }

        debug!("Reader finished after {} lines", sent);
        Ok(sent)
    }
}
