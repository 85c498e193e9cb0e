//! Buffered line framing for worker and compiler pipes.
//!
//! Works over any `Read`/`Write`: child stdout/stdin in the coordinator,
//! the process's own stdin/stdout inside a worker, and compiler driver
//! stdout inside the runner.

use std::borrow::Cow;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

/// Default buffer size for IPC (64KB).
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Buffered line reader.
///
/// Lines are framed as bytes. Invalid UTF-8 is replaced rather than
/// rejected, so stray binary output never ends a stream.
pub struct LineReader<R: Read> {
    reader: BufReader<R>,
    line_buffer: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, inner),
            line_buffer: Vec::with_capacity(4096),
        }
    }

    /// Read a line, borrowing the internal buffer when it is valid UTF-8.
    /// Returns `None` on EOF.
    pub fn read_line(&mut self) -> io::Result<Option<Cow<'_, str>>> {
        self.line_buffer.clear();
        match self.reader.read_until(b'\n', &mut self.line_buffer)? {
            0 => Ok(None),
            _ => {
                if self.line_buffer.ends_with(b"\n") {
                    self.line_buffer.pop();
                }
                if self.line_buffer.ends_with(b"\r") {
                    self.line_buffer.pop();
                }
                Ok(Some(String::from_utf8_lossy(&self.line_buffer)))
            }
        }
    }
}

/// Buffered line writer that flushes after every line.
pub struct LineWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, inner),
        }
    }

    /// Write a line (appends newline if not present) and flush.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        if !line.ends_with('\n') {
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()
    }
}
