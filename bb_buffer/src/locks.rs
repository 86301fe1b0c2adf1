//! Shared streams and the four mutual-exclusion regions.
//!
//! | Lock     | Held by   | Guards |
//! |----------|-----------|--------|
//! | `input`  | producers | reading the next input item |
//! | `output` | consumers, watchdog | appending records / the sentinel |
//! | `insert` | producers | `IN` and the slot at `IN` |
//! | `remove` | consumers | `OUT` and the slot at `OUT` |
//!
//! Producers and consumers use separate buffer regions; the buffer's
//! cursor protocol keeps them off each other's slots.

use parking_lot::Mutex;
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Sentinel record marking forced termination.
pub const SENTINEL_RECORD: &str = "-1\t-1\t-1";

/// Sequential reader of positive integer items, one per line.
pub struct InputStream {
    reader: Box<dyn BufRead + Send>,
    line: String,
    exhausted: bool,
}

impl InputStream {
    pub fn new(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            line: String::new(),
            exhausted: false,
        }
    }

    /// In-memory stream of `1..=items`.
    pub fn sequence(items: u32) -> Self {
        let text: String = (1..=items).map(|i| format!("{i}\n")).collect();
        Self::new(io::Cursor::new(text.into_bytes()))
    }

    /// Next item, or `None` at end of stream.
    ///
    /// A line that is not a positive integer also ends the stream: item 0 is
    /// reserved for invalid entries and must never be enqueued.
    pub fn next_item(&mut self) -> io::Result<Option<u32>> {
        if self.exhausted {
            return Ok(None);
        }
        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            self.exhausted = true;
            return Ok(None);
        }
        match self.line.trim().parse::<u32>() {
            Ok(item) if item > 0 => Ok(Some(item)),
            _ => {
                warn!("Input line '{}' is not a positive item; ending input", self.line.trim());
                self.exhausted = true;
                Ok(None)
            }
        }
    }
}

/// Append-only, tab-separated output log.
pub struct OutputLog {
    writer: Box<dyn Write + Send>,
    records: u64,
    sentinel_written: bool,
    closed: bool,
}

impl OutputLog {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
            records: 0,
            sentinel_written: false,
            closed: false,
        }
    }

    /// Append `item<TAB>producer<TAB>consumer`.
    pub fn append(&mut self, item: u32, producer: u32, consumer: u32) -> io::Result<()> {
        self.ensure_open()?;
        writeln!(self.writer, "{item}\t{producer}\t{consumer}")?;
        self.records += 1;
        Ok(())
    }

    /// Append the sentinel record and flush, at most once per log.
    ///
    /// Returns `Ok(true)` if this call wrote it.
    pub fn append_sentinel(&mut self) -> io::Result<bool> {
        if self.sentinel_written {
            return Ok(false);
        }
        self.ensure_open()?;
        writeln!(self.writer, "{SENTINEL_RECORD}")?;
        self.writer.flush()?;
        self.sentinel_written = true;
        Ok(true)
    }

    /// Flush and close. Later calls are no-ops.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.writer.flush()
    }

    /// Records appended so far, excluding the sentinel.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn sentinel_written(&self) -> bool {
        self.sentinel_written
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed {
            Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "output log already closed",
            ))
        } else {
            Ok(())
        }
    }
}

/// The lock set handed to every worker of one run.
pub struct LockSet {
    pub input: Mutex<InputStream>,
    pub output: Mutex<OutputLog>,
    pub insert: Mutex<()>,
    pub remove: Mutex<()>,
}

impl LockSet {
    pub fn new(input: InputStream, output: OutputLog) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
            insert: Mutex::new(()),
            remove: Mutex::new(()),
        }
    }
}
