use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use zstd::stream::read::Decoder;

/// Buffered NDJSON line reader with empty-line trimming.
///
/// Files ending in `.zst` are decompressed transparently; `window_log_max(31)`
/// is requested up front so large frames do not fail with "frame requires too
/// much memory".
pub struct NdjsonReader {
    rdr: Box<dyn BufRead>,
}

impl NdjsonReader {
    pub fn open(path: &Path, buf_bytes: usize) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let cap = buf_bytes.max(8 * 1024);
        let is_zst = path.extension().map_or(false, |e| e.eq_ignore_ascii_case("zst"));
        let rdr: Box<dyn BufRead> = if is_zst {
            let mut decoder =
                Decoder::new(file).with_context(|| format!("zstd decoder {}", path.display()))?;
            decoder.window_log_max(31)?;
            Box::new(BufReader::with_capacity(cap, decoder))
        } else {
            Box::new(BufReader::with_capacity(cap, file))
        };
        Ok(Self { rdr })
    }

    /// Read the next line into `buf`. Returns the number of bytes read
    /// (0 on EOF). Strips trailing `\r?\n`.
    pub fn read_line(&mut self, buf: &mut String) -> Result<usize> {
        buf.clear();
        let n = self.rdr.read_line(buf)?;
        if n == 0 {
            return Ok(0);
        }
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        Ok(n)
    }
}

/// Buffered NDJSON line writer.
pub struct NdjsonWriter {
    w: BufWriter<File>,
}

impl NdjsonWriter {
    /// Create (truncate) `path`.
    pub fn create(path: &Path, buf_bytes: usize) -> Result<Self> {
        let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        Ok(Self { w: BufWriter::with_capacity(buf_bytes.max(8 * 1024), f) })
    }

    /// Open `path` for appending, creating it when absent.
    pub fn append(path: &Path, buf_bytes: usize) -> Result<Self> {
        let f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("append {}", path.display()))?;
        Ok(Self { w: BufWriter::with_capacity(buf_bytes.max(8 * 1024), f) })
    }

    #[inline]
    pub fn write_line(&mut self, s: &str) -> Result<()> {
        self.w.write_all(s.as_bytes())?;
        self.w.write_all(b"\n")?;
        Ok(())
    }

    /// Serialize `value` as one compact JSON line.
    pub fn write_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let line = serde_json::to_string(value)?;
        self.write_line(&line)
    }

    pub fn finish(mut self) -> Result<()> {
        self.w.flush()?;
        Ok(())
    }
}
