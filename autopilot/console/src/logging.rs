//! Logging Setup
//!
//! Logs go to stderr. The console keeps the terminal in raw mode, where a bare
//! `\n` does not return the cursor, so every line is written with `\r\n`.

use std::io::{self, Write};

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor `LOG_LEVEL` is set
const DEFAULT_FILTER: &str = "autopilot=info,autopilot_core=info";

/// Initialize the tracing subscriber
///
/// `RUST_LOG` wins; the older `LOG_LEVEL` variable (`DEBUG`, `INFO`, ...) is
/// honoured when it is the only one set.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(|| CrlfWriter::new(io::stderr()))
        .init();
}

/// Writer that turns lone `\n` into `\r\n`
#[derive(Debug)]
pub struct CrlfWriter<W> {
    inner: W,
    last: Option<u8>,
}

impl<W: Write> CrlfWriter<W> {
    /// Wrap `inner`
    pub fn new(inner: W) -> Self {
        Self { inner, last: None }
    }

    /// Unwrap the inner writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut start = 0;
        for (i, &byte) in buf.iter().enumerate() {
            let previous = if i == 0 { self.last } else { Some(buf[i - 1]) };
            if byte == b'\n' && previous != Some(b'\r') {
                self.inner.write_all(&buf[start..i])?;
                self.inner.write_all(b"\r\n")?;
                start = i + 1;
            }
        }
        self.inner.write_all(&buf[start..])?;
        if let Some(&byte) = buf.last() {
            self.last = Some(byte);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
