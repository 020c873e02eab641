//! The process-wide console and scoped output capture.
//!
//! Guests write through the host `console` import, which lands in
//! [`write`]/[`write_line`]. Normally that text goes to the process's
//! standard output. While a [`CaptureHandle`] is alive it goes to an
//! in-memory buffer instead.
//!
//! Only one capture can be active at a time. [`OutputCapture::begin`] blocks
//! until any other capture has ended, so concurrent runs serialize here.
//! Beginning a second capture on a thread that already holds one deadlocks.

use std::io::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

enum Sink {
    Stdout,
    Buffer(String),
}

struct Console {
    sink: Mutex<Sink>,
    capture: Mutex<()>,
}

lazy_static::lazy_static! {
    static ref CONSOLE: Console = Console {
        sink: Mutex::new(Sink::Stdout),
        capture: Mutex::new(()),
    };
}

fn sink() -> MutexGuard<'static, Sink> {
    CONSOLE.sink.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write text to the current console sink.
pub fn write(text: &str) {
    match &mut *sink() {
        Sink::Stdout => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
                tracing::warn!(error = %e, "failed to write guest output to stdout");
            }
        }
        Sink::Buffer(buffer) => buffer.push_str(text),
    }
}

/// Write text followed by a newline to the current console sink.
pub fn write_line(text: &str) {
    let mut line = String::with_capacity(text.len() + 1);
    line.push_str(text);
    line.push('\n');
    write(&line);
}

/// Whether console output is currently being captured.
pub fn is_redirected() -> bool {
    matches!(*sink(), Sink::Buffer(_))
}

/// Entry point for starting a capture.
pub struct OutputCapture;

impl OutputCapture {
    /// Redirect the console into memory until the returned handle is ended
    /// or dropped.
    pub fn begin() -> CaptureHandle {
        let exclusive = CONSOLE
            .capture
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *sink(), Sink::Buffer(String::new()));

        CaptureHandle {
            previous: Some(previous),
            _exclusive: exclusive,
        }
    }
}

/// An active capture. Restores the previous sink when ended or dropped.
pub struct CaptureHandle {
    previous: Option<Sink>,
    _exclusive: MutexGuard<'static, ()>,
}

impl CaptureHandle {
    /// Stop capturing and return the captured lines.
    ///
    /// Text is split on `\n` (dropping a preceding `\r`). The last element
    /// holds whatever followed the final newline, so output ending in a
    /// newline yields a trailing empty string.
    pub fn end(mut self) -> Vec<String> {
        split_lines(&self.restore())
    }

    fn restore(&mut self) -> String {
        let Some(previous) = self.previous.take() else {
            return String::new();
        };
        match std::mem::replace(&mut *sink(), previous) {
            Sink::Buffer(buffer) => buffer,
            Sink::Stdout => String::new(),
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        // `_exclusive` is released after this runs, so the sink is restored
        // before another capture can begin.
        self.restore();
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// Serializes unit tests that touch the process-wide console.
#[cfg(test)]
pub(crate) fn serial() -> MutexGuard<'static, ()> {
    static SERIAL: Mutex<()> = Mutex::new(());
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}
