//! Engine output sink.

use std::io::Write;
use std::sync::{Arc, Mutex};

/// Destination for streamed subprocess output.
///
/// Executors forward every chunk the moment it arrives, byte for byte, so
/// downstream consumers can scrape the wrapped tool's output. Tests swap in
/// a capturing buffer instead of the process stdout.
#[derive(Clone)]
pub enum OutputSink {
    /// The engine's own stdout, flushed per chunk.
    Stdout,
    /// A shared in-memory buffer.
    Buffer(Arc<Mutex<Vec<u8>>>),
}

impl OutputSink {
    /// Create a capturing sink plus the handle to read it back.
    pub fn buffer() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (OutputSink::Buffer(Arc::clone(&buf)), buf)
    }

    /// Forward one output chunk.
    pub fn write_chunk(&self, chunk: &[u8]) -> std::io::Result<()> {
        match self {
            OutputSink::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                handle.write_all(chunk)?;
                handle.flush()
            }
            OutputSink::Buffer(buf) => {
                let mut buf = buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                buf.extend_from_slice(chunk);
                Ok(())
            }
        }
    }
}
