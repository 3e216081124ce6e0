//! Destinations for chunks played by a [`ThreadSink`](super::ThreadSink).

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

/// Receives every chunk the emulated device plays, in play order.
pub trait ChunkWriter: Send + Sync + 'static {
    /// Consumes one played chunk.
    fn write_chunk(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flushes buffered output. Called when the device shuts down.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Wraps an `io::Write` so played audio can be piped to a file or to
/// another program's stdin.
///
/// Clones share the same writer.
pub struct IoWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> IoWriter<W> {
    /// Creates a chunk writer over `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }
}

impl<W> Clone for IoWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: io::Write + Send + 'static> ChunkWriter for IoWriter<W> {
    fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.lock().write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

/// Keeps every played chunk in memory.
///
/// Clones share the same recording, so a test can keep one clone and hand
/// the other to a sink.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Recorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the chunks played so far.
    pub fn chunks(&self) -> Vec<Vec<u8>> {
        self.chunks.lock().clone()
    }

    /// Returns the number of chunks played so far.
    pub fn len(&self) -> usize {
        self.chunks.lock().len()
    }

    /// Returns true if nothing has been played.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every played byte, concatenated.
    pub fn bytes(&self) -> Vec<u8> {
        self.chunks.lock().concat()
    }
}

impl ChunkWriter for Recorder {
    fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        self.chunks.lock().push(data.to_vec());
        Ok(())
    }
}
