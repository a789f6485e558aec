//! Byte-level I/O contracts between the socket and the HTTP machinery.
//!
//! The parser sees the connection only through [`ByteSource::pull`];
//! the response emitter only through [`Sink::write`]. Tests substitute
//! in-memory implementations of both to exercise the protocol code
//! without a socket.

use std::future::Future;
use std::io::{self, IoSlice};
use std::pin::Pin;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::sleep;

/// Owned future type used by the object-safe traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Why a [`ByteSource`] stopped producing bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceError {
    /// The peer closed the stream.
    Closed,
    /// The per-request deadline expired while waiting for bytes.
    Timeout,
    /// Any other transport failure.
    Unknown,
}

/// A pull-based stream of byte chunks.
///
/// `pull` yields a non-empty slice that stays valid until the next
/// `pull`, or a [`SourceError`]. The source is single-consumer and
/// cooperative: `pull` is the only suspension point on the parse side.
pub trait ByteSource: Send {
    fn pull<'a>(
        &'a mut self,
    ) -> impl Future<Output = Result<&'a [u8], SourceError>> + Send + 'a;
}

/// A vectored byte sink.
///
/// `write` transmits every part, as a single vectored write where the
/// transport allows, so a response head is never interleaved with body
/// bytes. The trait is object-safe on purpose: a
/// [`Response`](crate::Response) owns its sink as `Box<dyn Sink>`.
pub trait Sink: Send {
    fn write<'a>(&'a mut self, parts: &'a [&'a [u8]]) -> BoxFuture<'a, io::Result<()>>;

    /// Flush and close the write side. The default does nothing;
    /// in-memory sinks have nothing to shut down.
    fn shutdown(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Socket-backed [`ByteSource`] with a fixed scratch buffer and a
/// per-read deadline.
pub struct SocketSource {
    stream: OwnedReadHalf,
    buffer: Box<[u8]>,
    timeout: Duration,
}

/// Scratch buffer size for socket reads.
const READ_BUFFER_SIZE: usize = 8 * 1024;

impl SocketSource {
    pub fn new(stream: OwnedReadHalf, timeout: Duration) -> Self {
        Self {
            stream,
            buffer: vec![0; READ_BUFFER_SIZE].into_boxed_slice(),
            timeout,
        }
    }
}

impl ByteSource for SocketSource {
    async fn pull(&mut self) -> Result<&[u8], SourceError> {
        use tokio::io::AsyncReadExt;

        tokio::select! {
            biased;

            read_result = self.stream.read(&mut self.buffer) => {
                match read_result {
                    Ok(0) => Err(SourceError::Closed),
                    Ok(n) => Ok(&self.buffer[..n]),
                    Err(_) => Err(SourceError::Unknown),
                }
            }
            _ = sleep(self.timeout) => Err(SourceError::Timeout),
        }
    }
}

/// Socket-backed [`Sink`] over the write half of a connection.
pub struct SocketWriter {
    stream: OwnedWriteHalf,
}

impl SocketWriter {
    pub fn new(stream: OwnedWriteHalf) -> Self {
        Self { stream }
    }
}

impl Sink for SocketWriter {
    fn write<'a>(&'a mut self, parts: &'a [&'a [u8]]) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            let total: usize = parts.iter().map(|p| p.len()).sum();
            let mut written = 0;

            while written < total {
                // Rebuild the slice list past the bytes already gone.
                let mut skip = written;
                let mut slices = Vec::with_capacity(parts.len());
                for part in parts {
                    if skip >= part.len() {
                        skip -= part.len();
                        continue;
                    }
                    slices.push(IoSlice::new(&part[skip..]));
                    skip = 0;
                }

                let n = self.stream.write_vectored(&slices).await?;
                if n == 0 {
                    return Err(io::ErrorKind::WriteZero.into());
                }
                written += n;
            }

            Ok(())
        })
    }

    fn shutdown(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move { self.stream.shutdown().await })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn chunk_source_yields_then_closes() {
        let mut src = ChunkSource::from_chunks(vec![b"ab".to_vec(), b"c".to_vec()]);

        assert_eq!(src.pull().await, Ok(b"ab".as_ref()));
        assert_eq!(src.pull().await, Ok(b"c".as_ref()));
        assert_eq!(src.pull().await, Err(SourceError::Closed));
        assert_eq!(src.pull().await, Err(SourceError::Closed));
    }

    #[tokio::test]
    async fn chunk_source_skips_empty_chunks() {
        let mut src = ChunkSource::from_chunks(vec![Vec::new(), b"x".to_vec(), Vec::new()]);

        assert_eq!(src.pull().await, Ok(b"x".as_ref()));
        assert_eq!(src.pull().await, Err(SourceError::Closed));
    }

    #[tokio::test]
    async fn recording_sink_keeps_write_boundaries() {
        let mut sink = RecordingSink::new();

        sink.write(&[b"head", b" and body"]).await.unwrap();
        sink.write(&[b"more"]).await.unwrap();

        assert_eq!(sink.write_count(), 2);
        assert_eq!(sink.output_str(), "head and bodymore");
    }
}
