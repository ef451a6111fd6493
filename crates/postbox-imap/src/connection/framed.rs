//! Buffered response reader and command writer over any async byte stream.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::{Decoded, ResponseDecoder};
use crate::parser::Response;
use crate::{Error, Result};

const READ_CHUNK: usize = 8 * 1024;

/// Reads whole responses and writes raw command bytes.
///
/// [`read_response`](Self::read_response) is cancel safe: partial input
/// stays in the internal buffer until the next call.
#[derive(Debug)]
pub struct FramedStream<S> {
    stream: S,
    read_buf: BytesMut,
    decoder: ResponseDecoder,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            decoder: ResponseDecoder::new(),
        }
    }

    /// Reads the next complete response.
    ///
    /// # Errors
    ///
    /// I/O errors, malformed responses, and a peer that closes the stream.
    pub async fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Decoded::Response(response) = self.decoder.decode(&mut self.read_buf)? {
                return Ok(response);
            }

            self.read_buf.reserve(READ_CHUNK);
            let n = self.stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return match self.decoder.decode_eof(&mut self.read_buf)? {
                    Decoded::Response(response) => Ok(response),
                    Decoded::Incomplete => {
                        Err(Error::Connection("connection closed by server".to_string()))
                    }
                };
            }
        }
    }

    /// Writes and flushes `bytes`.
    ///
    /// # Errors
    ///
    /// Transport errors.
    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Closes the write half.
    ///
    /// # Errors
    ///
    /// Transport errors.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// True if bytes past the last response are already buffered.
    #[must_use]
    pub fn has_buffered_input(&self) -> bool {
        !self.read_buf.is_empty()
    }

    /// Returns the stream. Buffered input is discarded.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;
    use crate::parser::UntaggedResponse;

    #[tokio::test]
    async fn test_reassembles_split_reads() {
        let mock = Builder::new()
            .read(b"* 3 EXI")
            .read(b"STS\r\n* 1 FETCH (BODY[] {5}\r\nhe")
            .read(b"llo)\r\nA0001 OK done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(
            framed.read_response().await.unwrap(),
            Response::Untagged(UntaggedResponse::Exists(3))
        );
        assert!(matches!(
            framed.read_response().await.unwrap(),
            Response::Untagged(UntaggedResponse::Fetch { .. })
        ));
        assert!(matches!(
            framed.read_response().await.unwrap(),
            Response::Tagged { .. }
        ));
    }

    #[tokio::test]
    async fn test_clean_eof_is_a_connection_error() {
        let mock = Builder::new().read(b"* OK hi\r\n").build();
        let mut framed = FramedStream::new(mock);
        framed.read_response().await.unwrap();
        let err = framed.read_response().await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn test_eof_mid_line_is_a_syntax_error() {
        let mock = Builder::new().read(b"A0001 OK don").build();
        let mut framed = FramedStream::new(mock);
        let err = framed.read_response().await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[tokio::test]
    async fn test_writes_are_flushed() {
        let mock = Builder::new().write(b"A0001 NOOP\r\n").build();
        let mut framed = FramedStream::new(mock);
        framed.write_all(b"A0001 NOOP\r\n").await.unwrap();
    }
}
