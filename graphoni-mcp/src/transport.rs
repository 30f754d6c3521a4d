//! Message framing for the tool server.
//!
//! Every JSON-RPC message travels as one line of UTF-8 text. [`LineTransport`]
//! applies that framing to any buffered reader and writer, and
//! [`StdioTransport`] is the stdin/stdout instance MCP hosts launch.
//! [`ChannelTransport`] hands whole messages over tokio channels, for tests.
//!
//! A bad frame (too long, not UTF-8) is reported as a recoverable error: the
//! rest of its line is discarded and the next read starts on a fresh message.

use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin,
    Stdout,
};
use tokio::sync::mpsc;

use crate::error::McpError;

/// Longest accepted message in bytes, line terminator excluded.
pub const MAX_FRAME_BYTES: usize = 1 << 20;

/// Reads and writes whole JSON-RPC messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The next message, or `None` once the peer has closed its side.
    async fn read_message(&mut self) -> Result<Option<String>, McpError>;

    /// Write one message, framed and flushed.
    async fn write_message(&mut self, message: &str) -> Result<(), McpError>;

    async fn close(&mut self) -> Result<(), McpError>;
}

/// Newline-delimited framing over a reader/writer pair.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
    max_frame: usize,
}

/// The transport MCP hosts use when they spawn `graphoni mcp`.
pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        LineTransport::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + Sync,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            max_frame: MAX_FRAME_BYTES,
        }
    }

    pub fn with_max_frame(mut self, bytes: usize) -> Self {
        self.max_frame = bytes;
        self
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Discard input up to and including the next newline.
    async fn skip_line(&mut self) -> Result<(), McpError> {
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Ok(());
            }
            match buf.iter().position(|b| *b == b'\n') {
                Some(end) => {
                    self.reader.consume(end + 1);
                    return Ok(());
                }
                None => {
                    let len = buf.len();
                    self.reader.consume(len);
                }
            }
        }
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + Sync,
{
    async fn read_message(&mut self) -> Result<Option<String>, McpError> {
        // room for a "\r\n" terminator
        let limit = self.max_frame as u64 + 2;
        let mut frame = Vec::new();
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut frame)
            .await?;
        if read == 0 {
            return Ok(None);
        }

        if frame.last() != Some(&b'\n') && read as u64 == limit {
            self.skip_line().await?;
            return Err(McpError::FrameTooLarge {
                limit: self.max_frame,
            });
        }
        if frame.last() == Some(&b'\n') {
            frame.pop();
        }
        if frame.last() == Some(&b'\r') {
            frame.pop();
        }
        if frame.len() > self.max_frame {
            return Err(McpError::FrameTooLarge {
                limit: self.max_frame,
            });
        }

        String::from_utf8(frame)
            .map(Some)
            .map_err(|e| McpError::InvalidFrame {
                reason: format!("not UTF-8 ({e})"),
            })
    }

    async fn write_message(&mut self, message: &str) -> Result<(), McpError> {
        if message.contains('\n') {
            return Err(McpError::InvalidFrame {
                reason: "message spans more than one line".into(),
            });
        }
        if message.len() > self.max_frame {
            return Err(McpError::FrameTooLarge {
                limit: self.max_frame,
            });
        }
        self.writer.write_all(message.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), McpError> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// In-process transport over a pair of mpsc channels.
pub struct ChannelTransport {
    receiver: mpsc::Receiver<String>,
    sender: mpsc::Sender<String>,
}

impl ChannelTransport {
    pub fn new(receiver: mpsc::Receiver<String>, sender: mpsc::Sender<String>) -> Self {
        Self { receiver, sender }
    }

    /// Two connected ends: what one writes, the other reads.
    pub fn pair(buffer: usize) -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::channel(buffer);
        let (tx_b, rx_b) = mpsc::channel(buffer);
        (
            ChannelTransport::new(rx_a, tx_b),
            ChannelTransport::new(rx_b, tx_a),
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn read_message(&mut self) -> Result<Option<String>, McpError> {
        Ok(self.receiver.recv().await)
    }

    async fn write_message(&mut self, message: &str) -> Result<(), McpError> {
        self.sender
            .send(message.to_string())
            .await
            .map_err(|_| McpError::PeerClosed)
    }

    async fn close(&mut self) -> Result<(), McpError> {
        self.receiver.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &[u8]) -> LineTransport<&[u8], Vec<u8>> {
        LineTransport::new(input, Vec::new())
    }

    #[tokio::test]
    async fn test_reads_one_message_per_line() {
        let mut transport = lines(b"{\"id\":1}\r\n{\"id\":2}\n{\"id\":3}");
        assert_eq!(transport.read_message().await.unwrap().as_deref(), Some(r#"{"id":1}"#));
        assert_eq!(transport.read_message().await.unwrap().as_deref(), Some(r#"{"id":2}"#));
        assert_eq!(transport.read_message().await.unwrap().as_deref(), Some(r#"{"id":3}"#));
        assert_eq!(transport.read_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_frame_is_skipped() {
        let mut transport = lines(b"0123456789abcdef\n{\"a\":1}\n").with_max_frame(8);
        let err = transport.read_message().await.unwrap_err();
        assert!(matches!(err, McpError::FrameTooLarge { limit: 8 }));
        assert_eq!(transport.read_message().await.unwrap().as_deref(), Some(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_frame_one_byte_over_limit() {
        let mut transport = lines(b"123456789\nok\n").with_max_frame(8);
        assert!(matches!(
            transport.read_message().await.unwrap_err(),
            McpError::FrameTooLarge { .. }
        ));
        assert_eq!(transport.read_message().await.unwrap().as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_non_utf8_frame() {
        let mut transport = lines(&[0xff, 0xfe, b'\n', b'{', b'}', b'\n']);
        let err = transport.read_message().await.unwrap_err();
        assert!(matches!(err, McpError::InvalidFrame { .. }));
        assert_eq!(transport.read_message().await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_write_appends_newline() {
        let mut transport = lines(b"");
        transport.write_message(r#"{"id":1,"result":{}}"#).await.unwrap();
        transport.write_message("{}").await.unwrap();
        let (_, written) = transport.into_inner();
        assert_eq!(written, b"{\"id\":1,\"result\":{}}\n{}\n");
    }

    #[tokio::test]
    async fn test_write_rejects_multiline_message() {
        let mut transport = lines(b"");
        let err = transport.write_message("{\n}").await.unwrap_err();
        assert!(matches!(err, McpError::InvalidFrame { .. }));
        let (_, written) = transport.into_inner();
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_channel_pair_both_directions() {
        let (mut client, mut server) = ChannelTransport::pair(4);

        client.write_message(r#"{"id":1}"#).await.unwrap();
        assert_eq!(server.read_message().await.unwrap().as_deref(), Some(r#"{"id":1}"#));

        server.write_message(r#"{"id":1,"result":{}}"#).await.unwrap();
        assert_eq!(
            client.read_message().await.unwrap().as_deref(),
            Some(r#"{"id":1,"result":{}}"#)
        );
    }

    #[tokio::test]
    async fn test_channel_eof_when_peer_dropped() {
        let (client, mut server) = ChannelTransport::pair(4);
        drop(client);
        assert_eq!(server.read_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_to_closed_peer_fails() {
        let (mut client, server) = ChannelTransport::pair(4);
        drop(server);
        let err = client.write_message("{}").await.unwrap_err();
        assert!(matches!(err, McpError::PeerClosed));
    }
}
