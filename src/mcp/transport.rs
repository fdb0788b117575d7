//! Line-delimited JSON transport.
//!
//! - Messages are UTF-8 encoded JSON objects
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - input (stdin): receives requests from the caller
//! - output (stdout): sends envelopes to the caller
//! - stderr: diagnostics only, via `tracing` (never envelopes)
//!
//! The transport owns framing only. It parses each line into a [`Request`]
//! but knows nothing about methods.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::protocol::{parse_request, Envelope, Request};

/// The result of reading one line.
#[derive(Debug)]
pub enum Incoming {
    /// A well-formed request.
    Request(Request),
    /// A blank line; the caller must skip it without replying.
    Empty,
    /// A line that could not be used, with the envelope to send back.
    Malformed(Envelope),
    /// The input is exhausted.
    Closed,
}

/// A transport over any buffered reader and writer.
pub struct LineTransport<R, W> {
    /// Buffered input.
    reader: R,
    /// Output sink.
    writer: W,
}

/// The transport used by the binary: stdin in, stdout out.
pub type StdioTransport = LineTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates a new stdio transport.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over the given reader and writer.
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Consumes the transport, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Reads and parses the next line.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the input fails.
    pub async fn read(&mut self) -> io::Result<Incoming> {
        let Some(line) = self.read_line().await? else {
            return Ok(Incoming::Closed);
        };

        if line.trim().is_empty() {
            return Ok(Incoming::Empty);
        }

        Ok(match parse_request(&line) {
            Ok(request) => Incoming::Request(request),
            Err(envelope) => {
                tracing::debug!(bytes = line.len(), "Rejected malformed input line");
                Incoming::Malformed(envelope)
            }
        })
    }

    /// Reads the next raw line, without its terminator.
    ///
    /// Returns `None` at end of input. Invalid UTF-8 is replaced rather than
    /// rejected so that the line still gets a parse-error reply.
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        let bytes_read = self.reader.read_until(b'\n', &mut buf).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }

        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Writes one envelope as a single line and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write(&mut self, envelope: &Envelope) -> io::Result<()> {
        let json = serde_json::to_string(envelope)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    /// Writes a raw JSON string with newline termination.
    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{Meta, RequestId};
    use serde_json::{json, Map};

    fn transport(input: &[u8]) -> LineTransport<&[u8], Vec<u8>> {
        LineTransport::new(input, Vec::new())
    }

    #[tokio::test]
    async fn reads_request_then_closed() {
        let mut t = transport(b"{\"id\":1,\"method\":\"listTools\"}\n");

        let Incoming::Request(req) = t.read().await.unwrap() else {
            panic!("expected request");
        };
        assert_eq!(req.id, RequestId::Number(1));
        assert!(matches!(t.read().await.unwrap(), Incoming::Closed));
    }

    #[tokio::test]
    async fn last_line_without_newline_is_read() {
        let mut t = transport(b"{\"id\":2,\"method\":\"listTools\"}");
        assert!(matches!(t.read().await.unwrap(), Incoming::Request(_)));
        assert!(matches!(t.read().await.unwrap(), Incoming::Closed));
    }

    #[tokio::test]
    async fn blank_lines_are_empty() {
        let mut t = transport(b"\n   \r\n");
        assert!(matches!(t.read().await.unwrap(), Incoming::Empty));
        assert!(matches!(t.read().await.unwrap(), Incoming::Empty));
        assert!(matches!(t.read().await.unwrap(), Incoming::Closed));
    }

    #[tokio::test]
    async fn garbage_is_malformed_parse_error() {
        let mut t = transport(b"{oops\n");
        let Incoming::Malformed(envelope) = t.read().await.unwrap() else {
            panic!("expected malformed");
        };
        assert_eq!(envelope.id, RequestId::Null);
        assert_eq!(envelope.error_body().unwrap().code, -32700);
    }

    #[tokio::test]
    async fn invalid_utf8_is_malformed() {
        let mut t = transport(b"\xff\xfe\n");
        assert!(matches!(t.read().await.unwrap(), Incoming::Malformed(_)));
    }

    #[tokio::test]
    async fn reassembles_chunked_input() {
        let reader = tokio_test::io::Builder::new()
            .read(b"{\"id\":3,\"met")
            .read(b"hod\":\"listPrompts\"}\n")
            .build();
        let mut t = LineTransport::new(BufReader::new(reader), Vec::new());

        let Incoming::Request(req) = t.read().await.unwrap() else {
            panic!("expected request");
        };
        assert_eq!(req.method, "listPrompts");
    }

    #[tokio::test]
    async fn write_emits_one_line_with_unescaped_slashes() {
        let mut t = transport(b"");
        let mut result = Map::new();
        result.insert("path".to_string(), json!("docs/guide/intro.md"));
        result.insert("text".to_string(), json!("line one\nline two"));
        let envelope = Envelope::success(RequestId::Number(1), result, Meta::default());

        t.write(&envelope).await.unwrap();
        let out = String::from_utf8(t.into_writer()).unwrap();

        assert!(out.ends_with('\n'));
        assert_eq!(out.matches('\n').count(), 1);
        assert!(out.contains("docs/guide/intro.md"));
        assert!(!out.contains("\\/"));
    }
}
