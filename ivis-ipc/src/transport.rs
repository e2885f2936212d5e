//! IPC transport implementations

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, warn};

use crate::error::IpcError;
use crate::protocol::{encode_line, RequestMessage, ResponseMessage};

/// Default upper bound for a single inbound line: 16 MiB
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Newline-framed reader over the inbound stream.
///
/// There must be exactly one of these per inbound stream. The bootstrap line
/// and every later response are read through the same instance so that bytes
/// buffered past the first newline are never lost.
pub struct LineReader<R> {
    framed: FramedRead<R, LinesCodec>,
    max_line_bytes: usize,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Create a reader with [`DEFAULT_MAX_LINE_BYTES`]
    pub fn new(reader: R) -> Self {
        Self::with_max_line_bytes(reader, DEFAULT_MAX_LINE_BYTES)
    }

    /// Create a reader with a custom line length limit
    pub fn with_max_line_bytes(reader: R, max_line_bytes: usize) -> Self {
        Self {
            framed: FramedRead::new(reader, LinesCodec::new_with_max_length(max_line_bytes)),
            max_line_bytes,
        }
    }

    /// Read the next line, without its terminator.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream.
    pub async fn next_line(&mut self) -> Result<Option<String>, IpcError> {
        match self.framed.next().await {
            None => Ok(None),
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => Err(IpcError::LineTooLong {
                limit: self.max_line_bytes,
            }),
            Some(Err(LinesCodecError::Io(err))) => Err(err.into()),
        }
    }
}

/// A half-duplex request/response channel to the host
#[async_trait]
pub trait RequestChannel: Send {
    /// Write one request line
    async fn send(&mut self, message: &RequestMessage) -> Result<(), IpcError>;

    /// Block until the host answers the last request
    async fn receive_response(&mut self) -> Result<JsonValue, IpcError>;

    /// Send a request and wait for its response
    async fn request(&mut self, message: &RequestMessage) -> Result<JsonValue, IpcError> {
        self.send(message).await?;
        self.receive_response().await
    }
}

/// Line-delimited JSON channel over an inbound reader and an outbound writer.
///
/// Both streams are owned for the lifetime of the channel. All operations take
/// `&mut self`, so a second request cannot be issued while one is outstanding.
///
/// A request stays in flight from the moment its line is written until a
/// response line has been consumed. If the caller drops the future in between
/// (a `select!`, a `timeout`, an aborted task), the next `send` finds the
/// request still in flight and the channel refuses further use, since the
/// stale response would otherwise be paired with the new request.
pub struct LineChannel<R, W> {
    reader: LineReader<R>,
    writer: W,
    response_timeout: Option<Duration>,
    in_flight: bool,
    desynchronized: bool,
}

impl<R, W> LineChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a channel that waits indefinitely for responses
    pub fn new(reader: LineReader<R>, writer: W) -> Self {
        Self {
            reader,
            writer,
            response_timeout: None,
            in_flight: false,
            desynchronized: false,
        }
    }

    /// Bound the wait for each response. `None` blocks indefinitely.
    pub fn with_response_timeout(mut self, response_timeout: Option<Duration>) -> Self {
        self.response_timeout = response_timeout;
        self
    }

    /// Configured response timeout
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout
    }

    /// Borrow the outbound writer
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Whether pairing has been lost and every call now fails
    pub fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    fn ensure_synchronized(&self) -> Result<(), IpcError> {
        if self.desynchronized {
            return Err(IpcError::Desynchronized);
        }
        Ok(())
    }

    fn desynchronize(&mut self, reason: &str) {
        warn!(reason, "Lost request/response pairing, channel is now unusable");
        self.desynchronized = true;
    }

    async fn write_line(&mut self, line: &str) -> Result<(), IpcError> {
        // One write per message so lines are never interleaved
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<R, W> RequestChannel for LineChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: &RequestMessage) -> Result<(), IpcError> {
        self.ensure_synchronized()?;
        if self.in_flight {
            self.desynchronize("previous request was abandoned before its response");
            return Err(IpcError::Desynchronized);
        }

        let line = encode_line(message)?;
        debug!(kind = %message.kind(), bytes = line.len(), "Sending request to host");

        self.in_flight = true;
        if let Err(err) = self.write_line(&line).await {
            // Part of the line may already be on the wire
            self.desynchronize("request write failed");
            return Err(err);
        }

        Ok(())
    }

    async fn receive_response(&mut self) -> Result<JsonValue, IpcError> {
        self.ensure_synchronized()?;

        let next = match self.response_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.reader.next_line()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout = ?limit, "No response from host");
                    self.desynchronize("response timed out");
                    return Err(IpcError::Timeout(limit));
                }
            },
            None => self.reader.next_line().await,
        };

        // The codec stops at the first framing error, so nothing read after
        // it can be matched to a request.
        let line = match next {
            Ok(line) => line.ok_or(IpcError::ChannelClosed)?,
            Err(err) => {
                self.desynchronize("unreadable response line");
                return Err(err);
            }
        };

        self.in_flight = false;
        debug!(bytes = line.len(), "Received response from host");

        ResponseMessage::parse(&line)?.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{duplex, AsyncBufReadExt, BufReader};

    fn channel_over(input: &'static [u8]) -> LineChannel<&'static [u8], Vec<u8>> {
        LineChannel::new(LineReader::new(input), Vec::new())
    }

    #[tokio::test]
    async fn test_send_writes_single_line() {
        let mut channel = channel_over(b"");
        channel
            .send(&RequestMessage::StoreState { state: json!({"a": 1}) })
            .await
            .unwrap();

        let written = String::from_utf8(channel.writer().clone()).unwrap();
        assert_eq!(written, "{\"type\":\"store_state\",\"state\":{\"a\":1}}\n");
    }

    #[tokio::test]
    async fn test_receive_success_payload() {
        let mut channel = channel_over(b"{\"ids\":[1,2]}\n");
        let payload = channel.receive_response().await.unwrap();
        assert_eq!(payload, json!({"ids": [1, 2]}));
    }

    #[tokio::test]
    async fn test_receive_remote_error() {
        let mut channel = channel_over(b"{\"error\":\"boom\"}\n{\"ok\":true}\n");

        let err = channel.receive_response().await.unwrap_err();
        assert_eq!(err.remote_detail(), Some("boom"));

        // Pairing survives a host-reported failure
        let payload = channel.receive_response().await.unwrap();
        assert_eq!(payload, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_receive_on_closed_stream() {
        let mut channel = channel_over(b"");
        let err = channel.receive_response().await.unwrap_err();
        assert!(matches!(err, IpcError::ChannelClosed));
    }

    #[tokio::test]
    async fn test_line_too_long() {
        let mut reader = LineReader::with_max_line_bytes(&b"0123456789abcdef\n"[..], 8);
        let err = reader.next_line().await.unwrap_err();
        assert!(matches!(err, IpcError::LineTooLong { limit: 8 }));
    }

    #[tokio::test]
    async fn test_reader_keeps_buffered_lines() {
        let mut reader = LineReader::new(&b"first\nsecond\nthird"[..]);
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("third"));
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_request_round_trip_over_duplex() {
        let (task_out, host_in) = duplex(4096);
        let (mut host_out, task_in) = duplex(4096);
        let mut channel = LineChannel::new(LineReader::new(task_in), task_out);

        let host = tokio::spawn(async move {
            let mut lines = BufReader::new(host_in).lines();
            let request = lines.next_line().await.unwrap().unwrap();
            host_out.write_all(b"{\"stored\":true}\n").await.unwrap();
            request
        });

        let payload = channel
            .request(&RequestMessage::StoreState { state: json!([1, 2, 3]) })
            .await
            .unwrap();
        assert_eq!(payload, json!({"stored": true}));

        let request: JsonValue = serde_json::from_str(&host.await.unwrap()).unwrap();
        assert_eq!(request, json!({"type": "store_state", "state": [1, 2, 3]}));
    }

    #[tokio::test]
    async fn test_overlong_response_desynchronizes_channel() {
        let input = &b"0123456789abcdef\n{\"ok\":1}\n"[..];
        let mut channel = LineChannel::new(LineReader::with_max_line_bytes(input, 8), Vec::new());

        let err = channel.receive_response().await.unwrap_err();
        assert!(matches!(err, IpcError::LineTooLong { limit: 8 }));

        let err = channel.receive_response().await.unwrap_err();
        assert!(matches!(err, IpcError::Desynchronized));
        assert!(channel.is_desynchronized());
    }

    #[tokio::test]
    async fn test_undecodable_response_desynchronizes_channel() {
        let mut channel = channel_over(b"{\"a\":\"\xff\"}\n{\"ok\":1}\n");

        let err = channel.receive_response().await.unwrap_err();
        assert!(matches!(err, IpcError::Io(_)), "unexpected error: {:?}", err);

        let err = channel.receive_response().await.unwrap_err();
        assert!(matches!(err, IpcError::Desynchronized));
    }

    #[tokio::test]
    async fn test_garbage_response_keeps_pairing() {
        let mut channel = channel_over(b"not json\n{\"ok\":1}\n");

        let err = channel.receive_response().await.unwrap_err();
        assert!(matches!(err, IpcError::Deserialization(_)));
        assert!(!err.is_fatal());

        assert_eq!(channel.receive_response().await.unwrap(), json!({"ok": 1}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_request_desynchronizes_channel() {
        let (task_out, host_in) = duplex(4096);
        let (mut host_out, task_in) = duplex(4096);
        let mut channel = LineChannel::new(LineReader::new(task_in), task_out);

        let first = RequestMessage::StoreState { state: json!("A") };
        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), channel.request(&first)).await;
        assert!(abandoned.is_err());

        // The host answers the first request after the caller gave up on it
        host_out.write_all(b"{\"answer_to\":\"A\"}\n").await.unwrap();

        let second = RequestMessage::StoreState { state: json!("B") };
        let err = channel.request(&second).await.unwrap_err();
        assert!(matches!(err, IpcError::Desynchronized));

        // Only the first request ever reached the host
        drop(channel);
        let mut lines = BufReader::new(host_in).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<JsonValue>(&line).unwrap(),
            json!({"type": "store_state", "state": "A"})
        );
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_write_desynchronizes_channel() {
        let (task_out, host_in) = duplex(64);
        drop(host_in);
        let (_host_out, task_in) = duplex(64);
        let mut channel = LineChannel::new(LineReader::new(task_in), task_out);

        let message = RequestMessage::StoreState { state: json!({"cursor": 1}) };
        let err = channel.send(&message).await.unwrap_err();
        assert!(matches!(err, IpcError::Io(_)), "unexpected error: {:?}", err);

        let err = channel.send(&message).await.unwrap_err();
        assert!(matches!(err, IpcError::Desynchronized));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_desynchronizes_channel() {
        let (task_out, _host_in) = duplex(4096);
        let (_host_out, task_in) = duplex(4096);
        let mut channel = LineChannel::new(LineReader::new(task_in), task_out)
            .with_response_timeout(Some(Duration::from_secs(5)));

        let err = channel.receive_response().await.unwrap_err();
        assert!(matches!(err, IpcError::Timeout(limit) if limit == Duration::from_secs(5)));

        let err = channel
            .send(&RequestMessage::StoreState { state: JsonValue::Null })
            .await
            .unwrap_err();
        assert!(matches!(err, IpcError::Desynchronized));
    }
}
