//! Decoding of the chat endpoint's event feed.
//!
//! A chat response body is a sequence of lines. Lines starting with `data: `
//! carry a JSON object whose `message` field is the next fragment of the
//! reply; the line `data: [DONE]` closes the feed; everything else is noise.
//! This module turns such a body into a stream of fragments.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, BytesMut};
use futures::stream::{self, FusedStream, Stream, TryStreamExt};
use futures::ready;
use memchr::memchr;
use serde_json::{Map, Value};
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::io::StreamReader;
use tracing::warn;

use crate::error::Error;
use crate::observability::{STREAM_DECODE_ERRORS, STREAM_FRAGMENTS, STREAM_READ_ERRORS};

const DATA_PREFIX: &str = "data: ";
const DONE_LINE: &str = "data: [DONE]";

/// Longest event line accepted by [`EventLineCodec::new`], in bytes.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Splits a byte stream into lines.
///
/// Lines end at `\n`; a trailing `\r` is dropped. Bytes that are not valid
/// UTF-8 are replaced rather than treated as an error, and an unterminated
/// final line is still produced at end of input. A line longer than the
/// maximum length is an `InvalidData` error.
#[derive(Debug)]
pub struct EventLineCodec {
    next_index: usize,
    max_length: usize,
}

impl EventLineCodec {
    /// Creates a codec accepting lines up to [`MAX_LINE_LENGTH`] bytes.
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    /// Creates a codec accepting lines up to `max_length` bytes, not counting
    /// the line ending.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
        }
    }

    /// The longest line this codec accepts.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn finish_line(&self, line: &[u8]) -> io::Result<String> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.len() > self.max_length {
            return Err(self.too_long());
        }
        Ok(String::from_utf8_lossy(line).into_owned())
    }

    fn too_long(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("event line exceeds {} bytes", self.max_length),
        )
    }
}

impl Default for EventLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EventLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> io::Result<Option<String>> {
        match memchr(b'\n', &buf[self.next_index..]) {
            Some(offset) => {
                let newline = self.next_index + offset;
                self.next_index = 0;
                let line = buf.split_to(newline + 1);
                self.finish_line(&line[..newline]).map(Some)
            }
            // One extra byte leaves room for a `\r` still waiting on its `\n`.
            None if buf.len() > self.max_length.saturating_add(1) => Err(self.too_long()),
            None => {
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> io::Result<Option<String>> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if buf.is_empty() {
            Ok(None)
        } else {
            let line = buf.split_to(buf.len());
            self.finish_line(&line).map(Some)
        }
    }
}

/// One classified line of the event feed.
#[derive(Debug)]
pub enum EventLine {
    /// Not an event line.
    Ignored,
    /// The terminator; nothing after it is read.
    Done,
    /// A well-formed event with no text.
    Empty,
    /// A well-formed event carrying a fragment.
    Fragment(String),
    /// An event line whose payload failed to decode.
    Malformed(Error),
}

/// Classify a single line of the event feed.
pub fn parse_event_line(line: &str) -> EventLine {
    if line == DONE_LINE {
        return EventLine::Done;
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return EventLine::Ignored;
    };
    // Only a JSON object is an event; arrays and scalars are malformed.
    let mut event = match serde_json::from_str::<Map<String, Value>>(payload) {
        Ok(event) => event,
        Err(e) => {
            return EventLine::Malformed(Error::decode(
                format!("invalid event payload: {e}"),
                line,
                Some(Box::new(e)),
            ));
        }
    };
    match event.remove("message") {
        Some(Value::String(message)) if !message.is_empty() => EventLine::Fragment(message),
        Some(Value::String(_)) | Some(Value::Null) | None => EventLine::Empty,
        Some(other) => EventLine::Malformed(Error::decode(
            format!("event message is not a string: {other}"),
            line,
            None,
        )),
    }
}

type LineStream = Pin<Box<dyn Stream<Item = io::Result<String>> + Send>>;

/// A stream of reply fragments decoded from a chat response body.
///
/// The stream ends at the terminator line, at the end of the body, or at the
/// first read error, whichever comes first; the underlying body is dropped
/// at that point. Malformed event lines are logged and skipped. A read error
/// does not surface as an item: it is kept for [`FragmentStream::read_error`].
pub struct FragmentStream {
    lines: LineStream,
    rotation_token: Option<String>,
    read_error: Option<Error>,
    exhausted: bool,
}

impl FragmentStream {
    /// Decode a response body.
    ///
    /// `rotation_token` is the session token carried by the response headers.
    ///
    /// ```
    /// use bytes::Bytes;
    /// use duckchat::FragmentStream;
    /// use futures::StreamExt;
    ///
    /// # tokio_test::block_on(async {
    /// let body = futures::stream::iter(vec![
    ///     Ok::<_, std::io::Error>(Bytes::from("data: {\"message\":\"Hel\"}\n")),
    ///     Ok(Bytes::from("data: {\"message\":\"lo\"}\ndata: [DONE]\n")),
    /// ]);
    /// let mut fragments = FragmentStream::new(body, Some("next".to_string()));
    /// let mut text = String::new();
    /// while let Some(fragment) = fragments.next().await {
    ///     text.push_str(&fragment);
    /// }
    /// assert_eq!(text, "Hello");
    /// assert_eq!(fragments.rotation_token(), Some("next"));
    /// # });
    /// ```
    pub fn new<S, B, E>(body: S, rotation_token: Option<String>) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: Buf + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let reader = StreamReader::new(body.map_err(io::Error::other));
        Self::from_lines(FramedRead::new(reader, EventLineCodec::new()), rotation_token)
    }

    /// Decode an already line-split feed.
    pub fn from_lines<S>(lines: S, rotation_token: Option<String>) -> Self
    where
        S: Stream<Item = io::Result<String>> + Send + 'static,
    {
        Self {
            lines: Box::pin(lines),
            rotation_token,
            read_error: None,
            exhausted: false,
        }
    }

    /// The session token carried by the response, once the feed is exhausted.
    pub fn rotation_token(&self) -> Option<&str> {
        if self.exhausted {
            self.rotation_token.as_deref()
        } else {
            None
        }
    }

    /// The error that cut the feed short, if any.
    pub fn read_error(&self) -> Option<&Error> {
        self.read_error.as_ref()
    }

    /// Takes the error that cut the feed short, if any.
    pub fn take_read_error(&mut self) -> Option<Error> {
        self.read_error.take()
    }

    /// Returns true once the feed has ended.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn finish(&mut self) {
        self.exhausted = true;
        self.lines = Box::pin(stream::empty());
    }
}

impl Stream for FragmentStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let this = self.get_mut();
        if this.exhausted {
            return Poll::Ready(None);
        }
        loop {
            match ready!(this.lines.as_mut().poll_next(cx)) {
                Some(Ok(line)) => match parse_event_line(&line) {
                    EventLine::Fragment(fragment) => {
                        STREAM_FRAGMENTS.click();
                        return Poll::Ready(Some(fragment));
                    }
                    EventLine::Done => {
                        this.finish();
                        return Poll::Ready(None);
                    }
                    EventLine::Ignored | EventLine::Empty => {}
                    EventLine::Malformed(err) => {
                        STREAM_DECODE_ERRORS.click();
                        warn!(error = %err, "skipping malformed event line");
                    }
                },
                Some(Err(e)) => {
                    STREAM_READ_ERRORS.click();
                    this.read_error = Some(Error::stream_read(
                        format!("error reading response body: {e}"),
                        Some(Box::new(e)),
                    ));
                    this.finish();
                    return Poll::Ready(None);
                }
                None => {
                    this.finish();
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl FusedStream for FragmentStream {
    fn is_terminated(&self) -> bool {
        self.exhausted
    }
}

impl std::fmt::Debug for FragmentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentStream")
            .field("rotation_token", &self.rotation_token)
            .field("read_error", &self.read_error)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}
