//! Core chat session management.
//!
//! This module provides the [`Session`] struct, which owns the conversation
//! transcript and the rotating session token, and [`Reply`], the lazy
//! sequence of fragments returned by [`Session::send`].

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::ready;
use futures::stream::{self, FusedStream, Stream, StreamExt};
use tracing::{debug, warn};

use crate::client::{ChatPayload, DuckChat};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::observability::{
    SESSION_ABANDONED, SESSION_EXCHANGES, SESSION_UNDOS, STREAM_DURATION, STREAM_TTFF,
};
use crate::stream::FragmentStream;
use crate::transcript::Transcript;

/// A chat session with the service.
///
/// The session holds the token for the next request, the token that was
/// valid before the last exchange (for [`Session::undo`]), the selected
/// model and the transcript. A new conversation means a new session.
#[derive(Debug)]
pub struct Session {
    client: DuckChat,
    previous_token: String,
    current_token: String,
    model: Model,
    transcript: Transcript,
    requests: u64,
    exchanges: u64,
}

/// Snapshot of a session for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The model used for the next request.
    pub model: Model,
    /// The number of messages in the transcript.
    pub message_count: usize,
    /// Exchanges completed in this session, including undone ones.
    pub exchanges: u64,
    /// Chat requests issued in this session, including rejected ones.
    pub requests: u64,
}

impl Session {
    /// Performs the status handshake and starts a session with `model`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] if the handshake is rejected or
    /// carries no token, or a transport error if the service is unreachable.
    pub async fn init(client: DuckChat, model: Model) -> Result<Self> {
        let token = client.status().await?;
        debug!(model = %model, "session initialized");
        Ok(Self::with_token(client, token, model))
    }

    /// Starts a session from an already issued token.
    pub fn with_token(client: DuckChat, token: impl Into<String>, model: Model) -> Self {
        let token = token.into();
        Self {
            client,
            previous_token: token.clone(),
            current_token: token,
            model,
            transcript: Transcript::new(),
            requests: 0,
            exchanges: 0,
        }
    }

    /// Sends a user message and returns the streaming reply.
    ///
    /// The user message is appended before the request goes out. The reply
    /// must be drained to its end for the exchange to count: only then is the
    /// token rotated and the assistant message appended. Dropping the reply
    /// early leaves the session as it was before this call.
    ///
    /// Dropping the future returned by `send` before it resolves also leaves
    /// the session as it was.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] if the service rejects the request. The user
    /// message stays in the transcript in that case.
    pub async fn send(&mut self, text: &str) -> Result<Reply<'_>> {
        let rollback_len = self.transcript.len();
        self.transcript.push_user(text);
        self.requests += 1;

        // From here on, dropping `reply` rolls the user message back.
        let mut reply = Reply::new(self, rollback_len);
        let session = &*reply.session;
        let payload = ChatPayload::new(session.model, session.transcript.messages());
        let response = session.client.chat(&session.current_token, &payload).await;
        match response {
            Ok(fragments) => {
                reply.attach(fragments);
                Ok(reply)
            }
            Err(err) => {
                reply.rollback_len = None;
                Err(err)
            }
        }
    }

    /// Reverts the last exchange.
    ///
    /// Restores the previous token and drops the last two messages, if there
    /// are at least two.
    pub fn undo(&mut self) {
        SESSION_UNDOS.click();
        self.current_token.clone_from(&self.previous_token);
        self.transcript.undo_exchange();
    }

    /// Changes the model used for the next request.
    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    /// Returns the current model.
    pub fn model(&self) -> Model {
        self.model
    }

    /// Returns the conversation so far.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.transcript.len()
    }

    /// The token the next request will carry.
    pub fn current_token(&self) -> &str {
        &self.current_token
    }

    /// The token valid before the most recent exchange.
    pub fn previous_token(&self) -> &str {
        &self.previous_token
    }

    /// The client this session talks through.
    pub fn client(&self) -> &DuckChat {
        &self.client
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.model,
            message_count: self.transcript.len(),
            exchanges: self.exchanges,
            requests: self.requests,
        }
    }
}

/// The streaming reply to one [`Session::send`].
///
/// A `Reply` is a stream of text fragments in arrival order. It borrows the
/// session mutably, so no other operation can run on the session while the
/// reply is alive. When the stream ends the exchange is committed: the
/// assistant message is appended and the token rotated. Dropping the reply
/// before that closes the connection and discards the pending user message.
///
/// A stream that ends on a read error is committed too, with whatever text
/// arrived before the error. The error is available afterwards from
/// [`Reply::read_error`].
///
/// A response without an `x-vqd-4` header still commits, but the current
/// token is kept rather than replaced with an empty one, which the service
/// would reject on the next request.
pub struct Reply<'a> {
    session: &'a mut Session,
    fragments: FragmentStream,
    text: String,
    // Transcript length to restore on drop; `None` once nothing is pending.
    rollback_len: Option<usize>,
    started: Instant,
    committed: bool,
}

impl<'a> Reply<'a> {
    fn new(session: &'a mut Session, rollback_len: usize) -> Self {
        Self {
            session,
            fragments: FragmentStream::from_lines(stream::empty(), None),
            text: String::new(),
            rollback_len: Some(rollback_len),
            started: Instant::now(),
            committed: false,
        }
    }

    fn attach(&mut self, fragments: FragmentStream) {
        self.fragments = fragments;
        self.started = Instant::now();
    }

    /// The text received so far.
    pub fn text_so_far(&self) -> &str {
        &self.text
    }

    /// Returns true once the exchange has been committed to the session.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// The read error that ended the stream early, if any.
    pub fn read_error(&self) -> Option<&Error> {
        self.fragments.read_error()
    }

    /// Drains the reply and returns the full assistant text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamRead`] if the body failed mid-stream. The
    /// partial exchange has already been committed when this happens.
    pub async fn text(mut self) -> Result<String> {
        while self.next().await.is_some() {}
        if let Some(err) = self.fragments.take_read_error() {
            return Err(err);
        }
        Ok(std::mem::take(&mut self.text))
    }

    fn commit(&mut self) {
        self.committed = true;
        self.rollback_len = None;
        STREAM_DURATION.add(self.started.elapsed().as_secs_f64());

        if let Some(err) = self.fragments.read_error() {
            warn!(error = %err, "reply ended early; committing partial text");
        }
        let next_token = match self.fragments.rotation_token() {
            Some(token) => token.to_string(),
            None => {
                warn!("chat response carried no session token; keeping the current one");
                self.session.current_token.clone()
            }
        };

        let session = &mut *self.session;
        session.previous_token = std::mem::replace(&mut session.current_token, next_token);
        session.transcript.push_assistant(self.text.clone());
        session.exchanges += 1;
        SESSION_EXCHANGES.click();
    }
}

impl Stream for Reply<'_> {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let this = self.get_mut();
        if this.committed {
            return Poll::Ready(None);
        }
        match ready!(Pin::new(&mut this.fragments).poll_next(cx)) {
            Some(fragment) => {
                if this.text.is_empty() {
                    STREAM_TTFF.add(this.started.elapsed().as_secs_f64());
                }
                this.text.push_str(&fragment);
                Poll::Ready(Some(fragment))
            }
            None => {
                this.commit();
                Poll::Ready(None)
            }
        }
    }
}

impl FusedStream for Reply<'_> {
    fn is_terminated(&self) -> bool {
        self.committed
    }
}

impl Drop for Reply<'_> {
    fn drop(&mut self) {
        if let Some(rollback_len) = self.rollback_len.take() {
            SESSION_ABANDONED.click();
            debug!(
                received = self.text.len(),
                "reply abandoned; discarding pending user message"
            );
            self.session.transcript.truncate(rollback_len);
        }
    }
}

impl std::fmt::Debug for Reply<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reply")
            .field("fragments", &self.fragments)
            .field("text", &self.text)
            .field("committed", &self.committed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn session() -> Session {
        let client = DuckChat::with_options(Some("http://127.0.0.1:9/".to_string()), None).unwrap();
        Session::with_token(client, "token-0", Model::Gpt4oMini)
    }

    fn reply_lines(lines: &[&str], token: Option<&str>) -> FragmentStream {
        let lines: Vec<io::Result<String>> = lines.iter().map(|l| Ok(l.to_string())).collect();
        FragmentStream::from_lines(stream::iter(lines), token.map(String::from))
    }

    // Mirrors what `send` does once the request has been accepted.
    fn start<'a>(session: &'a mut Session, text: &str, fragments: FragmentStream) -> Reply<'a> {
        let rollback_len = session.transcript.len();
        session.transcript.push_user(text);
        session.requests += 1;
        let mut reply = Reply::new(session, rollback_len);
        reply.attach(fragments);
        reply
    }

    #[test]
    fn new_session_empty() {
        let session = session();
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.current_token(), "token-0");
        assert_eq!(session.previous_token(), "token-0");
    }

    #[tokio::test]
    async fn drained_reply_commits_exchange() {
        let mut session = session();
        let fragments = reply_lines(
            &[r#"data: {"message":"Hi"}"#, r#"data: {"message":" there"}"#, "data: [DONE]"],
            Some("token-1"),
        );
        let reply = start(&mut session, "hello", fragments);
        assert_eq!(reply.text().await.unwrap(), "Hi there");

        assert_eq!(session.message_count(), 2);
        assert_eq!(session.transcript().last().unwrap().content, "Hi there");
        assert_eq!(session.previous_token(), "token-0");
        assert_eq!(session.current_token(), "token-1");
        assert_eq!(session.stats().exchanges, 1);
    }

    #[tokio::test]
    async fn abandoned_reply_leaves_session_unchanged() {
        let mut session = session();
        let fragments = reply_lines(
            &[r#"data: {"message":"Hi"}"#, r#"data: {"message":" there"}"#, "data: [DONE]"],
            Some("token-1"),
        );
        let mut reply = start(&mut session, "hello", fragments);
        assert_eq!(reply.next().await.as_deref(), Some("Hi"));
        drop(reply);

        assert_eq!(session.message_count(), 0);
        assert_eq!(session.current_token(), "token-0");
        assert_eq!(session.previous_token(), "token-0");
    }

    #[tokio::test]
    async fn torn_stream_still_commits() {
        let mut session = session();
        let items: Vec<io::Result<String>> = vec![
            Ok(r#"data: {"message":"par"}"#.to_string()),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof")),
        ];
        let fragments = FragmentStream::from_lines(stream::iter(items), Some("token-1".to_string()));
        let reply = start(&mut session, "hello", fragments);
        let err = reply.text().await.unwrap_err();
        assert!(err.is_stream_read());

        assert_eq!(session.message_count(), 2);
        assert_eq!(session.transcript().last().unwrap().content, "par");
        assert_eq!(session.current_token(), "token-1");
    }

    #[tokio::test]
    async fn missing_rotation_token_keeps_current() {
        let mut session = session();
        let fragments = reply_lines(&[r#"data: {"message":"ok"}"#, "data: [DONE]"], None);
        start(&mut session, "hello", fragments).text().await.unwrap();
        assert_eq!(session.current_token(), "token-0");
        assert_eq!(session.previous_token(), "token-0");
        assert_eq!(session.message_count(), 2);
    }

    #[test]
    fn pending_reply_without_response_rolls_back() {
        let mut session = session();
        session.transcript.push_user("earlier");
        let rollback_len = session.transcript.len();
        session.transcript.push_user("hello");
        drop(Reply::new(&mut session, rollback_len));

        assert_eq!(session.message_count(), 1);
        assert_eq!(session.transcript().last().unwrap().content, "earlier");
        assert_eq!(session.current_token(), "token-0");
    }

    #[tokio::test]
    async fn undo_restores_previous_token() {
        let mut session = session();
        let fragments = reply_lines(&[r#"data: {"message":"1"}"#, "data: [DONE]"], Some("token-1"));
        start(&mut session, "one", fragments).text().await.unwrap();
        let fragments = reply_lines(&[r#"data: {"message":"2"}"#, "data: [DONE]"], Some("token-2"));
        start(&mut session, "two", fragments).text().await.unwrap();
        assert_eq!(session.message_count(), 4);

        session.undo();
        assert_eq!(session.current_token(), "token-1");
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.transcript().last().unwrap().content, "1");
    }

    #[test]
    fn undo_on_short_transcript() {
        let mut session = session();
        session.undo();
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.current_token(), "token-0");
    }

    #[test]
    fn set_model_touches_nothing_else() {
        let mut session = session();
        session.transcript.push_user("hi");
        session.set_model(Model::Mixtral);
        assert_eq!(session.model(), Model::Mixtral);
        assert_eq!(session.message_count(), 1);
        assert_eq!(session.current_token(), "token-0");
        assert_eq!(session.stats().model, Model::Mixtral);
    }
}
