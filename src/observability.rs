use biometrics::{Collector, Counter, Moments};

pub(crate) static HANDSHAKES: Counter = Counter::new("duckchat.client.handshakes");
pub(crate) static HANDSHAKE_ERRORS: Counter = Counter::new("duckchat.client.handshake_errors");
pub(crate) static CHAT_REQUESTS: Counter = Counter::new("duckchat.client.chat_requests");
pub(crate) static CHAT_REQUEST_ERRORS: Counter =
    Counter::new("duckchat.client.chat_request_errors");
pub(crate) static CHAT_REQUEST_DURATION: Moments =
    Moments::new("duckchat.client.chat_request_duration_seconds");

pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("duckchat.stream.fragments");
pub(crate) static STREAM_DECODE_ERRORS: Counter = Counter::new("duckchat.stream.decode_errors");
pub(crate) static STREAM_READ_ERRORS: Counter = Counter::new("duckchat.stream.read_errors");
pub(crate) static STREAM_TTFF: Moments = Moments::new("duckchat.stream.ttff_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("duckchat.stream.duration_seconds");

pub(crate) static SESSION_EXCHANGES: Counter = Counter::new("duckchat.session.exchanges");
pub(crate) static SESSION_ABANDONED: Counter = Counter::new("duckchat.session.abandoned");
pub(crate) static SESSION_UNDOS: Counter = Counter::new("duckchat.session.undos");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&HANDSHAKES);
    collector.register_counter(&HANDSHAKE_ERRORS);
    collector.register_counter(&CHAT_REQUESTS);
    collector.register_counter(&CHAT_REQUEST_ERRORS);
    collector.register_moments(&CHAT_REQUEST_DURATION);

    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_DECODE_ERRORS);
    collector.register_counter(&STREAM_READ_ERRORS);
    collector.register_moments(&STREAM_TTFF);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_EXCHANGES);
    collector.register_counter(&SESSION_ABANDONED);
    collector.register_counter(&SESSION_UNDOS);
}
