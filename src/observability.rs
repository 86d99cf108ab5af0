use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("travelbot.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("travelbot.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("travelbot.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("travelbot.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("travelbot.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("travelbot.stream.bytes");
pub(crate) static STREAM_TEXT_DELTAS: Counter = Counter::new("travelbot.stream.text_deltas");
pub(crate) static STREAM_SKIPPED_CHUNKS: Counter =
    Counter::new("travelbot.stream.skipped_chunks");

pub(crate) static SESSION_TURNS: Counter = Counter::new("travelbot.session.turns");
pub(crate) static SESSION_TURN_ERRORS: Counter = Counter::new("travelbot.session.turn_errors");
pub(crate) static SESSION_TURN_DURATION: Moments =
    Moments::new("travelbot.session.turn_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_TEXT_DELTAS);
    collector.register_counter(&STREAM_SKIPPED_CHUNKS);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TURN_ERRORS);
    collector.register_moments(&SESSION_TURN_DURATION);
}
