use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("agora.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("agora.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("agora.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("agora.stream.events");
pub(crate) static STREAM_SKIPPED_EVENTS: Counter = Counter::new("agora.stream.skipped_events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("agora.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("agora.stream.bytes");
pub(crate) static STREAM_DURATION: Moments = Moments::new("agora.stream.duration_seconds");

pub(crate) static UPLOAD_BYTES: Counter = Counter::new("agora.upload.bytes");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_SKIPPED_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&UPLOAD_BYTES);
}
