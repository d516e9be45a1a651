use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("nexuschat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("nexuschat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("nexuschat.client.request_duration_seconds");

pub(crate) static STREAM_FRAMES: Counter = Counter::new("nexuschat.stream.frames");
pub(crate) static STREAM_DROPPED_FRAMES: Counter = Counter::new("nexuschat.stream.dropped_frames");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("nexuschat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("nexuschat.stream.bytes");
pub(crate) static STREAM_UNTERMINATED: Counter = Counter::new("nexuschat.stream.unterminated");
pub(crate) static STREAM_DURATION: Moments = Moments::new("nexuschat.stream.duration_seconds");

pub(crate) static RENDER_CALLS: Counter = Counter::new("nexuschat.render.calls");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_FRAMES);
    collector.register_counter(&STREAM_DROPPED_FRAMES);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_UNTERMINATED);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&RENDER_CALLS);
}
