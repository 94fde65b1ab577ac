use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("mithridates.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("mithridates.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("mithridates.client.request_duration_seconds");

pub(crate) static STREAM_DELTAS: Counter = Counter::new("mithridates.stream.deltas");
pub(crate) static STREAM_CHUNKS: Counter = Counter::new("mithridates.stream.chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("mithridates.stream.errors");
pub(crate) static STREAM_PARSE_ERRORS: Counter = Counter::new("mithridates.stream.parse_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_DELTAS);
    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_PARSE_ERRORS);
}
