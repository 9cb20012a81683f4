use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("geppetto.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("geppetto.client.request_errors");
pub(crate) static CLIENT_TOKEN_RETRIES: Counter = Counter::new("geppetto.client.token_retries");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("geppetto.client.request_duration_seconds");

pub(crate) static SESSION_REFRESHES: Counter = Counter::new("geppetto.session.refreshes");
pub(crate) static SESSION_REFRESH_FAILURES: Counter =
    Counter::new("geppetto.session.refresh_failures");
pub(crate) static SESSION_FALLBACK_LOGINS: Counter =
    Counter::new("geppetto.session.fallback_logins");
pub(crate) static SESSION_TOKEN_ROTATIONS: Counter =
    Counter::new("geppetto.session.token_rotations");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("geppetto.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("geppetto.stream.errors");

pub(crate) static THREAD_ROLLBACKS: Counter = Counter::new("geppetto.thread.rollbacks");
pub(crate) static THREAD_RESETS: Counter = Counter::new("geppetto.thread.resets");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_TOKEN_RETRIES);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&SESSION_REFRESHES);
    collector.register_counter(&SESSION_REFRESH_FAILURES);
    collector.register_counter(&SESSION_FALLBACK_LOGINS);
    collector.register_counter(&SESSION_TOKEN_ROTATIONS);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);

    collector.register_counter(&THREAD_ROLLBACKS);
    collector.register_counter(&THREAD_RESETS);
}
