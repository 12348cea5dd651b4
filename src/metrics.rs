use lazy_static::lazy_static;
use prometheus::{
    Histogram, IntCounter, IntCounterVec, IntGauge, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: IntCounter =
        register_int_counter!("event_board_requests_total", "Total number of guarded requests").unwrap();
    pub static ref ADMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "event_board_admitted_total",
        "Requests admitted by the rate limiter",
        &["action"]
    )
    .unwrap();
    pub static ref REJECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "event_board_rejected_total",
        "Requests rejected by the rate limiter",
        &["action"]
    )
    .unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "event_board_upstream_latency_seconds",
        "Latency of calls to the managed backend in seconds"
    )
    .unwrap();
    pub static ref TRACKED_IDENTIFIERS: IntGauge = register_int_gauge!(
        "event_board_tracked_identifiers",
        "Identifiers currently held by the rate limiters"
    )
    .unwrap();
    pub static ref SWEPT_TOTAL: IntCounter =
        register_int_counter!("event_board_swept_records_total", "Expired rate limit records removed").unwrap();
}
