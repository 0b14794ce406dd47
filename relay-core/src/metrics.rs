//! Pipeline metrics

use prometheus::{
    register_counter_vec, register_int_gauge, CounterVec, IntGauge,
};

lazy_static::lazy_static! {
    pub static ref EVENTS_TOTAL: CounterVec = register_counter_vec!(
        "relay_events_total",
        "Observed platform events by classification outcome",
        &["outcome"]
    )
    .unwrap();

    pub static ref DELIVERIES_TOTAL: CounterVec = register_counter_vec!(
        "relay_deliveries_total",
        "Delivery attempts by status",
        &["status"]
    )
    .unwrap();

    pub static ref DRAINS_TOTAL: CounterVec = register_counter_vec!(
        "relay_drains_total",
        "Retry queue drain passes by outcome",
        &["outcome"]
    )
    .unwrap();

    pub static ref QUEUE_DEPTH: IntGauge = register_int_gauge!(
        "relay_queue_depth",
        "Pending deliveries awaiting retry"
    )
    .unwrap();
}
