use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

lazy_static! {
    pub static ref CACHE_HITS: IntCounter = register_int_counter!(
        "currency_sync_cache_hits_total",
        "Request-side lookups served from a fresh cached reply."
    )
    .unwrap();
    pub static ref CACHE_MISSES: IntCounter = register_int_counter!(
        "currency_sync_cache_misses_total",
        "Request-side lookups that republished onto fetch."
    )
    .unwrap();
    pub static ref DEDUP_DROPPED: IntCounter = register_int_counter!(
        "currency_sync_dedup_dropped_total",
        "Request-topic deliveries dropped as duplicates of an already-seen rid."
    )
    .unwrap();
    pub static ref UPSTREAM_CALLS: IntCounter = register_int_counter!(
        "currency_sync_upstream_calls_total",
        "Upstream HTTPS GETs attempted by the fetch-side handler, including retries."
    )
    .unwrap();
    pub static ref DEAD_LETTERS: IntCounterVec = register_int_counter_vec!(
        "currency_sync_dead_letters_total",
        "Dead-letter records emitted, labelled by reason.",
        &["reason"]
    )
    .unwrap();
}
