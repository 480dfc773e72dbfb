use metrics::{counter, histogram};
use std::time::Instant;

pub fn record_query_started() {
    counter!("queries_total").increment(1);
}

pub fn record_query_rejected(reason: &str) {
    counter!("queries_rejected_total", "reason" => reason.to_string()).increment(1);
}

pub fn record_query_failed() {
    counter!("queries_failed_total").increment(1);
}

pub fn record_query_duration(start: Instant) {
    histogram!("query_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rows_returned(count: usize) {
    histogram!("query_rows_returned").record(count as f64);
}

pub fn record_session_built(storage_type: &str) {
    counter!("sessions_built_total", "storage_type" => storage_type.to_string()).increment(1);
}

pub fn record_incompatible_table() {
    counter!("incompatible_tables_total").increment(1);
}

pub fn record_connection_test(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("connection_tests_total", "result" => result).increment(1);
}
