//! Tests for utility functions

use armada_allocation::util::{init_tracing, now_ms, DEFAULT_LOG_DIRECTIVE};

#[test]
fn test_now_ms_is_monotonic_enough() {
    let first = now_ms();
    let second = now_ms();
    assert!(first > 0);
    assert!(second >= first);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    assert!(DEFAULT_LOG_DIRECTIVE.starts_with("armada_allocation"));
}
