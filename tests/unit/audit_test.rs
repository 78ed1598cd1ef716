//! Tests for audit sink

use armada_allocation::core::{build_audit_event, AuditSink, InMemoryAuditSink};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event("cluster-a", "queue-a", "lease", Some("job-1,job-2".to_string()));

    sink.record(event.clone());
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].event_id, event.event_id);
    assert_eq!(events[0].queue, "queue-a");
    assert_eq!(events[0].action, "lease");
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event("c", "q1", "lease", None));
    sink.record(build_audit_event("c", "q2", "lease", None));
    sink.record(build_audit_event("c", "q3", "lease", None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].queue, "q2"); // First one popped
    assert_eq!(events[1].queue, "q3");
}

#[test]
fn test_zero_capacity_sink_drops_everything() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event("c", "q", "lease", None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event("cluster-a", "-", "overcommit", Some("[\"cpu\"]".to_string()));

    assert_eq!(event.cluster, "cluster-a");
    assert_eq!(event.queue, "-");
    assert_eq!(event.action, "overcommit");
    assert_eq!(event.payload, Some("[\"cpu\"]".to_string()));
    assert!(event.created_at_ms > 0);
    assert_ne!(event.event_id, build_audit_event("cluster-a", "-", "overcommit", None).event_id);
}
