//! Reconciliation behavior against the mock external domain.

use std::collections::HashSet;
use transix::mock::{Kind, MockHub, MockInterface};

fn harness() -> (MockHub, MockInterface) {
    // RUST_LOG=transix=trace surfaces the per-stage log lines
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let hub = MockHub::new();
    (hub.clone(), MockInterface::new(hub))
}

fn names(set: &HashSet<String>) -> Vec<&str> {
    let mut v: Vec<&str> = set.iter().map(String::as_str).collect();
    v.sort();
    v
}

#[test]
fn test_reconcile_is_idempotent() {
    let (hub, mockif) = harness();
    hub.appear(Kind::Service, "/echo", "statusecho");

    let diff = mockif.expose_services(["/echo"]);
    assert_eq!(names(&diff.added), ["/echo"]);

    // nothing changed externally, so further cycles are quiet
    assert!(mockif.update().is_empty());
    assert!(mockif.update().is_empty());
}

#[test]
fn test_resource_before_pattern() {
    let (hub, mockif) = harness();
    hub.appear(Kind::Topic, "/chatter", "string");

    let diff = mockif.expose_topics(["/chatter"]);
    assert_eq!(names(&diff.added), ["/chatter"]);
}

#[test]
fn test_pattern_before_resource() {
    let (hub, mockif) = harness();

    assert!(mockif.expose_topics(["/chatter"]).is_empty());

    hub.appear(Kind::Topic, "/chatter", "string");
    let diff = mockif.update();
    assert_eq!(names(&diff.added), ["/chatter"]);
}

#[test]
fn test_withdraw_and_re_expose() {
    let (hub, mockif) = harness();
    hub.appear(Kind::Service, "/x", "statusecho");

    let diff = mockif.expose_services(["/x"]);
    assert_eq!(names(&diff.added), ["/x"]);

    // pattern withdrawn while the resource is still out there
    let diff = mockif.expose_services(Vec::<String>::new());
    assert_eq!(names(&diff.removed), ["/x"]);
    assert!(hub.present(Kind::Service).contains("/x"));

    // re-exposing picks it right back up
    let diff = mockif.expose_services(["/x"]);
    assert_eq!(names(&diff.added), ["/x"]);
}

#[test]
fn test_disappearance_without_withdrawal() {
    let (hub, mockif) = harness();
    hub.appear(Kind::Service, "/a", "statusecho");
    hub.appear(Kind::Service, "/b", "statusecho");

    let diff = mockif.expose_services(["/.*"]);
    assert_eq!(names(&diff.added), ["/a", "/b"]);

    hub.vanish(Kind::Service, "/b");
    let diff = mockif.update();
    assert!(diff.added.is_empty());
    assert_eq!(names(&diff.removed), ["/b"]);

    // the survivor keeps its proxy untouched
    assert!(mockif.services().snapshot()["/a"].live);
}

#[test]
fn test_patterns_are_anchored() {
    let (hub, mockif) = harness();
    hub.appear(Kind::Param, "/rate", "int");
    hub.appear(Kind::Param, "/rate_limit", "int");

    let diff = mockif.expose_params(["/rate"]);
    assert_eq!(names(&diff.added), ["/rate"]);
}

#[test]
fn test_construction_failure_is_isolated() {
    let (hub, mockif) = harness();
    hub.appear(Kind::Service, "/flaky", "statusecho");
    hub.appear(Kind::Service, "/solid", "statusecho");
    hub.set_faulty("/flaky", true);

    let diff = mockif.expose_services(["/.*"]);
    assert_eq!(names(&diff.added), ["/solid"]);

    // retried every cycle; succeeds once the fault clears
    assert!(mockif.update().is_empty());
    hub.set_faulty("/flaky", false);
    let diff = mockif.update();
    assert_eq!(names(&diff.added), ["/flaky"]);
}

#[test]
fn test_malformed_pattern_is_skipped() {
    let (hub, mockif) = harness();
    hub.appear(Kind::Topic, "/chatter", "string");

    // the broken pattern is dropped, the good one still applies
    let diff = mockif.expose_topics(["[unclosed", "/chatter"]);
    assert_eq!(names(&diff.added), ["/chatter"]);
}

#[test]
fn test_withdrawn_resource_proxies_are_cleaned() {
    let (hub, mockif) = harness();
    hub.appear(Kind::Service, "/x", "statusecho");

    mockif.expose_services(["/x"]);
    mockif.expose_services(Vec::<String>::new());

    assert_eq!(hub.cleaned(), vec!["/x".to_string()]);
}
