use super::*;

#[test]
fn tokens_increase_strictly_with_every_gate() {
    let gate = ReadinessGate::new();
    let mut last = gate.token();
    for _ in 0..5 {
        let wait = gate.create();
        assert!(wait.token() > last);
        assert_eq!(wait.token(), gate.token());
        last = wait.token();
    }
}

#[tokio::test(start_paused = true)]
async fn stale_token_does_not_resolve_newer_gate() {
    let gate = Arc::new(ReadinessGate::new());
    let first = gate.create();
    let stale = gate.handle();
    assert_eq!(stale.token(), first.token());

    let second = gate.create();
    assert!(!stale.signal());
    assert!(!gate.is_resolved());

    let outcome = gate.wait_with_timeout(Duration::from_millis(100)).await;
    assert_eq!(outcome, ReadyOutcome::TimedOut);

    assert!(gate.signal(Some(second.token())));
    second.wait().await;
}

#[tokio::test]
async fn second_signal_is_a_quiet_no_op() {
    let gate = ReadinessGate::new();
    let wait = gate.create();
    let token = wait.token();

    assert!(gate.signal(Some(token)));
    assert!(!gate.signal(Some(token)));
    assert!(!gate.signal(None));
    wait.wait().await;
    assert!(gate.is_resolved());
}

#[tokio::test(start_paused = true)]
async fn wait_resolves_when_signal_arrives_before_timeout() {
    let gate = Arc::new(ReadinessGate::new());
    gate.create();
    let handle = gate.handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.signal();
    });

    let started = tokio::time::Instant::now();
    let outcome = gate.wait_with_timeout(Duration::from_millis(4000)).await;
    assert_eq!(outcome, ReadyOutcome::Signaled);
    assert_eq!(started.elapsed(), Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn silent_gate_times_out_within_bound() {
    let gate = ReadinessGate::new();
    gate.create();
    let started = tokio::time::Instant::now();
    let outcome = gate.wait_with_timeout(Duration::from_millis(4000)).await;
    assert_eq!(outcome, ReadyOutcome::TimedOut);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(4000));
    assert!(elapsed < Duration::from_millis(4010));
}

#[tokio::test]
async fn wait_without_any_gate_resolves_immediately() {
    let gate = ReadinessGate::new();
    let outcome = gate.wait_with_timeout(Duration::from_millis(1)).await;
    assert_eq!(outcome, ReadyOutcome::Signaled);
}

#[tokio::test(start_paused = true)]
async fn tokenless_signal_resolves_live_gate() {
    let gate = Arc::new(ReadinessGate::new());
    gate.create();
    let early = gate.handle();
    gate.create();

    assert!(!early.signal());
    assert!(early.signal_latest());
    assert_eq!(
        gate.wait_with_timeout(Duration::from_millis(10)).await,
        ReadyOutcome::Signaled
    );
}

#[tokio::test(start_paused = true)]
async fn waiter_on_superseded_gate_never_resolves() {
    let gate = ReadinessGate::new();
    let old = gate.create();
    let new = gate.create();
    assert!(gate.signal(Some(new.token())));

    let result = tokio::time::timeout(Duration::from_millis(500), old.wait()).await;
    assert!(result.is_err());
}
