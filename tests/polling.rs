use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use rand::SeedableRng;
use rand::rngs::StdRng;

use unity_cup_terminal::polling::{DEFAULT_INTERVAL, PollConfig, PollInterval, spawn_poller};

fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn first_invocation_is_immediate() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handle = spawn_poller("immediate", PollConfig::fixed(Duration::from_secs(30)), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) == 1));
    handle.join();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn delayed_start_waits_for_first_interval() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let config = PollConfig::fixed(Duration::from_secs(30)).immediate(false);
    let handle = spawn_poller("delayed", config, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    thread::sleep(Duration::from_millis(100));
    handle.join();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn stop_prevents_further_invocations() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handle = spawn_poller("stoppable", PollConfig::fixed(Duration::from_millis(20)), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) >= 2));
    handle.stop();
    assert!(handle.is_stopped());
    handle.join();
    let after_stop = calls.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(calls.load(Ordering::SeqCst), after_stop);
}

#[test]
fn dropping_the_handle_stops_the_loop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handle = spawn_poller("dropped", PollConfig::fixed(Duration::from_millis(20)), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) >= 1));
    drop(handle);

    thread::sleep(Duration::from_millis(60));
    let settled = calls.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(calls.load(Ordering::SeqCst), settled);
}

#[test]
fn errors_and_panics_do_not_end_the_loop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handle = spawn_poller("failing", PollConfig::fixed(Duration::from_millis(5)), move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        if n == 1 {
            panic!("poll callback blew up");
        }
        Err(anyhow!("server unavailable"))
    });

    assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) >= 4));
    handle.join();
}

#[test]
fn invocations_never_overlap() {
    let busy = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));
    let calls = Arc::new(AtomicUsize::new(0));
    let (b, o, c) = (busy.clone(), overlapped.clone(), calls.clone());
    let handle = spawn_poller("serial", PollConfig::fixed(Duration::from_millis(1)), move || {
        if b.swap(true, Ordering::SeqCst) {
            o.store(true, Ordering::SeqCst);
        }
        thread::sleep(Duration::from_millis(15));
        b.store(false, Ordering::SeqCst);
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) >= 4));
    handle.join();
    assert!(!overlapped.load(Ordering::SeqCst));
}

#[test]
fn jittered_delays_stay_in_half_open_range() {
    let config = PollConfig::jittered(Duration::from_millis(5000), Duration::from_millis(10000));
    let mut rng = StdRng::seed_from_u64(26);
    let mut min_seen = Duration::MAX;
    let mut max_seen = Duration::ZERO;
    for _ in 0..2000 {
        let delay = config.next_delay(&mut rng);
        assert!(delay >= Duration::from_millis(5000), "{delay:?} below range");
        assert!(delay < Duration::from_millis(10000), "{delay:?} above range");
        min_seen = min_seen.min(delay);
        max_seen = max_seen.max(delay);
    }
    assert!(max_seen - min_seen > Duration::from_millis(3000));
}

#[test]
fn interval_configuration_edge_cases() {
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(
        PollConfig::default().next_delay(&mut rng),
        Duration::from_millis(7000)
    );

    let equal = PollConfig::jittered(Duration::from_millis(500), Duration::from_millis(500));
    assert_eq!(equal.next_delay(&mut rng), Duration::from_millis(500));

    let inverted = PollConfig::jittered(Duration::from_secs(10), Duration::from_secs(5));
    assert_eq!(inverted.interval, PollInterval::Fixed(DEFAULT_INTERVAL));

    let zero = PollConfig::jittered(Duration::ZERO, Duration::ZERO);
    assert_eq!(zero.next_delay(&mut rng), DEFAULT_INTERVAL);
    assert_eq!(
        PollConfig::fixed(Duration::ZERO).next_delay(&mut rng),
        DEFAULT_INTERVAL
    );
}
