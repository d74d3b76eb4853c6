use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use rand::Rng;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(7000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollInterval {
    Fixed(Duration),
    /// Uniform over `[min, max)`; `min == max` degenerates to a fixed delay.
    Jitter { min: Duration, max: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: PollInterval,
    pub immediate: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: PollInterval::Fixed(DEFAULT_INTERVAL),
            immediate: true,
        }
    }
}

impl PollConfig {
    /// A zero interval falls back to the default.
    pub fn fixed(interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_INTERVAL
        } else {
            interval
        };
        Self {
            interval: PollInterval::Fixed(interval),
            immediate: true,
        }
    }

    /// A pair with `max < min` or `max == 0` is rejected in favour of the
    /// default interval.
    pub fn jittered(min: Duration, max: Duration) -> Self {
        let interval = if max >= min && !max.is_zero() {
            PollInterval::Jitter { min, max }
        } else {
            PollInterval::Fixed(DEFAULT_INTERVAL)
        };
        Self {
            interval,
            immediate: true,
        }
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn next_delay(&self, rng: &mut impl Rng) -> Duration {
        match self.interval {
            PollInterval::Fixed(d) => d,
            PollInterval::Jitter { min, max } => {
                let lo = min.as_millis() as u64;
                let hi = max.as_millis() as u64;
                if hi <= lo {
                    return min;
                }
                Duration::from_millis(rng.gen_range(lo..hi))
            }
        }
    }
}

#[derive(Debug, Default)]
struct Cancel {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl Cancel {
    fn cancel(&self) {
        let mut guard = self
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = true;
        self.wake.notify_all();
    }

    fn is_cancelled(&self) -> bool {
        *self
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sleeps for `delay` unless cancelled first. Returns true if cancelled.
    fn wait(&self, delay: Duration) -> bool {
        let guard = self
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let (guard, _) = self
            .wake
            .wait_timeout_while(guard, delay, |cancelled| !*cancelled)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard
    }
}

/// Owner of a running poll loop. Dropping it stops the loop; an invocation
/// already running finishes but is not followed by another.
#[derive(Debug)]
pub struct PollHandle {
    name: String,
    cancel: Arc<Cancel>,
    join: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the loop and waits for the worker thread to exit.
    pub fn join(mut self) {
        self.stop();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Runs `callback` repeatedly on its own thread. The next delay is rolled
/// only after the previous invocation returned, so invocations never
/// overlap. Errors and panics from the callback are logged and swallowed.
pub fn spawn_poller<F>(name: &str, config: PollConfig, mut callback: F) -> PollHandle
where
    F: FnMut() -> Result<()> + Send + 'static,
{
    let cancel = Arc::new(Cancel::default());
    let worker_cancel = cancel.clone();
    let worker_name = name.to_string();

    let join = thread::Builder::new()
        .name(format!("poll-{name}"))
        .spawn(move || {
            let mut rng = rand::thread_rng();
            if !config.immediate && worker_cancel.wait(config.next_delay(&mut rng)) {
                return;
            }
            loop {
                if worker_cancel.is_cancelled() {
                    return;
                }
                match panic::catch_unwind(AssertUnwindSafe(&mut callback)) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => log::debug!("poll {worker_name}: {err:#}"),
                    Err(_) => log::warn!("poll {worker_name}: callback panicked"),
                }
                if worker_cancel.is_cancelled() {
                    return;
                }
                if worker_cancel.wait(config.next_delay(&mut rng)) {
                    return;
                }
            }
        });

    let join = match join {
        Ok(join) => Some(join),
        Err(err) => {
            log::error!("could not spawn poller {name}: {err}");
            None
        }
    };

    PollHandle {
        name: name.to_string(),
        cancel,
        join,
    }
}
