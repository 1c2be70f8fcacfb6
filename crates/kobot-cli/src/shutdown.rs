use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Stop flag whose waits end as soon as it is triggered.
///
/// The action loop and the status loop both sleep on it between steps, so
/// Ctrl+C or Esc never has to wait out a full interval.
pub struct ShutdownSignal {
    shutdown: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    /// Trigger the shutdown signal, waking all waiting threads.
    pub fn trigger(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.condvar.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Wait for `duration` or until shutdown is triggered.
    ///
    /// Returns `true` if shutdown was triggered.
    pub fn wait(&self, duration: Duration) -> bool {
        if self.is_shutdown() {
            return true;
        }

        let Ok(guard) = self.mutex.lock() else {
            return true;
        };
        match self
            .condvar
            .wait_timeout_while(guard, duration, |_| !self.is_shutdown())
        {
            Ok((_, timeout)) => !timeout.timed_out(),
            // Poisoned mutex: another thread panicked, stop too
            Err(_) => true,
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_wait_times_out() {
        let signal = ShutdownSignal::new();
        let start = Instant::now();
        assert!(!signal.wait(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wait_interrupted() {
        let signal = Arc::new(ShutdownSignal::new());
        let waiter = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            let start = Instant::now();
            (waiter.wait(Duration::from_secs(10)), start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        signal.trigger();

        let (interrupted, elapsed) = handle.join().unwrap();
        assert!(interrupted);
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_after_trigger_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        assert!(signal.is_shutdown());
        assert!(signal.wait(Duration::from_secs(10)));
    }
}
