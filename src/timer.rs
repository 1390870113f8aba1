//! The countdown timers of the chipset, the instruction based cadence they
//! are decremented with and the worker used as the external clock.
use std::{
    sync::{
        mpsc::{self, RecvTimeoutError, SyncSender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Represents a timer inside of the chip infrastruture, it will count
/// down to zero from what ever number given. The decrement is driven by
/// the [`Cadence`](Cadence), not by the wall clock.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    value: u8,
}

impl Timer {
    /// Will create a new timer with the given value.
    pub fn new(value: u8) -> Self {
        Self { value }
    }

    /// Will set the value from which the timer shall count down from.
    pub fn set_value(&mut self, value: u8) {
        self.value = value;
    }

    /// Will get the value that the counter is currently at.
    pub fn get_value(&self) -> u8 {
        self.value
    }

    pub fn is_active(&self) -> bool {
        self.value > 0
    }

    /// Decrements the timer, it never goes below zero.
    /// Returns if the timer was running before the decrement.
    pub fn decrement(&mut self) -> bool {
        let active = self.is_active();
        self.value = self.value.saturating_sub(1);
        active
    }
}

/// Counts the executed instructions and reports when the timers are due.
///
/// The counter runs from `0` up to the configured threshold, the timers
/// are due on the instruction that reaches the threshold, so every window
/// is exactly `threshold` instructions long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    cycle: u32,
    threshold: u32,
}

impl Cadence {
    pub fn new(threshold: u32) -> Self {
        Self {
            cycle: 0,
            threshold: threshold.max(1),
        }
    }

    /// Advances the cadence by a single instruction.
    ///
    /// # Example
    /// ```rust
    /// # use chip::timer::Cadence;
    /// let mut cadence = Cadence::new(3);
    /// assert!(!cadence.advance());
    /// assert!(!cadence.advance());
    /// assert!(cadence.advance());
    /// assert!(!cadence.advance());
    /// ```
    pub fn advance(&mut self) -> bool {
        self.cycle += 1;
        if self.cycle >= self.threshold {
            self.cycle = 0;
            true
        } else {
            false
        }
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.cycle = 0;
    }
}

/// The external clock, it calls the given callback once per interval
/// until it is stopped or the callback returns `false`.
pub trait TimedWorker {
    fn new() -> Self;
    fn start<T>(&mut self, callback: T, interval: Duration)
    where
        T: Send + FnMut() -> bool + 'static;
    fn stop(&mut self);
    fn is_alive(&self) -> bool;
}

/// Is the internal worker, that exists on the
/// second thread.
pub struct Worker {
    /// Contains the actuall thread, that is running.
    thread: Option<JoinHandle<()>>,
    /// Contains the sync sender used to gracefull shutdown the thread.
    shutdown: Option<SyncSender<()>>,
    /// Counts the actuall threads used. It uses an ```()``` so that it doesn't use
    /// up too much memory.
    alive: Arc<()>,
}

impl TimedWorker for Worker {
    /// Will initialize the new worker.
    fn new() -> Self {
        Self {
            thread: None,
            shutdown: None,
            alive: Arc::new(()),
        }
    }

    /// Will start the worker that will run the callback function
    /// every interval.
    /// Attention the timer assumes the callback will finish
    /// calculation faster then the interval.
    fn start<T>(&mut self, mut callback: T, interval: Duration)
    where
        T: Send + FnMut() -> bool + 'static,
    {
        // a running worker is replaced
        self.stop();

        let (send, recv) = mpsc::sync_channel::<()>(1);
        let alive = self.alive.clone();
        let thread = thread::spawn(move || {
            // only held for the reference count
            let _alive = alive;
            let mut timeout = interval;
            loop {
                match recv.recv_timeout(timeout) {
                    Err(RecvTimeoutError::Timeout) => {
                        let start = Instant::now();

                        if !callback() {
                            break;
                        }

                        // make sure there the system will at most wait the interval
                        let duration = start.elapsed();
                        timeout = interval.checked_sub(duration).unwrap_or_default();
                    }
                    Ok(_) | Err(_) => break, // shutdown
                }
            }
        });

        self.thread = Some(thread);
        self.shutdown = Some(send);
    }

    /// Will stop the worker.
    fn stop(&mut self) {
        // Will stop the worker, in two steps one by sending an empty message
        // and second by droping the only sender for the given receiver.
        if let Some(sender) = self.shutdown.take() {
            // the thread might already be gone, dropping the sender is enough then
            let _ = sender.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("The worker thread panicked.");
            }
        }
    }

    /// Checks if the thread is alive.
    fn is_alive(&self) -> bool {
        Arc::strong_count(&self.alive) > 1
    }
}

impl Drop for Worker {
    /// Will drop the worker
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_timer_floor() {
        let mut timer = Timer::new(2);
        assert!(timer.decrement());
        assert!(timer.decrement());
        assert_eq!(timer.get_value(), 0);
        assert!(!timer.decrement());
        assert_eq!(timer.get_value(), 0);
    }

    #[test]
    fn test_cadence_windows() {
        let mut cadence = Cadence::new(10);
        for window in 0..3 {
            let due: Vec<bool> = (0..10).map(|_| cadence.advance()).collect();
            assert_eq!(due.iter().filter(|d| **d).count(), 1, "window {}", window);
            assert!(due[9]);
        }
    }

    #[test]
    fn test_cadence_zero_threshold() {
        let mut cadence = Cadence::new(0);
        assert_eq!(cadence.threshold(), 1);
        assert!(cadence.advance());
        assert!(cadence.advance());
    }

    #[test]
    fn test_worker() {
        let counter = Arc::new(AtomicUsize::new(0));
        let ccounter = counter.clone();
        let mut worker = Worker::new();
        assert!(!worker.is_alive());

        worker.start(
            move || {
                ccounter.fetch_add(1, Ordering::SeqCst);
                true
            },
            Duration::from_millis(1),
        );
        assert!(worker.is_alive());

        std::thread::sleep(Duration::from_millis(100));
        worker.stop();
        assert!(!worker.is_alive());

        let ran = counter.load(Ordering::SeqCst);
        assert!(ran > 0);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(ran, counter.load(Ordering::SeqCst));
    }

    #[test]
    fn test_worker_ends_itself() {
        let counter = Arc::new(AtomicUsize::new(0));
        let ccounter = counter.clone();
        let mut worker = Worker::new();

        worker.start(
            move || ccounter.fetch_add(1, Ordering::SeqCst) < 2,
            Duration::from_millis(1),
        );

        for _ in 0..200 {
            if !worker.is_alive() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!worker.is_alive());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        worker.stop();
    }
}
