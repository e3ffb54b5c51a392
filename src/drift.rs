use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender};

use crate::clock::Clock;

/// "Is the process actively presenting frames right now." Supplied by the
/// host; the drift watcher polls it while a track is scheduled.
pub trait FocusSignal: Send + Sync {
    fn is_rendering(&self) -> bool;
}

impl FocusSignal for AtomicBool {
    fn is_rendering(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Tracks transitions between rendering and suspended, yielding the length of
/// each completed suspension so the scheduler can shift its deadline by
/// exactly the lost interval.
#[derive(Debug, Default)]
pub struct DriftWatcher {
    suspended_at: Option<Duration>,
}

impl DriftWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one observation of the rendering signal. Returns the correction
    /// to apply when a suspension has just ended.
    pub fn observe(&mut self, rendering: bool, now: Duration) -> Option<Duration> {
        match (rendering, self.suspended_at) {
            (false, None) => {
                self.suspended_at = Some(now);
                None
            }
            (true, Some(start)) => {
                self.suspended_at = None;
                Some(now.saturating_sub(start))
            }
            _ => None,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }
}

/// Handle to a running drift watcher thread. The thread exits on its own once
/// `active` is cleared; `reap` joins it so a new watcher is only ever started
/// after the previous one has observably stopped.
pub struct DriftHandle {
    pub corrections: Receiver<Duration>,
    active: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl DriftHandle {
    pub fn stop(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Signals the thread to exit and waits for it. Bounded by one poll
    /// interval.
    pub fn reap(mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Spawns the watcher for one active-track episode. The returned handle's
/// `active` flag doubles as the scheduler's "event is active" signal: the
/// scheduler clears it at deactivation and the thread exits on its next poll.
pub fn spawn_drift_watcher(
    clock: Arc<dyn Clock>,
    focus: Arc<dyn FocusSignal>,
    poll_interval: Duration,
) -> DriftHandle {
    let active = Arc::new(AtomicBool::new(true));
    let (tx, rx) = crossbeam::channel::unbounded();

    let thread_active = active.clone();
    let thread = std::thread::spawn(move || {
        drift_thread(thread_active, clock, focus, tx, poll_interval);
    });

    DriftHandle {
        corrections: rx,
        active,
        thread: Some(thread),
    }
}

fn drift_thread(
    active: Arc<AtomicBool>,
    clock: Arc<dyn Clock>,
    focus: Arc<dyn FocusSignal>,
    corrections: Sender<Duration>,
    poll_interval: Duration,
) {
    let mut watcher = DriftWatcher::new();

    while active.load(Ordering::Acquire) {
        if let Some(lost) = watcher.observe(focus.is_rendering(), clock.now())
            && corrections.send(lost).is_err()
        {
            break;
        }
        std::thread::sleep(poll_interval);
    }

    tracing::debug!("drift watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn no_correction_while_rendering() {
        let mut watcher = DriftWatcher::new();
        assert_eq!(watcher.observe(true, Duration::from_secs(1)), None);
        assert_eq!(watcher.observe(true, Duration::from_secs(2)), None);
        assert!(!watcher.is_suspended());
    }

    #[test]
    fn correction_equals_suspended_interval() {
        let mut watcher = DriftWatcher::new();
        assert_eq!(watcher.observe(false, Duration::from_secs(5)), None);
        assert!(watcher.is_suspended());
        // still suspended, no correction yet
        assert_eq!(watcher.observe(false, Duration::from_secs(8)), None);
        assert_eq!(
            watcher.observe(true, Duration::from_secs(9)),
            Some(Duration::from_secs(4))
        );
        assert!(!watcher.is_suspended());
    }

    #[test]
    fn repeated_suspensions_each_yield_a_correction() {
        let mut watcher = DriftWatcher::new();
        watcher.observe(false, Duration::from_secs(1));
        assert_eq!(
            watcher.observe(true, Duration::from_secs(2)),
            Some(Duration::from_secs(1))
        );
        watcher.observe(false, Duration::from_secs(10));
        assert_eq!(
            watcher.observe(true, Duration::from_secs(13)),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn thread_exits_when_flag_clears() {
        let clock = Arc::new(ManualClock::new());
        let focus = Arc::new(AtomicBool::new(true));
        let handle = spawn_drift_watcher(clock, focus, Duration::from_millis(1));
        handle.reap();
    }

    #[test]
    fn thread_reports_suspension() {
        let clock = Arc::new(ManualClock::new());
        let focus = Arc::new(AtomicBool::new(true));
        let handle = spawn_drift_watcher(
            clock.clone(),
            focus.clone(),
            Duration::from_millis(1),
        );

        focus.store(false, Ordering::Release);
        std::thread::sleep(Duration::from_millis(20));
        clock.advance(Duration::from_secs(30));
        focus.store(true, Ordering::Release);

        let lost = handle
            .corrections
            .recv_timeout(Duration::from_secs(2))
            .expect("correction should arrive");
        assert_eq!(lost, Duration::from_secs(30));
        handle.reap();
    }
}
