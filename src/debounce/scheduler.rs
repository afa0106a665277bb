use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// Deferred unit of work handed to a [`Scheduler`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task after a delay unless the returned token is cancelled first.
pub trait Scheduler: Send + Sync {
    fn after(&self, delay: Duration, task: Task) -> CancellationToken;
}

/// [`Scheduler`] backed by `tokio::time`.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Scheduler for TokioScheduler {
    fn after(&self, delay: Duration, task: Task) -> CancellationToken {
        let token = CancellationToken::new();
        let guard = token.clone();
        self.handle.spawn(async move {
            tokio::select! {
                biased;
                _ = guard.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if !guard.is_cancelled() {
                        task();
                    }
                }
            }
        });
        token
    }
}

/// Virtual-clock [`Scheduler`]: nothing runs until [`ManualScheduler::advance`].
///
/// Due tasks run in deadline order, ties in the order they were scheduled.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    pending: Vec<Pending>,
}

struct Pending {
    due: Duration,
    seq: u64,
    token: CancellationToken,
    task: Task,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since construction.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of armed, uncancelled tasks.
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .pending
            .iter()
            .filter(|entry| !entry.token.is_cancelled())
            .count()
    }

    /// Move the clock forward, running every task that falls due. Returns the
    /// number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut ran = 0;
        loop {
            let next = {
                let mut state = self.state.lock();
                state.pending.retain(|entry| !entry.token.is_cancelled());
                let earliest = state
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| entry.due <= target)
                    .min_by_key(|(_, entry)| (entry.due, entry.seq))
                    .map(|(index, _)| index);
                match earliest {
                    Some(index) => {
                        let entry = state.pending.swap_remove(index);
                        state.now = state.now.max(entry.due);
                        Some(entry.task)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };

            // Run outside the lock so the task may schedule again.
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn after(&self, delay: Duration, task: Task) -> CancellationToken {
        let token = CancellationToken::new();
        let mut state = self.state.lock();
        let due = state.now + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.push(Pending {
            due,
            seq,
            token: token.clone(),
            task,
        });
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_task(counter: &Arc<AtomicUsize>) -> Task {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn manual_tasks_wait_for_their_deadline() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler.after(Duration::from_millis(200), counter_task(&counter));

        assert_eq!(scheduler.advance(Duration::from_millis(199)), 0);
        assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.now(), Duration::from_millis(200));
    }

    #[test]
    fn cancelled_tasks_never_run() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let token = scheduler.after(Duration::from_millis(50), counter_task(&counter));
        token.cancel();

        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.advance(Duration::from_secs(1)), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn tasks_run_in_deadline_order() {
        let scheduler = ManualScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for (label, delay) in [("late", 300), ("early", 100), ("tie", 100)] {
            let order = Arc::clone(&order);
            scheduler.after(
                Duration::from_millis(delay),
                Box::new(move || order.lock().push(label)),
            );
        }

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(*order.lock(), vec!["early", "tie", "late"]);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_honours_cancellation() {
        let scheduler = TokioScheduler::new(Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicUsize::new(0));

        scheduler.after(Duration::from_millis(100), counter_task(&fired));
        let token = scheduler.after(Duration::from_millis(100), counter_task(&cancelled));
        token.cancel();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(cancelled.load(Ordering::SeqCst), 0);
    }
}
