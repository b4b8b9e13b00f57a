//! Thread-safe FIFO of pending tasks plus the unit's shutdown flag.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::task::Task;

/// Unbounded, synchronized FIFO shared by the message adapter and the unit.
///
/// The pending tasks and the shutdown flag live under one lock.
pub struct TaskQueue {
    inner: Mutex<TaskQueueState>,
    available: Condvar,
}

struct TaskQueueState {
    queue: VecDeque<Task>,
    shutdown_requested: bool,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    /// Create an empty task queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TaskQueueState {
                queue: VecDeque::new(),
                shutdown_requested: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append a task to the tail. Always succeeds, also after shutdown was
    /// requested; such late tasks may or may not be executed.
    pub fn push(&self, task: Task) {
        let mut guard = self.inner.lock();
        guard.queue.push_back(task);
        self.available.notify_one();
    }

    /// Pop the head without blocking.
    pub fn pop_if_available(&self) -> Option<Task> {
        self.inner.lock().queue.pop_front()
    }

    /// Ask the consumer to stop once the queue is drained. Idempotent.
    pub fn request_shutdown(&self) {
        let mut guard = self.inner.lock();
        guard.shutdown_requested = true;
        self.available.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.lock().shutdown_requested
    }

    /// Current number of queued tasks.
    pub fn size(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Shutdown flag and queue length, read under a single lock acquisition.
    pub fn snapshot(&self) -> (bool, usize) {
        let guard = self.inner.lock();
        (guard.shutdown_requested, guard.queue.len())
    }

    /// Wait up to `timeout` for a task or a shutdown request.
    ///
    /// Returns immediately if either is already present. Returns `true` if
    /// there is something for the consumer to act on.
    pub fn wait_for_work(&self, timeout: Duration) -> bool {
        let mut guard = self.inner.lock();
        if guard.queue.is_empty() && !guard.shutdown_requested {
            // Wait releases the lock and re-acquires it before returning.
            let _ = self.available.wait_for(&mut guard, timeout);
        }
        !guard.queue.is_empty() || guard.shutdown_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Instant;

    fn order(id: u32) -> Task {
        Task::order(id, format!("task-{id}"))
    }

    fn order_id(task: &Task) -> u32 {
        match task {
            Task::Order { order_id, .. } => *order_id,
            other => panic!("unexpected task {other:?}"),
        }
    }

    #[test]
    fn tasks_pop_in_push_order() {
        let queue = TaskQueue::new();
        queue.push(order(1));
        queue.push(Task::move_to(Position::new(1.0, 2.0, 0.0)));
        queue.push(order(3));
        assert_eq!(queue.size(), 3);

        assert_eq!(queue.pop_if_available(), Some(order(1)));
        assert_eq!(
            queue.pop_if_available(),
            Some(Task::move_to(Position::new(1.0, 2.0, 0.0)))
        );
        assert_eq!(queue.pop_if_available(), Some(order(3)));
        assert_eq!(queue.pop_if_available(), None);
    }

    #[test]
    fn mixed_tasks_drain_once_across_consumers() {
        let queue = TaskQueue::new();
        for id in 0..60u32 {
            queue.push(order(id));
            queue.push(Task::move_to(Position::new(f64::from(id), -1.0, 0.0)));
        }
        queue.request_shutdown();

        // Consumers keep what they pop; nothing is shared until the join.
        let drained: Vec<Vec<Task>> = thread::scope(|scope| {
            let workers: Vec<_> = (0..3)
                .map(|_| {
                    scope.spawn(|| {
                        let mut taken = Vec::new();
                        while let Some(task) = queue.pop_if_available() {
                            taken.push(task);
                        }
                        taken
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().expect("consumer thread panicked"))
                .collect()
        });

        let mut order_ids = Vec::new();
        let mut move_xs = Vec::new();
        for task in drained.into_iter().flatten() {
            match task {
                Task::Order { order_id, .. } => order_ids.push(order_id),
                Task::Move { target } => move_xs.push(target.coords.x as u32),
            }
        }
        order_ids.sort_unstable();
        move_xs.sort_unstable();
        assert_eq!(order_ids, (0..60).collect::<Vec<_>>());
        assert_eq!(move_xs, (0..60).collect::<Vec<_>>());
        assert_eq!(queue.snapshot(), (true, 0));
    }

    #[test]
    fn concurrent_producers_keep_per_producer_order() {
        let queue = Arc::new(TaskQueue::new());
        let producers = 4u32;
        let per_producer = 50u32;
        let barrier = Arc::new(Barrier::new(producers as usize));

        let handles: Vec<_> = (0..producers)
            .map(|producer| {
                let queue = Arc::clone(&queue);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for seq in 0..per_producer {
                        queue.push(order(producer * 1000 + seq));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("producer thread panicked");
        }

        let mut last_seq = vec![None; producers as usize];
        while let Some(task) = queue.pop_if_available() {
            let id = order_id(&task);
            let (producer, seq) = ((id / 1000) as usize, id % 1000);
            if let Some(prev) = last_seq[producer] {
                assert!(seq > prev, "producer {producer} out of order");
            }
            last_seq[producer] = Some(seq);
        }
        assert!(last_seq.iter().all(|seq| *seq == Some(per_producer - 1)));
    }

    #[test]
    fn shutdown_is_idempotent_and_keeps_tasks() {
        let queue = TaskQueue::new();
        queue.push(order(1));
        assert_eq!(queue.snapshot(), (false, 1));
        queue.request_shutdown();
        queue.request_shutdown();
        assert!(queue.is_shutdown());
        assert_eq!(queue.snapshot(), (true, 1));

        // Late pushes are accepted.
        queue.push(order(2));
        assert_eq!(queue.size(), 2);
    }

    #[test]
    fn wait_for_work_wakes_on_push() {
        let queue = Arc::new(TaskQueue::new());
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            ready_tx.send(()).expect("send ready");
            let woke = queue_clone.wait_for_work(Duration::from_secs(5));
            done_tx.send(woke).expect("send woke");
        });

        ready_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("ready");
        queue.push(order(99));

        let woke = done_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("receive wake");
        assert!(woke);
        handle.join().expect("waiting thread panicked");
    }

    #[test]
    fn wait_for_work_wakes_on_shutdown() {
        let queue = Arc::new(TaskQueue::new());
        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || queue_clone.wait_for_work(Duration::from_secs(5)));

        thread::sleep(Duration::from_millis(20));
        queue.request_shutdown();
        assert!(handle.join().expect("waiting thread panicked"));
    }

    #[test]
    fn wait_for_work_times_out_when_idle() {
        let queue = TaskQueue::new();
        let start = Instant::now();
        assert!(!queue.wait_for_work(Duration::from_millis(20)));
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
