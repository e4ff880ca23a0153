//! Shared FIFO backlog of pending check tasks
//!
//! Workers dequeue concurrently; a semaphore permit accounts for each queued
//! item so `dequeue` can wait without busy-polling. Drain sentinels (poison
//! pills) travel through the same queue and tell a consuming worker that no
//! more work is coming.

use crate::pool::task::Task;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Semaphore;

/// An item handed to a dequeuing worker
#[derive(Debug)]
pub enum QueueItem {
    /// A task to execute
    Task(Task),

    /// Drain sentinel: no more work, terminate
    Drain,
}

/// FIFO multi-consumer task queue
///
/// `enqueue` never blocks; `dequeue` waits until an item is available.
/// No two consumers ever receive the same item.
pub struct TaskQueue {
    items: Mutex<VecDeque<QueueItem>>,
    ready: Semaphore,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            ready: Semaphore::new(0),
        }
    }

    /// Appends a task in FIFO position
    pub fn enqueue(&self, task: Task) {
        self.items.lock().unwrap().push_back(QueueItem::Task(task));
        self.ready.add_permits(1);
    }

    /// Appends a drain sentinel; exactly one consumer will receive it
    pub fn push_drain(&self) {
        self.items.lock().unwrap().push_back(QueueItem::Drain);
        self.ready.add_permits(1);
    }

    /// Removes and returns all queued tasks, dropping queued sentinels
    ///
    /// Used by the supervisor when aborting a session.
    pub fn clear(&self) -> Vec<Task> {
        let mut items = self.items.lock().unwrap();
        let drained: Vec<Task> = items
            .drain(..)
            .filter_map(|item| match item {
                QueueItem::Task(t) => Some(t),
                QueueItem::Drain => None,
            })
            .collect();

        // Consume the permits that backed the drained items. A consumer may
        // already hold one of them; its pop will come up empty and it will
        // go back to waiting.
        while let Ok(permit) = self.ready.try_acquire() {
            permit.forget();
        }

        drained
    }

    /// Number of items currently queued (tasks and sentinels)
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits for and returns the next item
    pub async fn dequeue(&self) -> QueueItem {
        loop {
            let permit = match self.ready.acquire().await {
                Ok(p) => p,
                // The semaphore is never closed; treat it as a drain if it
                // ever is.
                Err(_) => return QueueItem::Drain,
            };
            permit.forget();

            if let Some(item) = self.items.lock().unwrap().pop_front() {
                return item;
            }
            // Raced with clear(); wait for the next item.
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
