// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Threads started by `go`.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::sync::WaitGroup;
use parking_lot::Mutex;

/// Stack size of task threads.
pub const TASK_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Marks a task finished when dropped, including by a panic or by a
/// spawn that failed.
struct Finished {
    active: Arc<AtomicUsize>,
    _member: WaitGroup,
}

impl Drop for Finished {
    fn drop(&mut self) {
        // The count drops before the group member, so a woken joiner sees
        // only tasks that are still running.
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Tracks spawned tasks so a host can wait for them.
#[derive(Debug)]
pub struct TaskTracker {
    group: Mutex<WaitGroup>,
    active: Arc<AtomicUsize>,
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self {
            group: Mutex::new(WaitGroup::new()),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl TaskTracker {
    /// Creates a tracker with no tasks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks that have not finished.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Runs `task` on a new named thread.
    pub fn spawn<F>(&self, name: String, task: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.active.fetch_add(1, Ordering::SeqCst);
        let finished = Finished {
            active: self.active.clone(),
            _member: self.group.lock().clone(),
        };

        thread::Builder::new()
            .name(name)
            .stack_size(TASK_STACK_SIZE)
            .spawn(move || {
                let _finished = finished;
                task();
            })?;
        Ok(())
    }

    /// Blocks until every task has finished, including tasks spawned by
    /// tasks while waiting.
    pub fn join(&self) {
        loop {
            let group = std::mem::replace(&mut *self.group.lock(), WaitGroup::new());
            group.wait();
            if self.active() == 0 {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_waits_for_nested_tasks() {
        let tracker = Arc::new(TaskTracker::new());
        let hits = Arc::new(AtomicUsize::new(0));

        for i in 0..4 {
            let inner = tracker.clone();
            let hits = hits.clone();
            tracker
                .spawn(format!("task-{i}"), move || {
                    let hits = hits.clone();
                    inner
                        .spawn(format!("child-{i}"), move || {
                            hits.fetch_add(1, Ordering::SeqCst);
                        })
                        .unwrap();
                })
                .unwrap();
        }

        tracker.join();
        assert_eq!(hits.load(Ordering::SeqCst), 4);
        assert_eq!(tracker.active(), 0);
    }

    #[test]
    fn test_join_returns_after_a_task_panics() {
        let tracker = TaskTracker::new();
        tracker
            .spawn("panicking".to_string(), || panic!("task failed"))
            .unwrap();
        tracker.spawn("quiet".to_string(), || {}).unwrap();

        tracker.join();
        assert_eq!(tracker.active(), 0);
    }

    #[test]
    fn test_join_without_tasks_returns() {
        TaskTracker::new().join();
    }
}
