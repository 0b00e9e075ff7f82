//! Task registry: handle -> `Task` record, with bounded terminal-task retention.
//!
//! Grounded on the teacher's `pool.rs` slot-bookkeeping style and the
//! Polkadot PVF queue's `running` map, adapted from "pool of interpreter
//! slots" to "pool of task records" with a retention sweep instead of a
//! fixed-size slot count.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{TASK_RETENTION_CAP, TASK_RETENTION_SWEEP_INTERVAL};
use crate::model::{Handle, Task, TaskData, TaskResult};

#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<Handle, Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        TaskRegistry {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, data: TaskData, priority: i64) -> Task {
        let task = Task::new(data, priority);
        self.tasks.lock().unwrap().insert(task.id.clone(), task.clone());
        task
    }

    pub fn get(&self, id: &Handle) -> Option<Task> {
        self.tasks.lock().unwrap().get(id).cloned()
    }

    pub fn mark_running(&self, id: &Handle) {
        if let Some(task) = self.tasks.lock().unwrap().get_mut(id) {
            task.mark_running();
        }
    }

    pub fn mark_completed(&self, id: &Handle, result: TaskResult) {
        if let Some(task) = self.tasks.lock().unwrap().get_mut(id) {
            task.mark_completed(result);
        }
    }

    pub fn mark_failed(&self, id: &Handle, error: impl Into<String>) {
        if let Some(task) = self.tasks.lock().unwrap().get_mut(id) {
            task.mark_failed(error);
        }
    }

    pub fn total_tasks(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Evicts terminal tasks beyond `cap`, oldest-by-completion first.
    fn sweep_once(&self, cap: usize) {
        let mut tasks = self.tasks.lock().unwrap();
        let mut terminal: Vec<(Handle, u64)> = tasks
            .values()
            .filter_map(|t| t.completed_at.map(|ts| (t.id.clone(), ts)))
            .collect();
        if terminal.len() <= cap {
            return;
        }
        terminal.sort_by_key(|(_, ts)| *ts);
        let evict_count = terminal.len() - cap;
        for (id, _) in terminal.into_iter().take(evict_count) {
            tasks.remove(&id);
        }
        debug!(evicted = evict_count, "swept terminal tasks beyond retention cap");
    }

    pub async fn run_retention_sweeper(
        registry: std::sync::Arc<TaskRegistry>,
        cancel: CancellationToken,
    ) {
        let mut interval = tokio::time::interval(TASK_RETENTION_SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => registry.sweep_once(TASK_RETENTION_CAP),
                _ = cancel.cancelled() => break,
            }
        }
    }
}
