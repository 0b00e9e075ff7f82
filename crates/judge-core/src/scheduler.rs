//! Priority scheduler / worker pool (§4.3 + §4.4's dispatch discipline).
//!
//! Grounded on the teacher's `pool.rs` actor/slot model — a fixed number of
//! concurrent execution units, each processing one item at a time, with
//! dispatch decided from shared state rather than by the units themselves —
//! translated from `std::thread` + `Condvar` to `tokio::task::spawn` driven
//! by a single `std::sync::Mutex` around queue + active-worker bookkeeping
//! (handler execution runs outside that lock, matching the teacher's design
//! of keeping slot dispatch decisions separate from slot work). The
//! dequeue-on-capacity check mirrors the Polkadot PVF queue's
//! `can_afford_one_more()`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use crate::handlers::{run_handler, PipelineContext};
use crate::model::{Handle, Task, TaskData};
use crate::queue::{PriorityQueue, QueuedTask};
use crate::registry::TaskRegistry;

struct SchedulerState {
    queue: PriorityQueue,
    concurrency: usize,
    running_task_ids: HashSet<Handle>,
}

pub struct Scheduler {
    state: Mutex<SchedulerState>,
    registry: Arc<TaskRegistry>,
    ctx: Arc<PipelineContext>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub queue_size: usize,
    pub active_workers: usize,
    pub concurrency: usize,
    pub running_task_ids: Vec<Handle>,
    pub total_tasks: usize,
}

impl Scheduler {
    pub fn new(
        registry: Arc<TaskRegistry>,
        ctx: Arc<PipelineContext>,
        concurrency: usize,
    ) -> Arc<Self> {
        Arc::new(Scheduler {
            state: Mutex::new(SchedulerState {
                queue: PriorityQueue::new(),
                concurrency: concurrency.max(1),
                running_task_ids: HashSet::new(),
            }),
            registry,
            ctx,
        })
    }

    /// Enqueues a new task and returns its initial (`pending`) snapshot.
    pub fn submit(self: &Arc<Self>, data: TaskData, priority: i64) -> Task {
        let task = self.registry.insert(data, priority);
        {
            let mut state = self.state.lock().unwrap();
            state.queue.push(QueuedTask {
                task_id: task.id.clone(),
                priority,
                created_at: task.created_at,
            });
        }
        self.try_dispatch();
        task
    }

    /// Updates worker concurrency. Increasing it admits more tasks
    /// immediately; decreasing it never preempts already-running tasks.
    pub fn set_concurrency(self: &Arc<Self>, n: usize) {
        {
            let mut state = self.state.lock().unwrap();
            state.concurrency = n.max(1);
        }
        self.try_dispatch();
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.state.lock().unwrap();
        SchedulerStatus {
            queue_size: state.queue.size(),
            active_workers: state.running_task_ids.len(),
            concurrency: state.concurrency,
            running_task_ids: state.running_task_ids.iter().cloned().collect(),
            total_tasks: self.registry.total_tasks(),
        }
    }

    /// Work-conserving dispatch: pulls as many ready tasks off the queue as
    /// current capacity allows, spawning one worker per task. Called after
    /// every mutation that could free or add capacity (submit, concurrency
    /// change, worker completion).
    fn try_dispatch(self: &Arc<Self>) {
        loop {
            let next = {
                let mut state = self.state.lock().unwrap();
                if state.running_task_ids.len() >= state.concurrency {
                    None
                } else if let Some(queued) = state.queue.pop() {
                    state.running_task_ids.insert(queued.task_id.clone());
                    Some(queued)
                } else {
                    None
                }
            };
            match next {
                Some(queued) => self.spawn_worker(queued.task_id),
                None => break,
            }
        }
    }

    fn spawn_worker(self: &Arc<Self>, task_id: Handle) {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler.registry.mark_running(&task_id);
            let started = Instant::now();

            match scheduler.registry.get(&task_id) {
                Some(task) => {
                    let outcome = run_handler(&task, &scheduler.ctx).await;
                    match outcome {
                        Ok(result) => scheduler.registry.mark_completed(&task_id, result),
                        Err(err) => scheduler.registry.mark_failed(&task_id, err.to_string()),
                    }
                }
                None => {
                    warn!(task_id = %task_id, "task vanished from registry before it could run");
                }
            }

            debug!(task_id = %task_id, elapsed = ?started.elapsed(), "task finished");

            {
                let mut state = scheduler.state.lock().unwrap();
                state.running_task_ids.remove(&task_id);
            }
            scheduler.try_dispatch();
        });
    }
}
