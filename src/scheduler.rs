//! # Scheduler
//!
//! Priority selection, preemption via signalling, and the preemption
//! stack. The scheduler recomputes the single best runnable task
//! synchronously inside `on_message`/`on_idle`, under the task-set
//! semaphore, and triggers a switch by sending `SIGCONT`/`SIGSTOP` to
//! worker PIDs via `arch::process`.
//!
//! There is no periodic tick and no payoff recomputation — this is strict
//! fixed-priority scheduling, and the only two events that can change what
//! should be running are a new message arriving (`on_message`) and a
//! worker finishing a callback (`on_idle`).

use tracing::{debug, trace, warn};

use crate::arch::process;
use crate::arena::Arena;
use crate::config::ExecConfig;
use crate::error::ExecError;
use crate::task::TaskSet;

/// Scheduler-private LIFO of task indices preempted by higher-priority
/// work, bounded by `ExecConfig::stack_depth` (default 255, matching
/// `config::MAX_TASKS`). Lives only in the scheduler process — workers
/// never see it, and it needs no lock because only the scheduler's single
/// controller thread ever touches it (see `ingress::Listener`).
#[derive(Debug, Default)]
pub struct PreemptionStack {
    entries: Vec<usize>,
    depth: usize,
}

impl PreemptionStack {
    pub fn new(depth: usize) -> PreemptionStack {
        PreemptionStack {
            entries: Vec::with_capacity(depth.min(64)),
            depth,
        }
    }

    pub fn push(&mut self, task_id: usize) -> Result<(), ExecError> {
        if self.entries.len() >= self.depth {
            return Err(ExecError::Config(format!(
                "preemption stack overflow at depth {}",
                self.depth
            )));
        }
        self.entries.push(task_id);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<usize> {
        self.entries.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// The scheduler-side state machine: an `Arena` + `TaskSet` handle (shared
/// with every worker) plus a process-private `PreemptionStack`. Owns no
/// process lifecycle of its own — `kernel::Executor` forks workers and
/// drives this type's `on_message`/`on_idle` from the ingress boundary.
pub struct Scheduler {
    arena: Arena,
    task_set: TaskSet,
    stack: PreemptionStack,
}

impl Scheduler {
    pub fn new(arena: Arena, task_set: TaskSet, config: &ExecConfig) -> Scheduler {
        Scheduler {
            arena,
            task_set,
            stack: PreemptionStack::new(config.stack_depth),
        }
    }

    pub fn task_set(&self) -> TaskSet {
        self.task_set
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// Issues the signal side of a preemption: stop `from` (if any), resume
    /// `to`. Signal delivery failures are logged and skipped — the next
    /// tick re-evaluates and may re-signal.
    fn switch_to(&self, from: Option<usize>, to: usize) {
        if let Some(from_id) = from {
            if let Some(pid) = self.task_set.pid(&self.arena, from_id) {
                if let Err(e) = process::stop(pid) {
                    warn!(task = from_id, error = %e, "failed to stop preempted worker");
                }
            }
        }
        if let Some(pid) = self.task_set.pid(&self.arena, to) {
            if let Err(e) = process::resume(pid) {
                warn!(task = to, error = %e, "failed to resume worker");
            }
        } else {
            warn!(task = to, "no pid on record for task selected to run");
        }
    }

    /// Handles one inbound 3-byte request frame: enqueues it, recomputes
    /// the best runnable task, and preempts if warranted. Releases the
    /// semaphore before signalling — a worker leaving its critical section
    /// needs the semaphore on its own side, so holding it across a signal
    /// send would risk deadlock.
    pub fn on_message(&mut self, task_id: usize, prio: u8, data: u8) {
        if task_id >= self.task_set.len() {
            warn!(task_id, "rejected message: task_id out of range");
            return;
        }

        let sem = self.task_set.semaphore();
        sem.wait(&self.arena);
        let enqueue_result =
            self.task_set
                .enqueue_callback(&mut self.arena, task_id, prio, &[data]);
        let highest = self.task_set.highest_priority_task(&self.arena);
        let running = self.task_set.current_running_task_id(&self.arena);
        sem.post(&self.arena);

        if let Err(e) = enqueue_result {
            warn!(task_id, error = %e, "dropping message: enqueue failed");
            return;
        }

        trace!(task_id, prio, running = ?running, highest = ?highest, "on_message");

        match (running, highest) {
            (None, None) => {}
            (None, Some(k)) => self.promote(None, k),
            (Some(r), Some(h)) if h == r => {}
            (Some(r), Some(h)) => {
                if self.stack.push(r).is_err() {
                    warn!(task = r, "preemption stack full, cannot preempt further");
                    return;
                }
                self.promote(Some(r), h);
            }
            (Some(_), None) => {
                // Running task exists but no eligible queue — cannot happen
                // under the semaphore (the running task's record is still
                // peeked), but nothing to do either way.
            }
        }
    }

    /// Handles a worker-completion / poll-timeout tick with no attached
    /// message: pops the stack if idle, then always re-evaluates priority
    /// and preempts if warranted, even when a task is already running.
    pub fn on_idle(&mut self) {
        let sem = self.task_set.semaphore();
        sem.wait(&self.arena);
        let mut running = self.task_set.current_running_task_id(&self.arena);
        sem.post(&self.arena);

        if running.is_none() {
            if let Some(t) = self.stack.pop() {
                debug!(task = t, "resuming preempted task from stack");
                self.promote(None, t);
                running = Some(t);
            }
        }

        sem.wait(&self.arena);
        let highest = self.task_set.highest_priority_task(&self.arena);
        sem.post(&self.arena);

        match (running, highest) {
            (Some(r), Some(h)) if h != r => {
                if self.stack.push(r).is_err() {
                    warn!(task = r, "preemption stack full, cannot preempt further");
                    return;
                }
                self.promote(Some(r), h);
            }
            (None, Some(h)) => self.promote(None, h),
            _ => {}
        }
    }

    /// Updates `current_running_task_id` under the semaphore, then signals
    /// outside it — the one place both halves of "promote task `to`" always
    /// happen together.
    fn promote(&mut self, from: Option<usize>, to: usize) {
        let sem = self.task_set.semaphore();
        sem.wait(&self.arena);
        self.task_set
            .set_current_running_task_id(&self.arena, Some(to));
        sem.post(&self.arena);
        self.switch_to(from, to);
    }

    pub fn preemption_depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preemption_stack_lifo() {
        let mut stack = PreemptionStack::new(4);
        stack.push(0).unwrap();
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), Some(0));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn preemption_stack_overflow_is_reported() {
        let mut stack = PreemptionStack::new(2);
        stack.push(0).unwrap();
        stack.push(1).unwrap();
        assert!(stack.push(2).is_err());
    }

    fn fresh_scheduler(n_tasks: usize) -> (Scheduler, crate::config::ExecConfig) {
        let buf = Box::leak(vec![0u8; 16384].into_boxed_slice());
        let mut arena = Arena::install(buf).unwrap();
        let task_set = TaskSet::create(n_tasks, 5, &mut arena).unwrap();
        let config = crate::config::ExecConfig {
            n_tasks: n_tasks as u8,
            port: 0,
            arena_size: buf_len(),
            queue_depth: 5,
            stack_depth: 255,
            shm_name: "test".into(),
        };
        (Scheduler::new(arena, task_set, &config), config)
    }

    fn buf_len() -> usize {
        16384
    }

    #[test]
    fn unknown_task_id_is_rejected_without_state_change() {
        let (mut sched, _cfg) = fresh_scheduler(3);
        sched.on_message(9, 10, b'a');
        assert_eq!(
            sched
                .task_set()
                .current_running_task_id(sched.arena()),
            None
        );
    }

    #[test]
    fn on_message_with_no_pid_does_not_panic() {
        // No worker has been forked, so `pid()` is None for every task;
        // on_message must still update bookkeeping without signalling.
        let (mut sched, _cfg) = fresh_scheduler(2);
        sched.on_message(0, 10, b'a');
        assert_eq!(
            sched.task_set().current_running_task_id(sched.arena()),
            Some(0)
        );
        assert_eq!(sched.preemption_depth(), 0);
    }

    #[test]
    fn higher_priority_message_preempts_and_pushes_stack() {
        let (mut sched, _cfg) = fresh_scheduler(2);
        sched.on_message(0, 10, b'a');
        sched.on_message(1, 20, b'b');
        assert_eq!(
            sched.task_set().current_running_task_id(sched.arena()),
            Some(1)
        );
        assert_eq!(sched.preemption_depth(), 1);
    }

    #[test]
    fn same_priority_does_not_preempt_running_task() {
        let (mut sched, _cfg) = fresh_scheduler(2);
        sched.on_message(0, 10, b'a');
        sched.on_message(0, 10, b'b');
        assert_eq!(
            sched.task_set().current_running_task_id(sched.arena()),
            Some(0)
        );
        assert_eq!(sched.preemption_depth(), 0);
    }
}
