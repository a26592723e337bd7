//! # Worker lifecycle
//!
//! Each worker is a forked process assigned a fixed `task_id`. It runs a
//! self-suspend / peek / invoke / dequeue-and-free / notify loop, ported
//! from `ros_executor_prototype.c`'s `task_routine` (`kill(g_pid,
//! SIGSTOP)` self-suspend, dispatch over `task_id`) and generalized to the
//! peek-then-dequeue contract the original C never finished wiring up.

use std::os::unix::io::RawFd;

use nix::unistd::write;
use tracing::{error, info, warn};

use crate::arch::process;
use crate::arena::Arena;
use crate::task::{self, TaskSet};

/// Runs a worker's main loop. Never returns under normal operation — a
/// worker process lives until the scheduler tears down the shared region
/// (or the process is killed). `notify_fd` is the write end of the
/// scheduler's notify pipe.
pub fn run(task_set: TaskSet, mut arena: Arena, task_id: usize, notify_fd: RawFd) -> ! {
    let task = task_set
        .task(task_id)
        .unwrap_or_else(|| panic!("worker started with out-of-range task_id {task_id}"));

    loop {
        if let Err(e) = process::self_suspend() {
            error!(task_id, error = %e, "self-suspend failed, worker exiting");
            std::process::exit(1);
        }

        let sem = task_set.semaphore();
        let peeked = sem.critical_section(&arena, || {
            task_set.set_current_running_task_id(&arena, Some(task_id));
            task_set.peek_callback(&arena, task_id)
        });

        let (record_ptr, record) = match peeked {
            Ok(v) => v,
            Err(e) => {
                warn!(task_id, error = %e, "queue empty on wake, reverting to self-suspend");
                sem.critical_section(&arena, || {
                    task_set.set_current_running_task_id(&arena, None);
                });
                continue;
            }
        };

        let payload = {
            let descriptor = unsafe {
                *(arena.raw_ptr(record.callback_data) as *const task::CallbackData)
            };
            let bytes = unsafe { arena.slice(descriptor.data, descriptor.data_size as usize) };
            bytes.first().copied().unwrap_or(0)
        };

        info!(task_id, prio = record.prio, "running callback");
        task.callback(&arena).invoke(payload);

        // Not routed through `critical_section`: the closure form needs a
        // shared borrow of `arena` alongside the call's own `&arena`
        // argument, but `free_callback` below needs a unique one. Taking
        // the semaphore by hand keeps the same lock span with no conflict.
        sem.wait(&arena);
        if let Err(e) = task_set.dequeue_callback(&arena, task_id) {
            error!(task_id, error = %e, "dequeue after callback failed");
        }
        if let Err(e) = task::free_callback(&mut arena, record_ptr) {
            error!(task_id, error = %e, "free after callback failed");
        }
        task_set.set_current_running_task_id(&arena, None);
        sem.post(&arena);

        notify(notify_fd, task_id);
    }
}

/// Writes one byte to the notify pipe, waking the scheduler's `on_idle`
/// poll.
fn notify(fd: RawFd, task_id: usize) {
    let byte = [task_id as u8];
    let borrowed = unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) };
    if let Err(e) = write(borrowed, &byte) {
        warn!(task_id, error = %e, "failed to notify scheduler");
    }
}
