//! # Process port layer
//!
//! Where the teacher's `arch::cortex_m4` isolates "how do I actually force
//! a context switch" behind `trigger_pendsv()`/`start_first_task()`, this
//! port isolates "how do I actually force a worker process to stop running
//! and later resume" behind the same kind of thin, architecture-named
//! module. The Cortex-M4 port drives PendSV/SysTick registers; this port
//! drives `SIGSTOP`/`SIGCONT` via `nix::sys::signal` — both are "the one
//! primitive the OS/hardware gives us to yank control away from whoever's
//! running right now."
//!
//! Grounded on `ros_executor_prototype.c`'s `task_routine`, which
//! self-suspends with `kill(g_pid, SIGSTOP)` before running its callback.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::error::ExecError;

/// Sends `SIGSTOP` to `pid`, asking the kernel to suspend it. The target
/// is not guaranteed to have stopped by the time this returns — only that
/// it stops *eventually*, and the scheduler issues at most one stop before
/// a matching resume for that target.
pub fn stop(pid: Pid) -> Result<(), ExecError> {
    signal::kill(pid, Signal::SIGSTOP).map_err(ExecError::Signal)
}

/// Sends `SIGCONT` to `pid`, resuming a previously stopped worker.
pub fn resume(pid: Pid) -> Result<(), ExecError> {
    signal::kill(pid, Signal::SIGCONT).map_err(ExecError::Signal)
}

/// Self-suspends the calling process by raising `SIGSTOP` against itself.
/// Called by a worker at the top of its loop to wait for the scheduler's
/// next resume signal.
pub fn self_suspend() -> Result<(), ExecError> {
    signal::raise(Signal::SIGSTOP).map_err(ExecError::Signal)
}
