//! # rosexec — preemptive fixed-priority callback executor
//!
//! A prototype of how a robotic middleware might dispatch
//! subscription/service callbacks across a set of worker processes on a
//! single machine. Clients submit three-byte request frames
//! (`callback_id`, `priority`, `data`) over a TCP stream; the executor
//! enqueues each request against the named callback, then runs the
//! highest-priority pending callback, preempting any lower-priority
//! callback currently executing. When the high-priority work completes,
//! previously preempted work resumes, in LIFO order.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                   TCP clients                            │
//! ├────────────────────────────────────────────────────────┤
//! │              Executor API (kernel.rs)                   │
//! │             Executor::start() · run()                   │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Task set          │  Sync Primitives  │
//! │  scheduler.rs│   task.rs           │  sync.rs          │
//! │  ─ on_message│   ─ enqueue_callback│  ─ Semaphore      │
//! │  ─ on_idle   │   ─ highest_priority│                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │              Bounded queue (queue.rs)                    │
//! ├────────────────────────────────────────────────────────┤
//! │              Arena allocator (arena.rs)                  │
//! ├────────────────────────────────────────────────────────┤
//! │           Process port (arch/process.rs)                 │
//! │     SIGSTOP/SIGCONT self-suspend and worker signalling    │
//! ├────────────────────────────────────────────────────────┤
//! │        POSIX shared memory + semaphore (shm.rs)           │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling model
//!
//! Strict fixed priority, no aging or fairness. A task is eligible to run
//! whenever its input queue is non-empty; among eligible tasks the one
//! whose queue head carries the greatest priority wins, ties broken by
//! lowest task id. A newly eligible task with higher priority than the
//! currently running one preempts it: the running worker is signalled to
//! stop, its task id is pushed onto a scheduler-private preemption stack,
//! and the new task's worker is signalled to resume. When the running
//! worker finishes its callback, the scheduler pops the stack (if idle)
//! and re-evaluates, so preempted work resumes in LIFO order.
//!
//! ## Process model
//!
//! Multi-process, not multi-threaded: one scheduler process plus one
//! worker process per task, all mapping the same POSIX shared-memory
//! region. All dynamic state — the arena, the task set, every in-flight
//! callback record — lives in that region so every process observes
//! identical bytes. A process-shared semaphore serializes access to it.
//! Preemption is "stop the process" (`SIGSTOP`) and "let it continue"
//! (`SIGCONT`), not a cooperative yield.
//!
//! ## Out of scope
//!
//! Multi-host distribution, deadline or rate-monotonic analysis, aging or
//! fairness, dynamic task registration after startup, callback
//! cancellation, graceful shutdown with in-flight drain, persistence of
//! any state.

pub mod arch;
pub mod arena;
pub mod callback;
pub mod config;
pub mod error;
pub mod ingress;
pub mod kernel;
pub mod queue;
pub mod scheduler;
pub mod shm;
pub mod sync;
pub mod task;
pub mod worker;
