//! # Kernel
//!
//! Top-level initialization and public API: creates the shared memory
//! region, installs the arena and task set in it, forks one worker process
//! per task, and starts the ingress boundary. There is no ISR-context
//! scheduler here, so ownership is an explicit `Executor` value rather
//! than a global singleton reached through a raw pointer.
//!
//! ## Startup sequence
//!
//! ```text
//! main()
//!   └─► Executor::start(config)
//!         ├─► SharedRegion::create  ← map shared memory
//!         ├─► Arena::install        ← format the allocator
//!         ├─► TaskSet::create       ← allocate tasks + queues
//!         ├─► Listener::bind        ← bind TCP port + notify pipe
//!         ├─► fork() × n_tasks      ← one worker process per task
//!         └─► Listener::serve       ← drive on_message/on_idle forever
//! ```

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult};
use tracing::{error, info};

use crate::arena::Arena;
use crate::config::ExecConfig;
use crate::error::ExecError;
use crate::ingress::Listener;
use crate::scheduler::Scheduler;
use crate::shm::SharedRegion;
use crate::task::TaskSet;
use crate::worker;

/// Owns the executor's shared resources for the lifetime of the scheduler
/// process: the mapped shared-memory region (and, through it, the arena
/// and task set), the forked worker PIDs, and the ingress listener. One
/// constructor covers both setup phases, since a task here is not a
/// user-supplied entry point — its callback is resolved at the worker from
/// `CallbackId`.
pub struct Executor {
    region: SharedRegion,
    scheduler: Scheduler,
    listener: Listener,
    worker_pids: Vec<nix::unistd::Pid>,
}

impl Executor {
    /// Creates the shared region, installs the arena and task set, binds
    /// the ingress listener, and forks one worker per task, driven entirely
    /// from `config` rather than per-task call sites, since every task here
    /// is homogeneous: one callback, one priority queue.
    pub fn start(config: ExecConfig) -> Result<Executor, ExecError> {
        config.validate()?;

        let mut region = SharedRegion::create(&config.shm_name, config.arena_size)?;
        let mut arena = Arena::install(region.as_slice_mut())?;
        info!(bytes = arena.capacity(), "arena installed");

        let task_set = TaskSet::create(
            config.n_tasks as usize,
            config.queue_depth,
            &mut arena,
        )?;
        info!(n_tasks = config.n_tasks, "task set created");

        let (listener, notify_write_fd) = Listener::bind(config.port)?;
        info!(port = config.port, "listener bound");

        let mut worker_pids = Vec::with_capacity(config.n_tasks as usize);
        for task_id in 0..config.n_tasks as usize {
            match unsafe { fork() }.map_err(ExecError::Fork)? {
                ForkResult::Parent { child } => {
                    task_set.set_pid(&arena, task_id, child);
                    worker_pids.push(child);
                }
                ForkResult::Child => {
                    worker::run(task_set, arena, task_id, notify_write_fd);
                }
            }
        }

        let scheduler = Scheduler::new(arena, task_set, &config);

        Ok(Executor {
            region,
            scheduler,
            listener,
            worker_pids,
        })
    }

    /// Runs the ingress boundary forever, driving the scheduler from
    /// inbound frames and worker-completion notifications. Does not return
    /// under normal operation.
    pub fn run(self) -> ! {
        self.listener.serve(self.scheduler)
    }

    /// Blocks on every forked worker. Only meaningful if the caller has
    /// already terminated them — there is no graceful shutdown. Exists for
    /// test harnesses and the CLI's `quit` command.
    pub fn reap_workers(&self) {
        for pid in &self.worker_pids {
            match waitpid(*pid, None) {
                Ok(WaitStatus::Exited(p, code)) => {
                    info!(pid = p.as_raw(), code, "worker exited");
                }
                Ok(status) => info!(?status, "worker wait status"),
                Err(e) => error!(pid = pid.as_raw(), error = %e, "waitpid failed"),
            }
        }
    }
}
