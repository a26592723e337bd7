//! # Executor configuration
//!
//! Startup-time configuration, assembled from CLI flags via `clap`. Every
//! value here is read from argv once at process start rather than baked
//! in at compile time — a host process has no linker script to carry
//! compile-time constants in.

use clap::Parser;

/// Default size, in bytes, of the shared arena backing all task-set state.
pub const DEFAULT_ARENA_SIZE: usize = 8192;

/// Default per-task input queue depth.
pub const DEFAULT_QUEUE_DEPTH: usize = 5;

/// Default depth of the scheduler's private preemption stack.
pub const DEFAULT_STACK_DEPTH: usize = 255;

/// Default TCP listener port, matching `ros_executor_simulator.c`'s default.
pub const DEFAULT_PORT: u16 = 4290;

/// Default POSIX shared-memory object name, matching the original C's
/// `shm_map_name`.
pub const DEFAULT_SHM_NAME: &str = "ros_exec_shm";

/// Maximum number of tasks a single executor run may manage.
pub const MAX_TASKS: usize = 255;

/// Executor-wide configuration, parsed once at startup and threaded
/// through `Executor`/`Worker` construction. Immutable after that point —
/// tasks are never registered dynamically once the executor is running.
#[derive(Parser, Debug, Clone)]
#[command(name = "executor", about = "Preemptive fixed-priority callback executor")]
pub struct ExecConfig {
    /// Number of tasks (and workers) to manage. Must be in `1..=255`.
    pub n_tasks: u8,

    /// TCP port the ingress listener binds to.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Size, in bytes, of the shared arena backing the task set.
    #[arg(long = "arena-size", default_value_t = DEFAULT_ARENA_SIZE)]
    pub arena_size: usize,

    /// Depth of each task's input queue.
    #[arg(long = "queue-depth", default_value_t = DEFAULT_QUEUE_DEPTH)]
    pub queue_depth: usize,

    /// Depth of the scheduler's private preemption stack.
    #[arg(long = "stack-depth", default_value_t = DEFAULT_STACK_DEPTH)]
    pub stack_depth: usize,

    /// Name of the POSIX shared-memory object to create.
    #[arg(long = "shm-name", default_value = DEFAULT_SHM_NAME)]
    pub shm_name: String,
}

impl ExecConfig {
    /// Validate the fields that `clap`'s type system cannot express:
    /// `n_tasks` must be nonzero (the upper bound of 255 is already
    /// enforced by its `u8` type), and so must `stack_depth`.
    pub fn validate(&self) -> Result<(), crate::error::ExecError> {
        if self.n_tasks == 0 {
            return Err(crate::error::ExecError::Config(
                "n_tasks must be a positive integer".into(),
            ));
        }
        if self.stack_depth == 0 {
            return Err(crate::error::ExecError::Config(
                "stack_depth must be nonzero".into(),
            ));
        }
        Ok(())
    }
}
