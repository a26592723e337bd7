//! # Synchronization primitives
//!
//! Process-shared mutual exclusion for the task set, in the shape of
//! a `critical_section` helper that runs a closure with a lock held and
//! released on every exit path, including panics. There's no interrupt
//! controller to mask on a Linux host with multiple processes, so this
//! reaches for a POSIX semaphore living in the shared arena itself: the
//! hazard it guards against is two processes — the scheduler and a worker,
//! or two workers — touching the task set at once.
//!
//! Grounded on `ros_task_set.c`'s `sem_init(&task_set->sem, 1, 1)` — a
//! process-shared semaphore (`pshared = 1`) with initial value 1, used
//! exactly as a mutex.

use libc::sem_t;

use crate::arena::{Arena, ArenaPtr};
use crate::error::ExecError;

/// A handle to a `libc::sem_t` living at a fixed offset inside arena memory.
/// `Copy` and tiny, like every other arena handle in this crate — every
/// process that holds one refers to the same underlying semaphore because
/// it's the same bytes, mapped shared.
#[derive(Debug, Clone, Copy)]
pub struct Semaphore {
    at: ArenaPtr,
}

impl Semaphore {
    /// Constructs a handle to the semaphore stored at `at`. Does not
    /// initialize it — call [`Semaphore::init`] exactly once, from the
    /// process that owns the arena.
    pub fn at(at: ArenaPtr) -> Semaphore {
        Semaphore { at }
    }

    fn raw(&self, arena: &Arena) -> *mut sem_t {
        arena.raw_ptr(self.at) as *mut sem_t
    }

    /// Initializes the semaphore in place with `pshared = 1` (visible
    /// across `fork`, which is exactly the case this executor needs) and
    /// the given initial value.
    pub fn init(&self, arena: &Arena, value: u32) -> Result<(), ExecError> {
        let rc = unsafe { libc::sem_init(self.raw(arena), 1, value) };
        if rc != 0 {
            return Err(ExecError::Semaphore(
                std::io::Error::last_os_error().to_string(),
            ));
        }
        Ok(())
    }

    /// Acquires the semaphore, blocking until it's available. Mirrors the
    /// original's unchecked `sem_wait(&g_task_set->sem)` calls throughout
    /// `ros_task_set.c`'s callers — EINTR is retried rather than surfaced,
    /// since a spurious wakeup here should never be visible to callers.
    pub fn wait(&self, arena: &Arena) {
        loop {
            let rc = unsafe { libc::sem_wait(self.raw(arena)) };
            if rc == 0 {
                return;
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != std::io::ErrorKind::Interrupted {
                panic!("sem_wait failed: {err}");
            }
        }
    }

    /// Releases the semaphore.
    pub fn post(&self, arena: &Arena) {
        let rc = unsafe { libc::sem_post(self.raw(arena)) };
        if rc != 0 {
            panic!("sem_post failed: {}", std::io::Error::last_os_error());
        }
    }

    /// Destroys the semaphore. Must only be called once, after every
    /// process sharing it has stopped using it.
    pub fn destroy(&self, arena: &Arena) -> Result<(), ExecError> {
        let rc = unsafe { libc::sem_destroy(self.raw(arena)) };
        if rc != 0 {
            return Err(ExecError::Semaphore(
                std::io::Error::last_os_error().to_string(),
            ));
        }
        Ok(())
    }

    /// Runs `f` with the semaphore held, releasing it afterward (even if
    /// `f` panics, via the guard's `Drop`).
    pub fn critical_section<F, R>(&self, arena: &Arena, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.wait(arena);
        let _guard = ReleaseOnDrop { sem: *self, arena };
        f()
    }
}

struct ReleaseOnDrop<'a> {
    sem: Semaphore,
    arena: &'a Arena,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.sem.post(self.arena);
    }
}
