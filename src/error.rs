//! # Error taxonomy
//!
//! One enum per component boundary: resource exhaustion, protocol
//! violation, internal consistency, initialisation failure. No error ever
//! reaches a user callback: callbacks receive only well-formed payloads,
//! or are not invoked at all.

use thiserror::Error;

/// Errors raised by the arena allocator.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    /// The backing buffer is smaller than `size_of::<ArenaHeader>() + 3 * unit_size`.
    #[error("arena buffer too small: need at least {needed} bytes, got {given}")]
    TooSmall { needed: usize, given: usize },

    /// No block on the circular free list satisfies the request.
    #[error("arena out of memory: no free block large enough")]
    OutOfMemory,

    /// A zero-size allocation was requested.
    #[error("arena cannot allocate zero bytes")]
    ZeroSize,

    /// `free` was handed a pointer that does not lie within the arena's
    /// managed byte range.
    #[error("arena pointer out of range")]
    OutOfRange,
}

/// Errors raised by the bounded ring-buffer queue.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue received a bad argument")]
    BadArg,

    #[error("queue is full")]
    Full,

    #[error("queue is empty")]
    Empty,

    /// The queue's backing array could not be obtained from the allocator.
    #[error("queue allocation failed")]
    Alloc,
}

/// Errors raised by the task set. The original C code this is ported
/// from uses two separate numeric error tables, one for `enqueue_callback`
/// (codes 1-6) and one for `peek`/`dequeue` (codes 1-3); this unifies them
/// into one enum since Rust doesn't need the numeric code to dispatch on
/// the error kind, but each variant's doc comment names the table(s) and
/// code(s) it stands in for.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TaskSetError {
    /// enqueue code 1, peek/dequeue code 1.
    #[error("null argument")]
    NullArg,

    /// enqueue code 2, peek/dequeue code 2.
    #[error("task_id out of range")]
    TaskIdOutOfRange,

    /// enqueue code 3.
    #[error("cannot allocate payload copy")]
    AllocPayload,

    /// enqueue code 4.
    #[error("cannot allocate data descriptor")]
    AllocDescriptor,

    /// enqueue code 5.
    #[error("cannot allocate record")]
    AllocRecord,

    /// enqueue code 6.
    #[error("queue full")]
    QueueFull,

    /// peek/dequeue code 3.
    #[error("queue empty")]
    QueueEmpty,
}

/// Top-level executor error, covering initialisation failures that are
/// always fatal: shared memory, semaphore, fork, bind.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("shared memory error: {0}")]
    Shm(String),

    #[error("semaphore error: {0}")]
    Semaphore(String),

    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),

    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("arena error: {0}")]
    Arena(#[from] ArenaError),

    #[error("task set error: {0}")]
    TaskSet(#[from] TaskSetError),

    #[error("signal delivery failed: {0}")]
    Signal(#[source] nix::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
