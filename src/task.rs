//! # Task set
//!
//! The array of per-task priority-ordered queues of callback records,
//! ported from `ros_task_set.c`/`.h`. Every sub-object — the task array,
//! each task's queue, every enqueued payload — is carved out of the same
//! shared [`Arena`], and the task set's own bookkeeping (`current_running_task_id`,
//! each task's `pid`, the process-shared semaphore) lives there too, so
//! every process that holds a `TaskSet` value (a handful of arena offsets,
//! trivially `Copy` across `fork`) observes identical state.

use std::mem;

use nix::unistd::Pid;

use crate::arena::{Arena, ArenaPtr};
use crate::config::MAX_TASKS;
use crate::error::{QueueError, TaskSetError};
use crate::queue::ArenaQueue;
use crate::sync::Semaphore;

/// Identifies which worker-resident function a task's callback resolves
/// to. Only one sample callback exists today (the prime-counting load
/// generator, C8) but keeping this as an enum rather than hard-coding a
/// single function call leaves room for a second callback to be resolved
/// in the worker without changing the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CallbackId {
    CountPrimes = 0,
}

impl CallbackId {
    /// Runs this callback against a one-byte wire payload.
    pub fn invoke(self, payload: u8) {
        match self {
            CallbackId::CountPrimes => crate::callback::count_primes(payload),
        }
    }
}

/// The payload descriptor owned by a [`CallbackRecord`]: an arena-relative
/// pointer to the copied wire bytes plus their length.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct CallbackData {
    pub data: ArenaPtr,
    pub data_size: u64,
}

/// One pending invocation of a task's callback.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct CallbackRecord {
    pub prio: u8,
    pub callback_data: ArenaPtr,
}

#[repr(C)]
struct TaskRecord {
    /// Worker PID, or `-1` before the worker is forked.
    pid: i64,
    callback: CallbackId,
    queue: ArenaQueue<ArenaPtr>,
}

#[repr(C)]
struct TaskSetHeader {
    /// Process-shared mutex, initial value 1. Must be the first field —
    /// `TaskSet::semaphore` relies on it sitting at offset 0.
    sem: libc::sem_t,
    /// `-1` means idle; otherwise the index of the running task.
    current_running_task_id: i64,
    tasks: ArenaPtr,
}

/// A lightweight, `Copy` handle to a task set living in arena memory. Every
/// worker and the scheduler hold their own `TaskSet` value (just two arena
/// offsets and a length) pointing at the same underlying bytes.
#[derive(Debug, Clone, Copy)]
pub struct TaskSet {
    header: ArenaPtr,
    len: usize,
}

/// A handle to one task within a [`TaskSet`], bundling the set with a
/// validated index for ergonomic per-task access.
#[derive(Debug, Clone, Copy)]
pub struct Task {
    set: TaskSet,
    id: usize,
}

impl TaskSet {
    /// Constructs a task set with `len` tasks, each given a queue of depth
    /// `queue_depth`, carving every sub-object from `arena`. Initializes
    /// the process-shared semaphore to 1.
    pub fn create(
        len: usize,
        queue_depth: usize,
        arena: &mut Arena,
    ) -> Result<TaskSet, TaskSetError> {
        if len == 0 || len > MAX_TASKS {
            return Err(TaskSetError::TaskIdOutOfRange);
        }

        let tasks_bytes = len * mem::size_of::<TaskRecord>();
        let tasks_ptr = arena
            .alloc(tasks_bytes)
            .map_err(|_| TaskSetError::AllocRecord)?;

        for i in 0..len {
            let queue =
                ArenaQueue::<ArenaPtr>::make(queue_depth, arena).map_err(|_| TaskSetError::AllocRecord)?;
            let slot = unsafe { (arena.raw_ptr(tasks_ptr) as *mut TaskRecord).add(i) };
            unsafe {
                slot.write(TaskRecord {
                    pid: -1,
                    callback: CallbackId::CountPrimes,
                    queue,
                });
            }
        }

        let header_ptr = arena
            .alloc(mem::size_of::<TaskSetHeader>())
            .map_err(|_| TaskSetError::AllocRecord)?;

        let set = TaskSet {
            header: header_ptr,
            len,
        };

        {
            let hdr = set.header_mut(arena);
            hdr.current_running_task_id = -1;
            hdr.tasks = tasks_ptr;
        }

        set.semaphore()
            .init(arena, 1)
            .map_err(|_| TaskSetError::AllocRecord)?;

        Ok(set)
    }

    fn header_ref<'a>(&self, arena: &'a Arena) -> &'a TaskSetHeader {
        unsafe { &*(arena.raw_ptr(self.header) as *const TaskSetHeader) }
    }

    fn header_mut<'a>(&self, arena: &'a Arena) -> &'a mut TaskSetHeader {
        unsafe { &mut *(arena.raw_ptr(self.header) as *mut TaskSetHeader) }
    }

    fn task_record<'a>(&self, arena: &'a Arena, task_id: usize) -> &'a TaskRecord {
        let tasks_ptr = self.header_ref(arena).tasks;
        unsafe { &*(arena.raw_ptr(tasks_ptr) as *const TaskRecord).add(task_id) }
    }

    fn task_record_mut<'a>(&self, arena: &'a Arena, task_id: usize) -> &'a mut TaskRecord {
        let tasks_ptr = self.header_ref(arena).tasks;
        unsafe { &mut *((arena.raw_ptr(tasks_ptr) as *mut TaskRecord).add(task_id)) }
    }

    /// Number of tasks in this set.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The process-shared mutex guarding every mutable field this type
    /// exposes. Callers must hold it across any read-modify-write sequence
    /// (e.g. `highest_priority_task` followed by a scheduling decision).
    pub fn semaphore(&self) -> Semaphore {
        Semaphore::at(self.header)
    }

    /// Returns a validated per-task accessor, or `None` if `task_id` is out
    /// of range. Valid ids are `0..len`, strict `<`.
    pub fn task(&self, task_id: usize) -> Option<Task> {
        if task_id < self.len {
            Some(Task { set: *self, id: task_id })
        } else {
            None
        }
    }

    pub fn current_running_task_id(&self, arena: &Arena) -> Option<usize> {
        let raw = self.header_ref(arena).current_running_task_id;
        if raw < 0 {
            None
        } else {
            Some(raw as usize)
        }
    }

    pub fn set_current_running_task_id(&self, arena: &Arena, id: Option<usize>) {
        self.header_mut(arena).current_running_task_id =
            id.map(|v| v as i64).unwrap_or(-1);
    }

    /// Copies `data` into a freshly allocated payload, wraps it in a
    /// descriptor and a record, and enqueues the record for `task_id`.
    /// Caller must hold `semaphore()`.
    pub fn enqueue_callback(
        &self,
        arena: &mut Arena,
        task_id: usize,
        prio: u8,
        data: &[u8],
    ) -> Result<(), TaskSetError> {
        if task_id >= self.len {
            return Err(TaskSetError::TaskIdOutOfRange);
        }

        let data_copy = arena
            .alloc(data.len().max(1))
            .map_err(|_| TaskSetError::AllocPayload)?;
        unsafe {
            arena.slice_mut(data_copy, data.len()).copy_from_slice(data);
        }

        let descriptor_ptr = arena
            .alloc(mem::size_of::<CallbackData>())
            .map_err(|_| TaskSetError::AllocDescriptor)?;
        unsafe {
            *(arena.raw_ptr(descriptor_ptr) as *mut CallbackData) = CallbackData {
                data: data_copy,
                data_size: data.len() as u64,
            };
        }

        let record_ptr = arena
            .alloc(mem::size_of::<CallbackRecord>())
            .map_err(|_| TaskSetError::AllocRecord)?;
        unsafe {
            *(arena.raw_ptr(record_ptr) as *mut CallbackRecord) = CallbackRecord {
                prio,
                callback_data: descriptor_ptr,
            };
        }

        let queue = self.task_record(arena, task_id).queue;
        queue.enqueue(record_ptr, arena).map_err(queue_to_task_set_error)
    }

    /// Returns the head record for `task_id` without removing it.
    pub fn peek_callback(
        &self,
        arena: &Arena,
        task_id: usize,
    ) -> Result<(ArenaPtr, CallbackRecord), TaskSetError> {
        if task_id >= self.len {
            return Err(TaskSetError::TaskIdOutOfRange);
        }
        let queue = self.task_record(arena, task_id).queue;
        let record_ptr = queue.peek(arena).map_err(queue_to_task_set_error)?;
        let record = unsafe { *(arena.raw_ptr(record_ptr) as *const CallbackRecord) };
        Ok((record_ptr, record))
    }

    /// Removes the head record for `task_id`. The caller is responsible
    /// for freeing it via [`free_callback`] afterward.
    pub fn dequeue_callback(&self, arena: &Arena, task_id: usize) -> Result<ArenaPtr, TaskSetError> {
        if task_id >= self.len {
            return Err(TaskSetError::TaskIdOutOfRange);
        }
        let queue = self.task_record(arena, task_id).queue;
        queue.dequeue(arena).map_err(queue_to_task_set_error)
    }

    /// Scans all tasks; the eligible task (non-empty queue) with the
    /// greatest head-record priority wins, ties broken by lowest task_id.
    /// `None` if no task is eligible.
    pub fn highest_priority_task(&self, arena: &Arena) -> Option<usize> {
        let mut best: Option<(usize, u8)> = None;
        for id in 0..self.len {
            let queue = self.task_record(arena, id).queue;
            let Ok(handle) = queue.peek(arena) else {
                continue;
            };
            let record = unsafe { *(arena.raw_ptr(handle) as *const CallbackRecord) };
            match best {
                Some((_, best_prio)) if record.prio <= best_prio => {}
                _ => best = Some((id, record.prio)),
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn pid(&self, arena: &Arena, task_id: usize) -> Option<Pid> {
        let raw = self.task_record(arena, task_id).pid;
        if raw < 0 {
            None
        } else {
            Some(Pid::from_raw(raw as i32))
        }
    }

    pub fn set_pid(&self, arena: &Arena, task_id: usize, pid: Pid) {
        self.task_record_mut(arena, task_id).pid = pid.as_raw() as i64;
    }

    pub fn callback_of(&self, arena: &Arena, task_id: usize) -> CallbackId {
        self.task_record(arena, task_id).callback
    }

    pub fn queue_len(&self, arena: &Arena, task_id: usize) -> usize {
        self.task_record(arena, task_id).queue.len(arena)
    }

    /// Releases every sub-object back to `arena`, in the reverse order
    /// they were allocated, and destroys the semaphore. Matches
    /// `destroy_task_set`'s ordering exactly.
    pub fn destroy(self, arena: &mut Arena) -> Result<(), TaskSetError> {
        self.semaphore()
            .destroy(arena)
            .map_err(|_| TaskSetError::NullArg)?;

        for id in (0..self.len).rev() {
            let queue = self.task_record(arena, id).queue;
            queue.destroy(arena).map_err(|_| TaskSetError::NullArg)?;
        }

        let tasks_ptr = self.header_ref(arena).tasks;
        arena.free(tasks_ptr).map_err(|_| TaskSetError::NullArg)?;
        arena.free(self.header).map_err(|_| TaskSetError::NullArg)?;
        Ok(())
    }
}

fn queue_to_task_set_error(e: QueueError) -> TaskSetError {
    match e {
        QueueError::Full => TaskSetError::QueueFull,
        QueueError::Empty => TaskSetError::QueueEmpty,
        QueueError::BadArg | QueueError::Alloc => TaskSetError::NullArg,
    }
}

/// Frees a callback record's payload, descriptor, and record, in that
/// order — the exact reverse of `TaskSet::enqueue_callback`'s allocation
/// order, matching `free_task_callback` in the original C.
pub fn free_callback(arena: &mut Arena, record_ptr: ArenaPtr) -> Result<(), TaskSetError> {
    let record = unsafe { *(arena.raw_ptr(record_ptr) as *const CallbackRecord) };
    let descriptor_ptr = record.callback_data;
    let descriptor = unsafe { *(arena.raw_ptr(descriptor_ptr) as *const CallbackData) };

    arena.free(descriptor.data).map_err(|_| TaskSetError::NullArg)?;
    arena.free(descriptor_ptr).map_err(|_| TaskSetError::NullArg)?;
    arena.free(record_ptr).map_err(|_| TaskSetError::NullArg)?;
    Ok(())
}

impl Task {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn set(&self) -> TaskSet {
        self.set
    }

    pub fn pid(&self, arena: &Arena) -> Option<Pid> {
        self.set.pid(arena, self.id)
    }

    pub fn callback(&self, arena: &Arena) -> CallbackId {
        self.set.callback_of(arena, self.id)
    }

    pub fn queue_len(&self, arena: &Arena) -> usize {
        self.set.queue_len(arena, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_arena(size: usize) -> Arena {
        let buf = Box::leak(vec![0u8; size].into_boxed_slice());
        Arena::install(buf).unwrap()
    }

    #[test]
    fn enqueue_peek_dequeue_roundtrip() {
        let mut arena = fresh_arena(8192);
        let set = TaskSet::create(3, 5, &mut arena).unwrap();

        set.enqueue_callback(&mut arena, 0, 10, &[b'a']).unwrap();
        let (ptr, record) = set.peek_callback(&arena, 0).unwrap();
        assert_eq!(record.prio, 10);
        assert_eq!(set.dequeue_callback(&arena, 0).unwrap(), ptr);
        free_callback(&mut arena, ptr).unwrap();
        assert_eq!(set.queue_len(&arena, 0), 0);
    }

    #[test]
    fn invalid_task_id_rejected() {
        let mut arena = fresh_arena(8192);
        let set = TaskSet::create(3, 5, &mut arena).unwrap();
        assert_eq!(
            set.enqueue_callback(&mut arena, 9, 10, &[1]),
            Err(TaskSetError::TaskIdOutOfRange)
        );
    }

    #[test]
    fn queue_full_is_reported() {
        let mut arena = fresh_arena(8192);
        let set = TaskSet::create(1, 2, &mut arena).unwrap();
        set.enqueue_callback(&mut arena, 0, 1, &[1]).unwrap();
        set.enqueue_callback(&mut arena, 0, 1, &[2]).unwrap();
        assert_eq!(
            set.enqueue_callback(&mut arena, 0, 1, &[3]),
            Err(TaskSetError::QueueFull)
        );
    }

    #[test]
    fn highest_priority_tie_break_is_lowest_id() {
        let mut arena = fresh_arena(8192);
        let set = TaskSet::create(3, 5, &mut arena).unwrap();
        set.enqueue_callback(&mut arena, 2, 50, &[1]).unwrap();
        set.enqueue_callback(&mut arena, 0, 50, &[2]).unwrap();
        assert_eq!(set.highest_priority_task(&arena), Some(0));
    }

    #[test]
    fn highest_priority_prefers_strictly_greater() {
        let mut arena = fresh_arena(8192);
        let set = TaskSet::create(3, 5, &mut arena).unwrap();
        set.enqueue_callback(&mut arena, 0, 10, &[1]).unwrap();
        set.enqueue_callback(&mut arena, 1, 99, &[2]).unwrap();
        set.enqueue_callback(&mut arena, 2, 50, &[3]).unwrap();
        assert_eq!(set.highest_priority_task(&arena), Some(1));
    }

    #[test]
    fn no_eligible_task_returns_none() {
        let mut arena = fresh_arena(8192);
        let set = TaskSet::create(3, 5, &mut arena).unwrap();
        assert_eq!(set.highest_priority_task(&arena), None);
    }
}
