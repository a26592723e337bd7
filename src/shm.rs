//! # Shared-memory bootstrap
//!
//! Wraps `shm_open`/`ftruncate`/`mmap`/`munmap`/`shm_unlink` via the `nix`
//! crate, ported from `ros_exec_shm.c`'s `map_shared_memory`/
//! `unmap_shared_memory`. The scheduler process is the sole owner of the
//! region: it creates and truncates it before forking any worker, and
//! every forked worker inherits the same `MAP_SHARED` mapping through
//! `fork` rather than opening the region itself, so there is only ever one
//! `SharedRegion` value, held by the scheduler process for the lifetime of
//! the run.

use std::ffi::CString;
use std::os::unix::io::AsRawFd;
use std::ptr::NonNull;

use nix::fcntl::OFlag;
use nix::sys::mman::{mmap, shm_open, shm_unlink, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;

use crate::error::ExecError;

/// A POSIX shared-memory region mapped into this process's address space.
/// Created once by the scheduler process, which truncates it to size and
/// unlinks it on drop; forked workers never construct their own
/// `SharedRegion` — they inherit the mapping through `fork` and work
/// directly against the `Arena` built on top of it.
pub struct SharedRegion {
    name: String,
    base: NonNull<u8>,
    size: usize,
}

// Safety: the mapped bytes are, by construction, shared and synchronized
// externally via the task-set semaphore (`sync::Semaphore`), exactly like
// `Arena`.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Creates and maps a new shared-memory region of `size` bytes,
    /// truncating it to that size. Called once, by the scheduler process,
    /// before any worker is forked.
    pub fn create(name: &str, size: usize) -> Result<SharedRegion, ExecError> {
        let cname = CString::new(name)
            .map_err(|e| ExecError::Shm(format!("invalid shm name {name:?}: {e}")))?;

        let oflag = OFlag::O_RDWR | OFlag::O_CREAT | OFlag::O_TRUNC;
        let mode = Mode::S_IRUSR | Mode::S_IWUSR;

        let fd = shm_open(&cname, oflag, mode)
            .map_err(|e| ExecError::Shm(format!("shm_open({name}) failed: {e}")))?;

        ftruncate(fd.as_raw_fd(), size as i64)
            .map_err(|e| ExecError::Shm(format!("ftruncate({name}) failed: {e}")))?;

        let base = unsafe {
            mmap(
                None,
                std::num::NonZeroUsize::new(size)
                    .ok_or_else(|| ExecError::Shm("shared region size must be nonzero".into()))?,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &fd,
                0,
            )
        }
        .map_err(|e| ExecError::Shm(format!("mmap({name}) failed: {e}")))?;

        // `fd` can be closed once mapped; the mapping keeps the object alive.
        drop(fd);

        Ok(SharedRegion {
            name: name.to_string(),
            base: base.cast(),
            size,
        })
    }

    /// The mapped bytes, as a mutable slice shared with every other process
    /// that mapped the same named region.
    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), self.size) }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        unsafe {
            let _ = nix::sys::mman::munmap(self.base.cast(), self.size);
        }
        if let Ok(cname) = CString::new(self.name.as_str()) {
            let _ = shm_unlink(&cname);
        }
    }
}
