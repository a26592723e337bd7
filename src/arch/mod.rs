//! # Architecture abstraction layer
//!
//! Provides the preemption-primitive boundary for the scheduler. The
//! teacher ports PendSV/SysTick here for Cortex-M4; this executor has one
//! target (a POSIX host), so `process` is the only port, but the module
//! stays a sibling-extensible boundary the way the teacher's does.

pub mod process;
