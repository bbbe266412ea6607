//! Real-time thread setup.
//!
//! With the `rt` feature every helper performs the corresponding syscall;
//! without it they are no-ops so the core runs unprivileged in simulation.

use crate::error::SetupError;

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
pub fn lock_memory() -> Result<(), SetupError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| SetupError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
pub fn lock_memory() -> Result<(), SetupError> {
    Ok(())
}

/// Pin the calling thread to `cpu`.
#[cfg(feature = "rt")]
pub fn set_affinity(cpu: usize) -> Result<(), SetupError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| SetupError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| SetupError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
pub fn set_affinity(_cpu: usize) -> Result<(), SetupError> {
    Ok(())
}

/// Switch the calling thread to SCHED_FIFO at `priority`.
#[cfg(feature = "rt")]
pub fn set_fifo_priority(priority: i32) -> Result<(), SetupError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` is a valid sched_param; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(SetupError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
pub fn set_fifo_priority(_priority: i32) -> Result<(), SetupError> {
    Ok(())
}

/// Touch stack pages up front so the master cycle never page-faults on them.
///
/// Needs more than 64 KiB of stack; not for small worker stacks.
pub fn prefault_stack() {
    let mut buf = [0u8; 64 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Apply affinity and priority to the calling thread.
pub fn setup_thread(affinity: Option<usize>, priority: i32) -> Result<(), SetupError> {
    if let Some(cpu) = affinity {
        set_affinity(cpu)?;
    }
    set_fifo_priority(priority)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(feature = "rt"))]
    fn setup_is_noop_without_rt() {
        assert!(lock_memory().is_ok());
        assert!(setup_thread(Some(0), 80).is_ok());
    }
}
