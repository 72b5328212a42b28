//! Self-process CPU and memory usage querying.
//!
//! This crate provides a cross-platform way to query how much CPU time the calling process has
//! accumulated (split into kernel and user time) and how much memory it currently occupies (working
//! set / resident size, and private / virtual size).
//!
//! ## Linux
//!
//! CPU times come from `getrusage(2)` with `RUSAGE_SELF`. Memory sizes come from
//! [procfs](https://docs.kernel.org/filesystems/proc.html): `/proc/self/status` is scanned for the
//! `VmRSS:` (resident) and `VmSize:` (virtual) fields.
//!
//! ## macOS
//!
//! CPU times come from libproc's per-process resource usage query (`RUSAGE_INFO_V2`), with the raw
//! Mach tick counts scaled through the kernel timebase ratio. Memory sizes come from the
//! all-task-info query (`PROC_PIDTASKALLINFO`), which reports them directly in bytes.
//!
//! ## Windows
//!
//! CPU times come from `GetProcessTimes`, and memory sizes from `GetProcessMemoryInfo` using the
//! extended memory counters.
//!
//! ## Unsupported platforms
//!
//! Every query returns zero.
//!
//! ## Failure behavior
//!
//! None of the queries can fail or panic: any underlying failure (an OS call returning an error, a
//! missing or malformed procfs field, an unsupported platform) collapses to a zero reading. A zero
//! result is therefore indistinguishable from the process truly having zero recorded usage. Callers
//! that care about the difference can enable debug-level logging, which notes each absorbed
//! failure.

use std::time::Duration;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
use linux as sys;

#[cfg(target_os = "macos")]
mod darwin;
#[cfg(target_os = "macos")]
use darwin as sys;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
use windows as sys;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
mod fallback {
    use std::time::Duration;

    use super::CpuSample;

    pub(crate) fn cpu_sample() -> CpuSample {
        CpuSample {
            kernel: Duration::ZERO,
            user: Duration::ZERO,
        }
    }

    pub(crate) fn working_set_size() -> u64 {
        0
    }

    pub(crate) fn private_memory_size() -> u64 {
        0
    }
}
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
use fallback as sys;

/// Accumulated CPU time split by execution mode.
///
/// Both fields always come from the same underlying OS sample, so summing them gives a total that
/// is consistent with the instant the sample was taken.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CpuSample {
    pub(crate) kernel: Duration,
    pub(crate) user: Duration,
}

impl CpuSample {
    pub(crate) fn total(self) -> Duration {
        self.kernel + self.user
    }
}

/// Gets the CPU time this process has spent executing kernel code, with millisecond granularity.
///
/// Returns [`Duration::ZERO`] if the time cannot be determined or the platform is unsupported.
pub fn kernel_processor_time() -> Duration {
    sys::cpu_sample().kernel
}

/// Gets the CPU time this process has spent executing its own (user-mode) code, with millisecond
/// granularity.
///
/// Returns [`Duration::ZERO`] if the time cannot be determined or the platform is unsupported.
pub fn user_processor_time() -> Duration {
    sys::cpu_sample().user
}

/// Gets the total CPU time this process has accumulated, with millisecond granularity.
///
/// This is the sum of kernel and user time, computed from a single OS sample rather than from two
/// independent calls that could observe different instants.
///
/// Returns [`Duration::ZERO`] if the time cannot be determined or the platform is unsupported.
pub fn total_processor_time() -> Duration {
    sys::cpu_sample().total()
}

/// Gets the working set size of this process, in bytes.
///
/// This is the physical memory currently mapped and resident for the process.
///
/// Returns `0` if the size cannot be determined or the platform is unsupported.
pub fn working_set_size() -> u64 {
    sys::working_set_size()
}

/// Gets the private memory size of this process, in bytes.
///
/// What exactly is counted is platform-defined: private committed memory on Windows, and the
/// virtual size of the process on Linux and macOS.
///
/// Returns `0` if the size cannot be determined or the platform is unsupported.
pub fn private_memory_size() -> u64 {
    sys::private_memory_size()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_kernel_plus_user_within_one_sample() {
        let sample = sys::cpu_sample();
        assert_eq!(sample.total(), sample.kernel + sample.user);
    }
}
