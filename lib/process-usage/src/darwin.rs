use std::{mem, sync::OnceLock, time::Duration};

use mach2::{
    kern_return::KERN_SUCCESS,
    mach_time::{mach_timebase_info, mach_timebase_info_data_t},
};
use tracing::debug;

use super::CpuSample;

pub(crate) fn cpu_sample() -> CpuSample {
    // The sample stays zeroed if the call fails, which collapses to a zero reading.
    let mut usage: libc::rusage_info_v2 = unsafe { mem::zeroed() };

    // SAFETY: `rusage_info_t` is an opaque out-buffer type; for the `RUSAGE_INFO_V2` flavor the
    // kernel fills in a `rusage_info_v2`, so handing it a pointer to one matches the expected
    // layout. The cast stays confined to this call.
    let result = unsafe {
        libc::proc_pid_rusage(
            libc::getpid(),
            libc::RUSAGE_INFO_V2,
            &mut usage as *mut libc::rusage_info_v2 as *mut libc::rusage_info_t,
        )
    };
    if result != 0 {
        debug!("proc_pid_rusage failed; reporting zero CPU time");
    }

    cpu_sample_from_rusage_info(&usage, timebase())
}

fn cpu_sample_from_rusage_info(usage: &libc::rusage_info_v2, timebase: Timebase) -> CpuSample {
    CpuSample {
        kernel: mach_ticks_to_millis(usage.ri_system_time, timebase),
        user: mach_ticks_to_millis(usage.ri_user_time, timebase),
    }
}

/// The kernel's ratio for converting Mach absolute-time ticks to nanoseconds.
#[derive(Clone, Copy, Debug)]
struct Timebase {
    numer: u32,
    denom: u32,
}

static TIMEBASE: OnceLock<Timebase> = OnceLock::new();

fn timebase() -> Timebase {
    // The ratio is a hardware calibration constant, so querying it once for the lifetime of the
    // process is enough.
    *TIMEBASE.get_or_init(|| {
        let mut info = mach_timebase_info_data_t { numer: 0, denom: 0 };

        // SAFETY: We're passing a valid pointer for the timebase info output.
        let result = unsafe { mach_timebase_info(&mut info) };
        if result != KERN_SUCCESS || info.denom == 0 {
            debug!("mach_timebase_info failed; assuming an identity timebase");
            return Timebase { numer: 1, denom: 1 };
        }

        Timebase {
            numer: info.numer,
            denom: info.denom,
        }
    })
}

fn mach_ticks_to_millis(ticks: u64, timebase: Timebase) -> Duration {
    // Widening to u128 keeps the tick-to-nanosecond multiplication from overflowing.
    let nanos = ticks as u128 * timebase.numer as u128 / timebase.denom as u128;

    Duration::from_millis((nanos / 1_000_000) as u64)
}

pub(crate) fn working_set_size() -> u64 {
    task_all_info().ptinfo.pti_resident_size
}

pub(crate) fn private_memory_size() -> u64 {
    task_all_info().ptinfo.pti_virtual_size
}

fn task_all_info() -> libc::proc_taskallinfo {
    // The struct stays zeroed if the call fails, which collapses to zero readings.
    let mut info: libc::proc_taskallinfo = unsafe { mem::zeroed() };
    let info_len = mem::size_of::<libc::proc_taskallinfo>() as libc::c_int;

    // SAFETY: The buffer pointer and length describe exactly one `proc_taskallinfo`, which is
    // what the `PROC_PIDTASKALLINFO` flavor writes.
    let result = unsafe {
        libc::proc_pidinfo(
            libc::getpid(),
            libc::PROC_PIDTASKALLINFO,
            0,
            &mut info as *mut libc::proc_taskallinfo as *mut libc::c_void,
            info_len,
        )
    };
    if result != info_len {
        debug!("proc_pidinfo failed; reporting zero memory usage");
    }

    info
}
