use std::{mem, time::Duration};

use tracing::debug;
use windows_sys::Win32::{
    Foundation::FILETIME,
    System::{
        ProcessStatus::{GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS, PROCESS_MEMORY_COUNTERS_EX},
        Threading::{GetCurrentProcess, GetProcessTimes},
    },
};

use super::CpuSample;

// `FILETIME` counts 100-nanosecond intervals.
const TICKS_PER_MILLISECOND: u64 = 10_000;

pub(crate) fn cpu_sample() -> CpuSample {
    // The times stay zeroed if the call fails, which collapses to a zero reading.
    let mut creation_time: FILETIME = unsafe { mem::zeroed() };
    let mut exit_time: FILETIME = unsafe { mem::zeroed() };
    let mut kernel_time: FILETIME = unsafe { mem::zeroed() };
    let mut user_time: FILETIME = unsafe { mem::zeroed() };

    // SAFETY: `GetCurrentProcess` returns a pseudo-handle that is always valid for the current
    // process, and all four output pointers are valid for the call to fill in.
    let result = unsafe {
        GetProcessTimes(
            GetCurrentProcess(),
            &mut creation_time,
            &mut exit_time,
            &mut kernel_time,
            &mut user_time,
        )
    };
    if result == 0 {
        debug!("GetProcessTimes failed; reporting zero CPU time");
    }

    cpu_sample_from_filetimes(kernel_time, user_time)
}

fn cpu_sample_from_filetimes(kernel: FILETIME, user: FILETIME) -> CpuSample {
    CpuSample {
        kernel: Duration::from_millis(filetime_ticks(kernel) / TICKS_PER_MILLISECOND),
        user: Duration::from_millis(filetime_ticks(user) / TICKS_PER_MILLISECOND),
    }
}

fn filetime_ticks(time: FILETIME) -> u64 {
    // The 64-bit tick count is split across two 32-bit words.
    ((time.dwHighDateTime as u64) << 32) | (time.dwLowDateTime as u64)
}

pub(crate) fn working_set_size() -> u64 {
    memory_counters().WorkingSetSize as u64
}

pub(crate) fn private_memory_size() -> u64 {
    memory_counters().PrivateUsage as u64
}

fn memory_counters() -> PROCESS_MEMORY_COUNTERS_EX {
    // The counters stay zeroed if the call fails, which collapses to zero readings.
    let mut counters: PROCESS_MEMORY_COUNTERS_EX = unsafe { mem::zeroed() };
    let counters_len = mem::size_of::<PROCESS_MEMORY_COUNTERS_EX>() as u32;

    // SAFETY: `GetProcessMemoryInfo` takes a pointer to the base counters type but writes the
    // extended layout when given the extended size, so pointing it at a
    // `PROCESS_MEMORY_COUNTERS_EX` is sound. The cast stays confined to this call.
    let result = unsafe {
        GetProcessMemoryInfo(
            GetCurrentProcess(),
            &mut counters as *mut PROCESS_MEMORY_COUNTERS_EX as *mut PROCESS_MEMORY_COUNTERS,
            counters_len,
        )
    };
    if result == 0 {
        debug!("GetProcessMemoryInfo failed; reporting zero memory usage");
    }

    counters
}
