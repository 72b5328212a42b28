//! Live tests for the public query contract.

use std::time::{Duration, Instant};

use process_usage::{
    kernel_processor_time, private_memory_size, total_processor_time, user_processor_time,
    working_set_size,
};

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn spin_for(interval: Duration) {
    let start = Instant::now();
    while start.elapsed() < interval {
        std::hint::black_box(start);
    }
}

#[test]
fn queries_never_fail() {
    // Zero is a legal reading everywhere, so the only universal contract is that every query
    // returns without panicking.
    let _ = kernel_processor_time();
    let _ = user_processor_time();
    let _ = total_processor_time();
    let _ = working_set_size();
    let _ = private_memory_size();
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
#[test]
fn memory_fields_are_nonzero() {
    assert!(working_set_size() > 0);
    assert!(private_memory_size() > 0);
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
#[test]
fn cpu_time_accumulates_across_busy_work() {
    let before = total_processor_time();
    spin_for(Duration::from_millis(250));
    let after = total_processor_time();

    assert!(after >= before);
    assert!(after > Duration::ZERO);
}

#[test]
fn concurrent_queries_are_safe() {
    let mut workers = Vec::new();
    for _ in 0..8 {
        workers.push(std::thread::spawn(|| {
            for _ in 0..500 {
                let _ = kernel_processor_time();
                let _ = user_processor_time();
                let _ = total_processor_time();
                let _ = working_set_size();
                let _ = private_memory_size();
            }
        }));
    }

    for worker in workers {
        worker.join().unwrap();
    }
}
