//! A small probe that reports the process's own CPU and memory usage around measurable work.
//!
//! The probe prints the five usage queries, burns CPU for a bounded interval, allocates (and then
//! releases) a large scratch buffer, and prints the queries again, so the movement of each metric
//! can be eyeballed. An optional first argument overrides the busy-loop interval, in seconds.

#![deny(warnings)]
#![deny(missing_docs)]

use std::time::{Duration, Instant};

use anyhow::Context as _;
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

const DEFAULT_SPIN_SECS: u64 = 2;
const SCRATCH_BUFFER_LEN: usize = 10 * 1024 * 1024;

fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(true)
        .with_target(false)
        .init();

    match run() {
        Ok(()) => info!("usage-probe stopped."),
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<(), anyhow::Error> {
    let spin_secs = match std::env::args().nth(1) {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid busy-loop interval '{}'", raw))?,
        None => DEFAULT_SPIN_SECS,
    };

    report("at startup");

    spin_for(Duration::from_secs(spin_secs));
    report("after busy loop");

    let scratch = vec![1u8; SCRATCH_BUFFER_LEN];
    std::hint::black_box(scratch.as_slice());
    report("after allocating scratch buffer");

    drop(scratch);
    report("after releasing scratch buffer");

    Ok(())
}

fn report(moment: &str) {
    info!(
        kernel_cpu_ms = process_usage::kernel_processor_time().as_millis() as u64,
        user_cpu_ms = process_usage::user_processor_time().as_millis() as u64,
        total_cpu_ms = process_usage::total_processor_time().as_millis() as u64,
        working_set_bytes = process_usage::working_set_size(),
        private_memory_bytes = process_usage::private_memory_size(),
        "usage {}",
        moment
    );
}

fn spin_for(interval: Duration) {
    let start = Instant::now();
    while start.elapsed() < interval {
        std::hint::black_box(start);
    }
}
