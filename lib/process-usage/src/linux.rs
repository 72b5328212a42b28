use std::{fs, time::Duration};

use tracing::debug;

use super::CpuSample;

const STATUS_PATH: &str = "/proc/self/status";
const RESIDENT_FIELD: &str = "VmRSS:";
const VIRTUAL_FIELD: &str = "VmSize:";

pub(crate) fn cpu_sample() -> CpuSample {
    // The sample stays zeroed if the call fails, which collapses to a zero reading.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };

    // SAFETY: We're passing a valid pointer to a `rusage` value for the kernel to fill in.
    let result = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if result != 0 {
        debug!("getrusage failed; reporting zero CPU time");
    }

    cpu_sample_from_rusage(&usage)
}

fn cpu_sample_from_rusage(usage: &libc::rusage) -> CpuSample {
    CpuSample {
        kernel: timeval_to_millis(&usage.ru_stime),
        user: timeval_to_millis(&usage.ru_utime),
    }
}

fn timeval_to_millis(tv: &libc::timeval) -> Duration {
    let secs = tv.tv_sec.max(0) as u64;
    let micros = tv.tv_usec.max(0) as u64;

    Duration::from_millis(secs.saturating_mul(1000).saturating_add(micros / 1000))
}

pub(crate) fn working_set_size() -> u64 {
    status_field_bytes(RESIDENT_FIELD)
}

pub(crate) fn private_memory_size() -> u64 {
    status_field_bytes(VIRTUAL_FIELD)
}

fn status_field_bytes(field: &str) -> u64 {
    match fs::read_to_string(STATUS_PATH) {
        Ok(status) => field_bytes_from_status(&status, field),
        Err(e) => {
            debug!(error = %e, "failed to read {}; reporting zero memory usage", STATUS_PATH);
            0
        }
    }
}

/// Outcome of scanning one status line for a labeled value.
enum FieldValue {
    /// The label isn't on this line; keep scanning.
    KeyNotFound,
    /// The label is on this line but no numeric value follows it.
    ValueNotFound,
    /// The numeric value following the label, as reported by the kernel (in kiB).
    Value(u64),
}

fn field_bytes_from_status(status: &str, field: &str) -> u64 {
    for line in status.lines() {
        match scan_line(line, field) {
            FieldValue::KeyNotFound => continue,
            FieldValue::ValueNotFound => {
                debug!("no numeric value after {} in {}; reporting zero", field, STATUS_PATH);
                return 0;
            }
            FieldValue::Value(kib) => return kib.saturating_mul(1024),
        }
    }

    0
}

fn scan_line(line: &str, field: &str) -> FieldValue {
    let field_start = match line.find(field) {
        Some(idx) => idx,
        None => return FieldValue::KeyNotFound,
    };

    // The shortest label ("VmRSS:") is six characters, so the value can only start after that;
    // scanning forward for the first digit skips the rest of a longer label and any whitespace.
    let bytes = line.as_bytes();
    let search_start = field_start + 6;
    let digit_start = match bytes
        .get(search_start..)
        .and_then(|rest| rest.iter().position(|b| b.is_ascii_digit()))
    {
        Some(offset) => search_start + offset,
        None => return FieldValue::ValueNotFound,
    };

    let digit_len = bytes[digit_start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();

    // The digit run is non-empty, so only overflow can fail the parse.
    match line[digit_start..digit_start + digit_len].parse::<u64>() {
        Ok(value) => FieldValue::Value(value),
        Err(_) => FieldValue::Value(0),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parses_labeled_kib_value() {
        assert!(matches!(
            scan_line("VmRSS:\t  1024 kB", "VmRSS:"),
            FieldValue::Value(1024)
        ));
        assert_eq!(field_bytes_from_status("VmRSS:\t  1024 kB\n", "VmRSS:"), 1024 * 1024);
    }

    #[test]
    fn missing_label_yields_zero() {
        let status = "Name:\tusage-probe\nVmSize:\t  4096 kB\n";
        assert_eq!(field_bytes_from_status(status, "VmRSS:"), 0);
    }

    #[test]
    fn label_without_value_yields_zero() {
        assert_eq!(field_bytes_from_status("VmRSS:\n", "VmRSS:"), 0);
        assert_eq!(field_bytes_from_status("VmRSS:\t kB\n", "VmRSS:"), 0);
    }

    #[test]
    fn overflowing_value_yields_zero() {
        let status = "VmRSS:\t 99999999999999999999999999 kB\n";
        assert_eq!(field_bytes_from_status(status, "VmRSS:"), 0);
    }

    #[test]
    fn totals_come_from_one_sample() {
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        usage.ru_stime.tv_sec = 1;
        usage.ru_stime.tv_usec = 500_000;
        usage.ru_utime.tv_sec = 2;
        usage.ru_utime.tv_usec = 250_000;

        let sample = cpu_sample_from_rusage(&usage);
        assert_eq!(sample.kernel, Duration::from_millis(1500));
        assert_eq!(sample.user, Duration::from_millis(2250));
        assert_eq!(sample.total(), Duration::from_millis(3750));
    }

    #[test]
    fn live_memory_fields_are_nonzero() {
        assert!(working_set_size() > 0);
        assert!(private_memory_size() > 0);
    }

    proptest! {
        #[test]
        fn scanning_arbitrary_text_never_panics(status in "\\PC*") {
            let _ = field_bytes_from_status(&status, "VmRSS:");
        }

        #[test]
        fn well_formed_lines_parse_exactly(value in 0u64..=u32::MAX as u64) {
            let line = format!("VmRSS:\t{} kB", value);
            prop_assert_eq!(field_bytes_from_status(&line, "VmRSS:"), value * 1024);
        }
    }
}
