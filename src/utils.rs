use std::any::Any;
use std::time::Duration;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// `HH:MM:SS.mmm`; runs over many small files often finish within a second.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        duration.subsec_millis()
    )
}

/// Size in MiB rounded to two decimals, for log fields.
pub fn size_mb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_MB)
}

/// Output rate in MiB/s. A zero elapsed time reports the size itself.
pub fn throughput_mb_s(bytes: u64, elapsed: Duration) -> f64 {
    let mb = bytes as f64 / BYTES_PER_MB;
    let secs = elapsed.as_secs_f64();
    round2(if secs > 0.0 { mb / secs } else { mb })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Human-readable text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_keeps_milliseconds() {
        assert_eq!(format_duration(Duration::ZERO), "00:00:00.000");
        assert_eq!(format_duration(Duration::from_millis(1_250)), "00:00:01.250");
        assert_eq!(format_duration(Duration::from_secs(3661)), "01:01:01.000");
    }

    #[test]
    fn size_mb_rounds_to_two_decimals() {
        assert_eq!(size_mb(0), 0.0);
        assert_eq!(size_mb(1_048_576), 1.0);
        assert_eq!(size_mb(1_572_864), 1.5);
        assert_eq!(size_mb(1_000_000), 0.95);
    }

    #[test]
    fn throughput_handles_zero_elapsed() {
        assert_eq!(throughput_mb_s(4 * 1_048_576, Duration::from_secs(2)), 2.0);
        assert_eq!(throughput_mb_s(1_048_576, Duration::ZERO), 1.0);
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let payload = std::panic::catch_unwind(|| panic!("static text")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static text");

        let payload = std::panic::catch_unwind(|| panic!("row {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "row 7");
    }
}
