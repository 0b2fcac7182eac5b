use std::time::Duration;

/// Formats `duration` as `HH:MM:SS.mmm`; hours widen past 99.
pub fn time_str(duration: Duration) -> String {
    let ms = duration.as_millis();
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let milliseconds = ms % 1000;

    format!("{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}")
}

/// Average bit rate in kbit/s over `duration`.
pub fn kbps(bytes: u64, duration: Duration) -> Option<f64> {
    let secs = duration.as_secs_f64();
    (secs > 0.0).then(|| bytes as f64 * 8.0 / (secs * 1000.0))
}

#[test]
fn formats_durations() {
    assert_eq!(time_str(Duration::ZERO), "00:00:00.000");
    assert_eq!(time_str(Duration::from_millis(23)), "00:00:00.023");
    assert_eq!(time_str(Duration::from_millis(3_723_456)), "01:02:03.456");
    assert_eq!(time_str(Duration::from_secs(360_000)), "100:00:00.000");

    assert_eq!(kbps(1000, Duration::from_secs(1)), Some(8.0));
    assert_eq!(kbps(1000, Duration::ZERO), None);
}
