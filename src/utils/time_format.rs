//! Elapsed-time readout formatting.

/// Formats a position in seconds as `MM:SS`.
///
/// Fractional seconds are truncated and minutes are never folded into hours,
/// so an hour reads `60:00`. Negative and non-finite input reads `00:00`.
pub fn format_timestamp(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };

    format!("{:02}:{:02}", whole / 60, whole % 60)
}
