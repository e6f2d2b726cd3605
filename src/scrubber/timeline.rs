//! Mapping between filmstrip scroll geometry and playback time.
//!
//! All functions are pure. A degenerate duration or content length maps to 0
//! instead of dividing by zero.

fn usable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

/// Playback time for a normalized scrubber position
pub fn time_from_ratio(ratio: f64, duration: f64) -> f64 {
    if !usable(duration) {
        return 0.0;
    }
    clamp_ratio(ratio) * duration
}

/// Normalized scrubber position for a playback time
pub fn ratio_from_time(time: f64, duration: f64) -> f64 {
    if !usable(duration) {
        return 0.0;
    }
    clamp_ratio(time / duration)
}

/// Normalized position of the needle over the content.
///
/// The needle sits `center_inset` points to the right of the scroll origin,
/// so the position under it is `content_offset + center_inset`.
pub fn ratio_from_offset(content_offset: f64, center_inset: f64, content_length: f64) -> f64 {
    if !usable(content_length) {
        return 0.0;
    }
    clamp_ratio((content_offset + center_inset) / content_length)
}

/// Scroll offset that puts the needle at `ratio`
pub fn offset_from_ratio(ratio: f64, center_inset: f64, content_length: f64) -> f64 {
    if !usable(content_length) {
        return -center_inset;
    }
    clamp_ratio(ratio) * content_length - center_inset
}

/// How far the needle and readout must shift to stay pinned to the content
/// edge while the user drags past either end. Zero inside the content.
pub fn overscroll_offset(content_offset: f64, center_inset: f64, content_length: f64) -> f64 {
    let position = content_offset + center_inset;
    let length = content_length.max(0.0);

    if position > length {
        length - position
    } else if position < 0.0 {
        position.abs()
    } else {
        0.0
    }
}

/// Total filmstrip width for cells laid edge to edge
pub fn content_length(sample_count: usize, cell_width: f64) -> f64 {
    sample_count as f64 * cell_width.max(0.0)
}
