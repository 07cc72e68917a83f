//! Batch-size control mapping.
//!
//! The control moves in steps `1..=MAX_STEP`. Even steps land on powers of two,
//! odd steps on the midpoint between their neighbours, so the usable range
//! (1 to 8192) is covered with roughly geometric spacing.

pub const MIN_STEP: u32 = 1;
pub const MAX_STEP: u32 = 26;

/// Batch size for a control step. Steps outside `MIN_STEP..=MAX_STEP` are clamped.
pub fn slider_to_batch_size(step: u32) -> u32 {
    let step = step.clamp(MIN_STEP, MAX_STEP);
    if step == 1 {
        return 1;
    }
    if step % 2 == 0 {
        1 << (step / 2)
    } else {
        let low = 1u32 << ((step - 1) / 2);
        let high = 1u32 << (step.div_ceil(2));
        (low + high) / 2
    }
}

/// Inverse mapping: `log2(batch_size) * 2`. Exact for the sizes even steps produce.
pub fn batch_size_to_slider(batch_size: u32) -> f64 {
    f64::from(batch_size.max(1)).log2() * 2.0
}
