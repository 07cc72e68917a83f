//! Attention aggregation: raw pairwise attention -> per-token highlight.
//!
//! For a token range `[0, limit)` every row `i` in `1..limit` contributes its
//! causal span (columns `0..=i`) to a running per-column sum. Column `i`
//! therefore accumulates the attention token `i` received from itself and
//! every later token inside the range, and its average divides by the number
//! of those rows, `limit - i`. Later tokens have fewer attenders, so the
//! denominator shrinks toward the end of the range.
//!
//! Only averages strictly above `MATERIALITY_THRESHOLD` are highlighted. Token
//! 0 is never highlighted: row 0 is excluded from the pass, so nothing before
//! it is measured.
//!
//! Cost is O(limit^2) and runs synchronously on every recompute; the render
//! engine memoizes results per `limit` (see `highlight_cache`).

use core_model::{AttentionMatrix, HighlightColor, HighlightVector};

/// Minimum average attention a token must exceed to be highlighted.
pub const MATERIALITY_THRESHOLD: f64 = 0.05;

/// Average attention received by each token in `[0, limit)`. Entry 0 is always `0.0`.
pub fn average_attention(attention: &AttentionMatrix, limit: usize) -> Vec<f64> {
    let mut sums = vec![0.0f64; limit];
    for i in 1..limit {
        for (j, weight) in attention.row(i).iter().take(i + 1).enumerate() {
            sums[j] += *weight;
        }
    }
    let mut averages = vec![0.0f64; limit];
    for i in 1..limit {
        averages[i] = sums[i] / (limit - i) as f64;
    }
    averages
}

/// Green/blue channel for an average: `floor((1 - average) * 255)` clamped to a byte.
#[inline]
pub fn channel_for(average: f64) -> u8 {
    ((1.0 - average) * 255.0).floor().clamp(0.0, 255.0) as u8
}

/// Highlight for one average, `None` at or below the materiality threshold.
#[inline]
pub fn intensity_for(average: f64) -> Option<HighlightColor> {
    if !average.is_finite() || average <= MATERIALITY_THRESHOLD {
        return None;
    }
    Some(HighlightColor::from_channel(channel_for(average)))
}

/// Highlights for tokens `[0, limit)`.
pub fn compute_highlights(attention: &AttentionMatrix, limit: usize) -> HighlightVector {
    let averages = average_attention(attention, limit);
    let entries = averages
        .iter()
        .enumerate()
        .map(|(i, avg)| if i == 0 { None } else { intensity_for(*avg) })
        .collect();
    let out = HighlightVector::from_entries(entries);
    tracing::trace!(
        target: "render.attention",
        limit,
        highlighted = out.highlighted_count(),
        "highlights_computed"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_world_scenario() {
        let attn = AttentionMatrix::new(vec![vec![0.0], vec![0.0, 0.9]]);
        let hv = compute_highlights(&attn, 2);
        assert_eq!(hv.len(), 2);
        assert_eq!(hv.get(0), None);
        let c = hv.get(1).expect("token 1 highlighted");
        assert_eq!(c.channel(), 25);
        assert_eq!(c.to_string(), "rgb(255,25,25)");
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(intensity_for(0.05), None);
        assert_eq!(intensity_for(0.049), None);
        assert!(intensity_for(0.0501).is_some());
        assert_eq!(intensity_for(f64::NAN), None);
    }

    #[test]
    fn channel_bounds() {
        assert_eq!(channel_for(0.0), 255);
        assert_eq!(channel_for(1.0), 0);
        assert!(channel_for(0.999) <= 1);
        assert_eq!(channel_for(3.0), 0);
    }

    #[test]
    fn denominator_shrinks_toward_the_end() {
        // Token 1 is attended by rows 1 and 2; token 2 only by row 2.
        let attn = AttentionMatrix::new(vec![
            vec![1.0],
            vec![0.5, 0.5],
            vec![0.2, 0.2, 0.6],
        ]);
        let avg = average_attention(&attn, 3);
        assert_eq!(avg[0], 0.0);
        assert!((avg[1] - 0.35).abs() < 1e-12);
        assert!((avg[2] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn limit_restricts_rows() {
        let attn = AttentionMatrix::new(vec![
            vec![1.0],
            vec![0.5, 0.5],
            vec![0.0, 0.9, 0.1],
        ]);
        // With limit 2, row 2 is ignored entirely.
        let avg = average_attention(&attn, 2);
        assert_eq!(avg.len(), 2);
        assert!((avg[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn short_matrix_reads_zero() {
        let attn = AttentionMatrix::new(vec![vec![1.0]]);
        let hv = compute_highlights(&attn, 4);
        assert_eq!(hv.len(), 4);
        assert_eq!(hv.highlighted_count(), 0);
    }

    #[test]
    fn zero_and_one_limits() {
        let attn = AttentionMatrix::new(vec![vec![1.0]]);
        assert!(compute_highlights(&attn, 0).is_empty());
        let one = compute_highlights(&attn, 1);
        assert_eq!(one.len(), 1);
        assert_eq!(one.get(0), None);
    }
}
