//! Homopolymer context scoring.
//!
//! Long reads are error-prone inside and next to runs of a single base. The score
//! computed here is the share of the most frequent base in a small window around a
//! position, so values near 1.0 flag a homopolymer context.

/// Default number of bases inspected on each side of the position.
pub const DEFAULT_HOMOPOLYMER_WINDOW: usize = 5;

/// Score returned when no context is available (first/last base, out of range).
/// Never counts as artifact-like.
pub const UNSCOREABLE: f64 = 0.0;

/// Compute the homopolymer fraction around a 1-based `position`.
///
/// The window spans `window` bases either side, clipped to the sequence. With
/// `include_variant_position == false` the position itself is left out, scoring
/// only its neighbourhood. `chrom` is carried for tracing only.
pub fn homopolymer_score(
    reference: &[u8],
    chrom: &str,
    position: u32,
    include_variant_position: bool,
    window: usize,
) -> f64 {
    let len = reference.len();
    let Some(index) = (position as usize).checked_sub(1) else {
        return UNSCOREABLE;
    };
    if index == 0 || index + 1 >= len {
        tracing::trace!(chrom, position, "edge position has no homopolymer context");
        return UNSCOREABLE;
    }

    let start = index.saturating_sub(window);
    let end = (index + window).min(len - 1);

    let mut counts = [0u32; 5];
    let mut total = 0u32;
    for (offset, &base) in reference[start..=end].iter().enumerate() {
        if !include_variant_position && start + offset == index {
            continue;
        }
        counts[base_slot(base)] += 1;
        total += 1;
    }

    if total == 0 {
        return UNSCOREABLE;
    }
    let most_frequent = counts.iter().copied().max().unwrap_or(0);
    f64::from(most_frequent) / f64::from(total)
}

// Ambiguity codes share one slot so a run of N is still a run.
fn base_slot(base: u8) -> usize {
    match base {
        b'A' | b'a' => 0,
        b'C' | b'c' => 1,
        b'G' | b'g' => 2,
        b'T' | b't' => 3,
        _ => 4,
    }
}
