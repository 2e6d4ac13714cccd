#[cfg(test)]
mod tests;

use v_frame::pixel::{CastFromPrimitive, Pixel};

use super::plane::BlockRegion;

/// Sum of squared differences over every channel, row and column of two
/// equally sized blocks.
///
/// # Panics
///
/// - If the blocks differ in width, height or channel count
pub(crate) fn get_sse<T: Pixel>(org: &BlockRegion<'_, T>, rf: &BlockRegion<'_, T>) -> u64 {
    assert_eq!(org.width(), rf.width());
    assert_eq!(org.height(), rf.height());
    assert_eq!(org.channels(), rf.channels());

    org.rows_iter()
        .zip(rf.rows_iter())
        .map(|(src, dst)| {
            src.iter()
                .zip(dst)
                .map(|(&p1, &p2)| {
                    let diff = i32::cast_from(p1).abs_diff(i32::cast_from(p2)) as u64;
                    diff * diff
                })
                .sum::<u64>()
        })
        .sum()
}

/// Mean squared error between two equally sized blocks, normalized by the
/// number of samples across all channels.
///
/// The metric is symmetric and is zero for identical blocks.
///
/// # Panics
///
/// - If the blocks differ in width, height or channel count
pub fn get_mse<T: Pixel>(org: &BlockRegion<'_, T>, rf: &BlockRegion<'_, T>) -> f64 {
    sse_to_mse(get_sse(org, rf), org.sample_count())
}

pub(crate) fn sse_to_mse(sse: u64, samples: usize) -> f64 {
    if samples == 0 {
        return 0.0;
    }
    sse as f64 / samples as f64
}
