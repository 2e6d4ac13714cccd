use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};
use v_frame::pixel::Pixel;

use crate::data::{
    block::BlockOffset,
    frame::Frame,
    motion::{BlockMotion, MotionField},
    plane::{BlockRegion, PlaneOffset},
};

// Position of the reference block a target block was matched to.
fn source_offset<T: Pixel>(
    reference: &Frame<T>,
    block: &BlockMotion,
    blk_w: usize,
    blk_h: usize,
) -> BlockOffset {
    let po = PlaneOffset::from(block.anchor) + block.mv;
    assert!(
        po.x >= 0
            && po.y >= 0
            && po.x as usize + blk_w <= reference.cols()
            && po.y as usize + blk_h <= reference.rows(),
        "motion vector {} of block at {} points outside the {}x{} reference frame",
        block.mv,
        block.anchor,
        reference.cols(),
        reference.rows()
    );
    BlockOffset {
        row: po.y as usize,
        col: po.x as usize,
    }
}

/// Builds the predicted frame by copying, for every block, the matched
/// region of `reference` to the block's own position in `output`.
///
/// Every output sample belongs to exactly one block, so block rows are
/// written in parallel without synchronization.
///
/// # Panics
///
/// - If `output` does not have the extent covered by `field`, or a different
///   channel count than `reference`
/// - If a motion vector points outside the reference frame
pub fn reconstruct_into<T: Pixel>(reference: &Frame<T>, field: &MotionField, output: &mut Frame<T>) {
    let blk_w = field.block_width;
    let blk_h = field.block_height;
    assert_eq!(output.rows(), field.rows * blk_h);
    assert_eq!(output.cols(), field.cols * blk_w);
    assert_eq!(output.channels(), reference.channels());
    if field.is_empty() {
        return;
    }

    for (channel, plane) in output.planes_mut().iter_mut().enumerate() {
        let stride = plane.cfg.stride;
        plane
            .data_origin_mut()
            .par_chunks_mut(stride * blk_h)
            .take(field.rows)
            .enumerate()
            .for_each(|(by, dst)| {
                for block in &field[by] {
                    let src = BlockRegion::new(
                        reference,
                        source_offset(reference, block, blk_w, blk_h),
                        blk_w,
                        blk_h,
                    );
                    let x = block.anchor.col;
                    for r in 0..blk_h {
                        let start = r * stride + x;
                        dst[start..start + blk_w].copy_from_slice(src.row(channel, r));
                    }
                }
            });
    }
}

/// Allocates an output frame shaped like `reference` and fills it with
/// [`reconstruct_into`].
///
/// # Panics
///
/// See [`reconstruct_into`].
pub fn reconstruct<T: Pixel>(reference: &Frame<T>, field: &MotionField) -> Frame<T> {
    let mut output = reference.new_like();
    reconstruct_into(reference, field, &mut output);
    output
}
