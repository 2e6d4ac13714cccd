use arrayvec::ArrayVec;
use log::trace;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use v_frame::pixel::Pixel;

use crate::{
    MatchConfig, MatchError,
    data::{
        block::{BlockGrid, BlockOffset},
        frame::Frame,
        motion::{BlockMotion, MotionField, MotionVector},
        mse::{get_sse, sse_to_mse},
        plane::{BlockRegion, PlaneOffset, SearchWindow},
    },
    validate_frames,
};

/// Number of refinement steps performed for every block.
pub const SEARCH_STEPS: usize = 3;

/// Step distance used after the first refinement step.
///
/// This is a ceiling-style halving that keeps the three step schedule
/// converging for radii that are not powers of two. A distance below 2 is
/// kept as is.
pub const fn next_step_distance(d: usize) -> usize {
    let half = d / 2;
    if half == 0 {
        return d;
    }
    (d + half - 1) / half
}

// -d, 0, +d along one axis; a zero distance leaves only the unmoved offset
fn axis_offsets(d: usize) -> ArrayVec<isize, 3> {
    let mut offsets = ArrayVec::new();
    if d == 0 {
        offsets.push(0);
    } else {
        let d = d as isize;
        offsets.push(-d);
        offsets.push(0);
        offsets.push(d);
    }
    offsets
}

/// Three step block matcher over one reference/target frame pair.
///
/// The frames are only read, so a single `ThreeStepSearch` can be shared by
/// every worker searching the frame.
#[derive(Debug, Clone, Copy)]
pub struct ThreeStepSearch<'a, T: Pixel> {
    reference: &'a Frame<T>,
    target: &'a Frame<T>,
    cfg: MatchConfig,
    grid: BlockGrid,
}

impl<'a, T: Pixel> ThreeStepSearch<'a, T> {
    /// # Errors
    ///
    /// - If the configuration holds a zero value.
    /// - If the frames differ in extent.
    /// - If the frames are not an exact multiple of the block size.
    pub fn new(
        reference: &'a Frame<T>,
        target: &'a Frame<T>,
        cfg: MatchConfig,
    ) -> Result<Self, MatchError> {
        let grid = validate_frames(reference, target, &cfg)?;
        Ok(Self {
            reference,
            target,
            cfg,
            grid,
        })
    }

    /// The block partition of the target frame.
    pub const fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    /// Finds the motion of the target block anchored at `anchor`.
    ///
    /// The search starts at the anchor itself and refines the best position
    /// over [`SEARCH_STEPS`] steps, each testing up to nine candidates around
    /// the current best. Candidates whose block leaves the current search
    /// window are skipped. The matcher never fails: a step without any
    /// admissible candidate leaves the best position where it was.
    ///
    /// # Panics
    ///
    /// - If the block at `anchor` does not fit in the target frame
    pub fn estimate_block_motion(&self, anchor: BlockOffset) -> BlockMotion {
        let blk_w = self.cfg.block_width;
        let blk_h = self.cfg.block_height;
        let max_rows = self.reference.rows();
        let max_cols = self.reference.cols();

        let org = BlockRegion::new(self.target, anchor, blk_w, blk_h);

        let mut best = PlaneOffset::from(anchor);
        let mut lowest_sse = u64::MAX;
        let mut stalled_steps = 0;

        let mut dist_x = self.cfg.search_horizontal / 2;
        let mut dist_y = self.cfg.search_vertical / 2;
        let mut window = SearchWindow::new(
            max_rows,
            max_cols,
            anchor,
            blk_w,
            blk_h,
            self.cfg.search_horizontal,
            self.cfg.search_vertical,
        );

        for step in 0..SEARCH_STEPS {
            // candidates are laid out around the best position of the
            // previous step, even if a better one turns up during this step
            let center = best;
            let mut evaluated = 0;

            for &x in &axis_offsets(dist_x) {
                for &y in &axis_offsets(dist_y) {
                    let po = PlaneOffset {
                        x: center.x + x,
                        y: center.y + y,
                    };
                    if !window.contains_block(po, blk_w, blk_h) {
                        continue;
                    }
                    evaluated += 1;

                    let candidate = BlockRegion::new(
                        self.reference,
                        BlockOffset {
                            row: po.y as usize,
                            col: po.x as usize,
                        },
                        blk_w,
                        blk_h,
                    );
                    let sse = get_sse(&org, &candidate);
                    if sse < lowest_sse {
                        lowest_sse = sse;
                        best = po;
                    }
                }
            }

            if evaluated == 0 {
                stalled_steps += 1;
                trace!(
                    "block at {anchor}: no candidate inside {window:?} at step {step}, \
                     keeping ({}, {})",
                    best.x,
                    best.y
                );
            }

            match step {
                0 => {
                    dist_x = next_step_distance(dist_x);
                    dist_y = next_step_distance(dist_y);
                }
                1 => {
                    dist_x = 1;
                    dist_y = 1;
                }
                _ => {}
            }

            if step + 1 < SEARCH_STEPS {
                window = SearchWindow::new(
                    max_rows,
                    max_cols,
                    BlockOffset {
                        row: best.y as usize,
                        col: best.x as usize,
                    },
                    blk_w,
                    blk_h,
                    dist_x,
                    dist_y,
                );
            }
        }

        if lowest_sse == u64::MAX {
            // nothing was ever compared, so score the unmoved block
            let unmoved = BlockRegion::new(self.reference, anchor, blk_w, blk_h);
            lowest_sse = get_sse(&org, &unmoved);
        }

        BlockMotion {
            anchor,
            mv: MotionVector::between(anchor, best),
            mse: sse_to_mse(lowest_sse, org.sample_count()),
            stalled_steps,
        }
    }

    /// Searches every block of the target frame in parallel.
    ///
    /// Blocks are independent, so the result does not depend on the number
    /// of worker threads.
    pub fn estimate_frame_motion(&self) -> MotionField {
        let stats = (0..self.grid.len())
            .into_par_iter()
            .map(|i| self.estimate_block_motion(self.grid.anchor(i)))
            .collect::<Vec<_>>();

        MotionField::new(
            stats,
            self.grid.cols(),
            self.grid.rows(),
            self.grid.block_width(),
            self.grid.block_height(),
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "allow in test files")]

    use super::*;

    // xorshift noise, so that no two blocks of a frame look alike
    fn noise_frame(cols: usize, rows: usize, channels: usize, seed: u32) -> Frame<u8> {
        let mut frame = Frame::new(cols, rows, channels, 255);
        let mut state = seed.max(1);
        for c in 0..channels {
            for r in 0..rows {
                for pixel in frame.row_mut(c, r).iter_mut() {
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    *pixel = (state >> 24) as u8;
                }
            }
        }
        frame
    }

    // target(r, c) = reference(r + dy, c + dx), zero where that falls outside
    fn translate(reference: &Frame<u8>, dx: isize, dy: isize) -> Frame<u8> {
        let mut target = reference.new_like();
        for c in 0..reference.channels() {
            for r in 0..reference.rows() {
                for col in 0..reference.cols() {
                    let src_r = r as isize + dy;
                    let src_c = col as isize + dx;
                    if src_r < 0 || src_c < 0 {
                        continue;
                    }
                    if let Some(p) = reference.get(c, src_r as usize, src_c as usize) {
                        target.set(c, r, col, p).unwrap();
                    }
                }
            }
        }
        target
    }

    fn cfg(block: usize, radius: usize) -> MatchConfig {
        MatchConfig {
            block_width: block,
            block_height: block,
            search_horizontal: radius,
            search_vertical: radius,
        }
    }

    #[test]
    fn step_distance_schedule() {
        assert_eq!(next_step_distance(0), 0);
        assert_eq!(next_step_distance(1), 1);
        assert_eq!(next_step_distance(2), 2);
        assert_eq!(next_step_distance(3), 3);
        assert_eq!(next_step_distance(4), 2);
        assert_eq!(next_step_distance(5), 3);
        assert_eq!(next_step_distance(6), 2);
        assert_eq!(next_step_distance(8), 2);
        assert_eq!(next_step_distance(16), 2);
    }

    #[test]
    fn axis_offsets_collapse_at_zero() {
        assert_eq!(axis_offsets(0).as_slice(), &[0]);
        assert_eq!(axis_offsets(3).as_slice(), &[-3, 0, 3]);
    }

    #[test]
    fn identical_frames_have_no_motion() {
        let frame = noise_frame(32, 24, 3, 7);
        let search = ThreeStepSearch::new(&frame, &frame, cfg(8, 8)).unwrap();
        let field = search.estimate_frame_motion();
        assert_eq!(field.len(), 12);
        for block in field.blocks() {
            assert!(block.mv.is_zero(), "block at {} moved {}", block.anchor, block.mv);
            assert_eq!(block.mse, 0.0);
            assert_eq!(block.stalled_steps, 0);
        }
    }

    #[test]
    fn recovers_translation_on_first_step_grid() {
        let reference = noise_frame(48, 48, 1, 99);
        for &(dx, dy) in &[(2, -2), (-2, 0), (0, 2), (2, 2)] {
            let target = translate(&reference, dx, dy);
            let search = ThreeStepSearch::new(&reference, &target, cfg(8, 4)).unwrap();
            let field = search.estimate_frame_motion();
            // border blocks pull in zero fill, interior ones are exact copies
            for by in 1..field.rows - 1 {
                for bx in 1..field.cols - 1 {
                    let block = field[by][bx];
                    assert_eq!(block.mv, MotionVector { row: dy, col: dx });
                    assert_eq!(block.mse, 0.0);
                }
            }
        }
    }

    #[test]
    fn matches_stay_inside_reference() {
        let reference = noise_frame(40, 32, 2, 3);
        let target = noise_frame(40, 32, 2, 4);
        let search = ThreeStepSearch::new(&reference, &target, cfg(8, 16)).unwrap();
        for block in search.estimate_frame_motion().blocks() {
            let po = PlaneOffset::from(block.anchor) + block.mv;
            assert!(po.x >= 0 && po.y >= 0);
            assert!(po.x as usize + 8 <= 40 && po.y as usize + 8 <= 32);
            // three steps can move at most 16 / 2 + next(8) + 1 pixels
            assert!(block.mv.col.abs() <= 11 && block.mv.row.abs() <= 11);
        }
    }

    #[test]
    fn top_left_block_with_large_radius() {
        let reference = noise_frame(16, 16, 1, 11);
        let target = translate(&reference, -3, -3);
        let search = ThreeStepSearch::new(&reference, &target, cfg(8, 64)).unwrap();
        let block = search.estimate_block_motion(BlockOffset { row: 0, col: 0 });
        let po = PlaneOffset::from(block.anchor) + block.mv;
        assert!(po.x >= 0 && po.y >= 0);
    }

    #[test]
    fn unit_radius_searches_only_the_final_step() {
        let reference = noise_frame(24, 24, 1, 5);
        let target = translate(&reference, 1, -1);
        let search = ThreeStepSearch::new(&reference, &target, cfg(8, 1)).unwrap();
        let block = search.estimate_block_motion(BlockOffset { row: 8, col: 8 });
        assert_eq!(block.mv, MotionVector { row: -1, col: 1 });
        assert_eq!(block.mse, 0.0);
    }

    #[test]
    fn thread_count_does_not_change_result() {
        let reference = noise_frame(64, 32, 1, 21);
        let target = noise_frame(64, 32, 1, 22);
        let search = ThreeStepSearch::new(&reference, &target, cfg(8, 6)).unwrap();
        let parallel = search.estimate_frame_motion();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap();
        let serial = pool.install(|| search.estimate_frame_motion());
        assert_eq!(parallel, serial);
    }

    #[test]
    fn rejects_mismatched_frames() {
        let a = noise_frame(16, 16, 1, 1);
        let b = noise_frame(16, 8, 1, 1);
        assert!(matches!(
            ThreeStepSearch::new(&a, &b, cfg(8, 4)),
            Err(MatchError::FrameMismatch { .. })
        ));
    }
}
