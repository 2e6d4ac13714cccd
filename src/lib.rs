//! Block matching motion estimation between two frames.
//!
//! The target frame is cut into fixed-size blocks. Each block is searched
//! for in a bounded window of the reference frame with a three step search
//! driven by the mean squared error, yielding one motion vector per block.
//! The motion vectors are then used to predict the target frame by copying
//! the matched regions out of the reference frame.
//!
//! Blocks are searched and reconstructed in parallel; the result is
//! deterministic regardless of the number of threads.

mod data;
mod error;
mod mc;
mod me;
pub mod pnm;
pub mod y4m;

use std::time::Instant;

use log::debug;
use v_frame::pixel::Pixel;

pub use crate::{
    data::{
        block::{BlockGrid, BlockOffset},
        frame::Frame,
        motion::{BlockMotion, MotionField, MotionVector},
        mse::get_mse,
        plane::{BlockRegion, PlaneOffset, SearchWindow},
    },
    error::MatchError,
    mc::{reconstruct, reconstruct_into},
    me::{SEARCH_STEPS, ThreeStepSearch, next_step_distance},
};

/// Parameters of a block matching run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// Width of a block, in pixels. Must divide the frame width.
    pub block_width: usize,
    /// Height of a block, in pixels. Must divide the frame height.
    pub block_height: usize,
    /// How far a match may lie to the left or right of its block.
    pub search_horizontal: usize,
    /// How far a match may lie above or below its block.
    pub search_vertical: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            block_width: 8,
            block_height: 8,
            search_horizontal: 8,
            search_vertical: 8,
        }
    }
}

impl MatchConfig {
    /// Checks that every parameter is non-zero.
    ///
    /// # Errors
    ///
    /// - `ZeroParameter` naming the first zero value.
    pub const fn validate(&self) -> Result<(), MatchError> {
        if self.block_width == 0 {
            return Err(MatchError::ZeroParameter("block width"));
        }
        if self.block_height == 0 {
            return Err(MatchError::ZeroParameter("block height"));
        }
        if self.search_horizontal == 0 {
            return Err(MatchError::ZeroParameter("horizontal search range"));
        }
        if self.search_vertical == 0 {
            return Err(MatchError::ZeroParameter("vertical search range"));
        }
        Ok(())
    }
}

/// Validates a frame pair against `cfg` and returns the block partition of
/// the target frame.
///
/// # Errors
///
/// - `ZeroParameter` if a configuration value is zero.
/// - `FrameMismatch` if the frames differ in rows, columns or channels.
/// - `EmptyFrame` if the frames have no rows or no columns.
/// - `DimensionMismatch` if the frames are not an exact multiple of the block
///   size.
pub fn validate_frames<T: Pixel>(
    reference: &Frame<T>,
    target: &Frame<T>,
    cfg: &MatchConfig,
) -> Result<BlockGrid, MatchError> {
    cfg.validate()?;
    if !reference.same_extent(target) {
        return Err(MatchError::FrameMismatch {
            ref_rows: reference.rows(),
            ref_cols: reference.cols(),
            ref_channels: reference.channels(),
            rows: target.rows(),
            cols: target.cols(),
            channels: target.channels(),
        });
    }
    BlockGrid::new(target, cfg)
}

/// Estimates the motion of every block of `target` relative to `reference`.
///
/// # Errors
///
/// See [`validate_frames`]. Nothing is searched if validation fails.
pub fn estimate_motion<T: Pixel>(
    reference: &Frame<T>,
    target: &Frame<T>,
    cfg: MatchConfig,
) -> Result<MotionField, MatchError> {
    Ok(ThreeStepSearch::new(reference, target, cfg)?.estimate_frame_motion())
}

/// Summary of a prediction pass.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct PredictionStats {
    /// Number of blocks searched.
    pub blocks: usize,
    /// Number of blocks with a non-zero motion vector.
    pub moving_blocks: usize,
    /// Mean of the per-block mean squared error.
    pub mean_mse: f64,
    /// Refinement steps, over all blocks, that found no admissible candidate.
    pub stalled_steps: usize,
    /// Seconds spent searching.
    pub search_time: f64,
    /// Seconds spent reconstructing.
    pub reconstruction_time: f64,
}

/// Results from a prediction pass.
#[derive(Debug, Clone)]
pub struct PredictionResults<T: Pixel> {
    /// Motion of every block of the target frame.
    pub motion_field: MotionField,
    /// The target frame as predicted from the reference frame.
    pub predicted: Frame<T>,
    /// Timing and quality summary.
    pub stats: PredictionStats,
}

/// Runs a full pass: validates the frames, estimates the motion of every
/// block of `target` and reconstructs `target` from `reference`.
///
/// This is the preferred, simplified interface for predicting one frame
/// from another.
///
/// # Errors
///
/// See [`validate_frames`]. No output is produced if validation fails.
pub fn predict_frame<T: Pixel>(
    reference: &Frame<T>,
    target: &Frame<T>,
    cfg: MatchConfig,
) -> Result<PredictionResults<T>, MatchError> {
    let search = ThreeStepSearch::new(reference, target, cfg)?;
    debug!(
        "Searching {} blocks of {}x{} in a {}x{} frame",
        search.grid().len(),
        cfg.block_width,
        cfg.block_height,
        target.cols(),
        target.rows()
    );

    let start_time = Instant::now();
    let motion_field = search.estimate_frame_motion();
    let search_time = start_time.elapsed().as_secs_f64();

    let start_time = Instant::now();
    let mut predicted = target.new_like();
    reconstruct_into(reference, &motion_field, &mut predicted);
    let reconstruction_time = start_time.elapsed().as_secs_f64();

    let stats = PredictionStats {
        blocks: motion_field.len(),
        moving_blocks: motion_field
            .blocks()
            .iter()
            .filter(|b| !b.mv.is_zero())
            .count(),
        mean_mse: motion_field.mean_mse(),
        stalled_steps: motion_field
            .blocks()
            .iter()
            .map(|b| b.stalled_steps as usize)
            .sum(),
        search_time,
        reconstruction_time,
    };
    debug!(
        "Search took {:.4}s, reconstruction {:.4}s, mean block MSE {:.3}",
        stats.search_time, stats.reconstruction_time, stats.mean_mse
    );

    Ok(PredictionResults {
        motion_field,
        predicted,
        stats,
    })
}
