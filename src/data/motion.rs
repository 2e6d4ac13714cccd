use std::{
    fmt,
    ops::{self, Index, IndexMut},
};

use super::{block::BlockOffset, plane::PlaneOffset};

/// Full-pel displacement from a block's anchor in the target frame to the
/// anchor of its best match in the reference frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MotionVector {
    /// Vertical displacement (dy).
    pub row: isize,
    /// Horizontal displacement (dx).
    pub col: isize,
}

impl MotionVector {
    /// Vector between a block anchor and a matched position.
    pub fn between(anchor: BlockOffset, matched: PlaneOffset) -> Self {
        let anchor = PlaneOffset::from(anchor);
        Self {
            row: matched.y - anchor.y,
            col: matched.x - anchor.x,
        }
    }

    /// Horizontal component.
    pub const fn dx(self) -> isize {
        self.col
    }

    /// Vertical component.
    pub const fn dy(self) -> isize {
        self.row
    }

    /// Returns true for the zero vector.
    pub const fn is_zero(self) -> bool {
        self.row == 0 && self.col == 0
    }
}

impl ops::Add<MotionVector> for PlaneOffset {
    type Output = PlaneOffset;

    fn add(self, rhs: MotionVector) -> PlaneOffset {
        PlaneOffset {
            x: self.x + rhs.col,
            y: self.y + rhs.row,
        }
    }
}

impl fmt::Display for MotionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// The search result for a single block.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct BlockMotion {
    /// Anchor of the block in the target frame.
    pub anchor: BlockOffset,
    /// Displacement to the best match.
    pub mv: MotionVector,
    /// Mean squared error between the block and its match.
    pub mse: f64,
    /// Refinement steps in which every candidate fell outside the window.
    pub stalled_steps: u8,
}

/// Motion for every block of a frame, stored in row-major block order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MotionField {
    #[cfg_attr(feature = "serialize", serde(rename = "blocks"))]
    stats: Box<[BlockMotion]>,
    /// Blocks per block row.
    pub cols: usize,
    /// Number of block rows.
    pub rows: usize,
    /// Block width in pixels.
    pub block_width: usize,
    /// Block height in pixels.
    pub block_height: usize,
}

impl MotionField {
    /// # Panics
    ///
    /// - If `stats` does not hold exactly `cols * rows` entries
    pub(crate) fn new(
        stats: Vec<BlockMotion>,
        cols: usize,
        rows: usize,
        block_width: usize,
        block_height: usize,
    ) -> Self {
        assert_eq!(stats.len(), cols * rows);
        Self {
            stats: stats.into_boxed_slice(),
            cols,
            rows,
            block_width,
            block_height,
        }
    }

    /// All block results in row-major order.
    pub fn blocks(&self) -> &[BlockMotion] {
        &self.stats
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Returns true if the field holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Mean of the per-block MSE, or 0 for an empty field.
    pub fn mean_mse(&self) -> f64 {
        if self.stats.is_empty() {
            return 0.0;
        }
        self.stats.iter().map(|b| b.mse).sum::<f64>() / self.stats.len() as f64
    }
}

impl Index<usize> for MotionField {
    type Output = [BlockMotion];

    fn index(&self, index: usize) -> &Self::Output {
        &self.stats[index * self.cols..(index + 1) * self.cols]
    }
}

impl IndexMut<usize> for MotionField {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.stats[index * self.cols..(index + 1) * self.cols]
    }
}
