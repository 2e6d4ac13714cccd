use std::fmt::{self, Display};

use v_frame::pixel::Pixel;

use crate::{MatchConfig, MatchError, data::frame::Frame};

/// Absolute position of a block's top-left sample, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct BlockOffset {
    /// Top row of the block.
    pub row: usize,
    /// Left column of the block.
    pub col: usize,
}

impl Display for BlockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The partition of a frame into equally sized, non-overlapping blocks.
///
/// Blocks are numbered in row-major order: block `i` sits in block row
/// `i / cols()` and block column `i % cols()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockGrid {
    block_width: usize,
    block_height: usize,
    // expressed in blocks
    cols: usize,
    rows: usize,
}

impl BlockGrid {
    /// Segments `frame` into `cfg.block_width` x `cfg.block_height` blocks.
    ///
    /// # Errors
    ///
    /// - `ZeroParameter` if a block dimension is zero.
    /// - `EmptyFrame` if the frame has no rows or no columns.
    /// - `DimensionMismatch` if the frame is not an exact multiple of the
    ///   block size. No blocks are produced in that case.
    pub fn new<T: Pixel>(frame: &Frame<T>, cfg: &MatchConfig) -> Result<Self, MatchError> {
        Self::from_extent(frame.rows(), frame.cols(), cfg)
    }

    /// Same as [`BlockGrid::new`], from a bare frame extent.
    ///
    /// # Errors
    ///
    /// See [`BlockGrid::new`].
    pub fn from_extent(rows: usize, cols: usize, cfg: &MatchConfig) -> Result<Self, MatchError> {
        if cfg.block_width == 0 {
            return Err(MatchError::ZeroParameter("block width"));
        }
        if cfg.block_height == 0 {
            return Err(MatchError::ZeroParameter("block height"));
        }
        if rows == 0 || cols == 0 {
            return Err(MatchError::EmptyFrame { rows, cols });
        }
        if cols % cfg.block_width != 0 || rows % cfg.block_height != 0 {
            return Err(MatchError::DimensionMismatch {
                rows,
                cols,
                block_height: cfg.block_height,
                block_width: cfg.block_width,
            });
        }

        Ok(Self {
            block_width: cfg.block_width,
            block_height: cfg.block_height,
            cols: cols / cfg.block_width,
            rows: rows / cfg.block_height,
        })
    }

    /// Number of blocks per block row.
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Number of block rows.
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Total number of blocks.
    pub const fn len(&self) -> usize {
        self.cols * self.rows
    }

    /// Returns true if the frame had no samples to cover.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block width in pixels.
    pub const fn block_width(&self) -> usize {
        self.block_width
    }

    /// Block height in pixels.
    pub const fn block_height(&self) -> usize {
        self.block_height
    }

    /// Anchor of the block at block row `by`, block column `bx`.
    pub const fn offset(&self, bx: usize, by: usize) -> BlockOffset {
        BlockOffset {
            row: by * self.block_height,
            col: bx * self.block_width,
        }
    }

    /// Anchor of the `index`-th block in row-major order.
    ///
    /// # Panics
    ///
    /// - If `index` is not less than `len()`
    pub fn anchor(&self, index: usize) -> BlockOffset {
        assert!(index < self.len(), "block {index} out of {}", self.len());
        self.offset(index % self.cols, index / self.cols)
    }

    /// All block anchors in row-major order.
    pub fn anchors(&self) -> impl ExactSizeIterator<Item = BlockOffset> + '_ {
        (0..self.len()).map(|i| self.offset(i % self.cols, i / self.cols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(block_width: usize, block_height: usize) -> MatchConfig {
        MatchConfig {
            block_width,
            block_height,
            ..Default::default()
        }
    }

    #[test]
    fn covers_frame_in_row_major_order() {
        let grid = BlockGrid::from_extent(16, 24, &cfg(8, 8)).unwrap();
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.len(), 6);
        let anchors: Vec<_> = grid.anchors().collect();
        assert_eq!(anchors[0], BlockOffset { row: 0, col: 0 });
        assert_eq!(anchors[2], BlockOffset { row: 0, col: 16 });
        assert_eq!(anchors[3], BlockOffset { row: 8, col: 0 });
        assert_eq!(anchors[5], BlockOffset { row: 8, col: 16 });
        assert_eq!(grid.anchor(4), anchors[4]);
    }

    #[test]
    fn rectangular_blocks() {
        let grid = BlockGrid::from_extent(12, 16, &cfg(16, 4)).unwrap();
        assert_eq!((grid.cols(), grid.rows()), (1, 3));
        assert_eq!(grid.anchor(2), BlockOffset { row: 8, col: 0 });
    }

    #[test]
    fn rejects_partial_blocks() {
        let frame = Frame::<u8>::new(16, 15, 1, 255);
        assert_eq!(
            BlockGrid::new(&frame, &cfg(8, 8)),
            Err(MatchError::DimensionMismatch {
                rows: 15,
                cols: 16,
                block_height: 8,
                block_width: 8,
            })
        );
        assert!(matches!(
            BlockGrid::from_extent(16, 20, &cfg(8, 8)),
            Err(MatchError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_empty_frames() {
        assert_eq!(
            BlockGrid::from_extent(8, 0, &cfg(8, 8)),
            Err(MatchError::EmptyFrame { rows: 8, cols: 0 })
        );
        assert_eq!(
            BlockGrid::from_extent(0, 8, &cfg(8, 8)),
            Err(MatchError::EmptyFrame { rows: 0, cols: 8 })
        );
    }

    #[test]
    fn rejects_zero_block_size() {
        assert_eq!(
            BlockGrid::from_extent(16, 16, &cfg(0, 8)),
            Err(MatchError::ZeroParameter("block width"))
        );
        assert_eq!(
            BlockGrid::from_extent(16, 16, &cfg(8, 0)),
            Err(MatchError::ZeroParameter("block height"))
        );
    }
}
