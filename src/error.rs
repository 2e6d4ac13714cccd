use thiserror::Error;

/// Errors raised while validating a block matching run.
///
/// All of these are structural: they are detected before any block is
/// searched, and no partial output is produced once one is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The frame extent is not an exact multiple of the block size.
    #[error(
        "frame of {rows}x{cols} (rows x cols) is not an exact multiple of the \
         {block_height}x{block_width} block size"
    )]
    DimensionMismatch {
        /// Number of rows in the frame.
        rows: usize,
        /// Number of columns in the frame.
        cols: usize,
        /// Configured block height.
        block_height: usize,
        /// Configured block width.
        block_width: usize,
    },
    /// A frame has no rows or no columns.
    #[error("frame of {rows}x{cols} (rows x cols) holds no blocks")]
    EmptyFrame {
        /// Number of rows in the frame.
        rows: usize,
        /// Number of columns in the frame.
        cols: usize,
    },
    /// A configuration value that must be positive was zero.
    #[error("{0} must be non-zero")]
    ZeroParameter(&'static str),
    /// The reference and target frames do not share one extent.
    #[error(
        "reference frame is {ref_rows}x{ref_cols}x{ref_channels} but target frame is \
         {rows}x{cols}x{channels}"
    )]
    FrameMismatch {
        /// Rows of the reference frame.
        ref_rows: usize,
        /// Columns of the reference frame.
        ref_cols: usize,
        /// Channels of the reference frame.
        ref_channels: usize,
        /// Rows of the target frame.
        rows: usize,
        /// Columns of the target frame.
        cols: usize,
        /// Channels of the target frame.
        channels: usize,
    },
}
