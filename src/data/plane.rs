use v_frame::pixel::Pixel;

use super::{block::BlockOffset, frame::Frame};

/// Absolute offset in pixels inside a frame. May lie outside the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaneOffset {
    /// Column.
    pub x: isize,
    /// Row.
    pub y: isize,
}

impl From<BlockOffset> for PlaneOffset {
    fn from(bo: BlockOffset) -> Self {
        Self {
            x: bo.col as isize,
            y: bo.row as isize,
        }
    }
}

/// Rectangle of the reference frame in which candidate blocks may lie.
///
/// Ranges are half-open: `[col_start, col_stop)` and `[row_start, row_stop)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchWindow {
    /// First admissible column.
    pub col_start: usize,
    /// One past the last admissible column.
    pub col_stop: usize,
    /// First admissible row.
    pub row_start: usize,
    /// One past the last admissible row.
    pub row_stop: usize,
}

impl SearchWindow {
    /// Builds the window around a block anchored at `center`, extended by
    /// `h_radius` columns and `v_radius` rows on each side and clamped to a
    /// `max_rows` x `max_cols` frame.
    ///
    /// Clamping never fails: a block near the frame edge simply gets a
    /// smaller window.
    pub fn new(
        max_rows: usize,
        max_cols: usize,
        center: BlockOffset,
        block_width: usize,
        block_height: usize,
        h_radius: usize,
        v_radius: usize,
    ) -> Self {
        Self {
            col_start: center.col.saturating_sub(h_radius),
            col_stop: (center.col + block_width + h_radius).min(max_cols),
            row_start: center.row.saturating_sub(v_radius),
            row_stop: (center.row + block_height + v_radius).min(max_rows),
        }
    }

    /// Returns true if a `width` x `height` block anchored at `po` lies
    /// entirely inside the window.
    pub const fn contains_block(&self, po: PlaneOffset, width: usize, height: usize) -> bool {
        po.x >= self.col_start as isize
            && po.y >= self.row_start as isize
            && po.x + width as isize <= self.col_stop as isize
            && po.y + height as isize <= self.row_stop as isize
    }
}

/// A block-sized view into one frame, spanning all of its channels.
///
/// The view borrows the frame, so comparing candidates never copies pixels.
#[derive(Debug, Clone, Copy)]
pub struct BlockRegion<'a, T: Pixel> {
    frame: &'a Frame<T>,
    origin: BlockOffset,
    width: usize,
    height: usize,
}

impl<'a, T: Pixel> BlockRegion<'a, T> {
    /// A `width` x `height` view of `frame` with its top-left corner at
    /// `origin`.
    ///
    /// # Panics
    ///
    /// - If the block does not lie inside the frame
    pub fn new(frame: &'a Frame<T>, origin: BlockOffset, width: usize, height: usize) -> Self {
        assert!(
            origin.col + width <= frame.cols() && origin.row + height <= frame.rows(),
            "block {width}x{height} at {origin} exceeds {}x{} frame",
            frame.cols(),
            frame.rows()
        );
        Self {
            frame,
            origin,
            width,
            height,
        }
    }

    /// Top-left corner of the block.
    pub const fn origin(&self) -> BlockOffset {
        self.origin
    }

    /// Block width.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Block height.
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Channels of the underlying frame.
    pub fn channels(&self) -> usize {
        self.frame.channels()
    }

    /// The `row`-th row of the block in `channel`, `width()` samples long.
    pub fn row(&self, channel: usize, row: usize) -> &'a [T] {
        debug_assert!(row < self.height);
        let frame_row = self.frame.row(channel, self.origin.row + row);
        &frame_row[self.origin.col..self.origin.col + self.width]
    }

    /// Iterates over every row of every channel, channel-major.
    pub fn rows_iter(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        (0..self.channels()).flat_map(move |c| (0..self.height).map(move |r| self.row(c, r)))
    }

    /// Number of samples covered by the block across all channels.
    pub fn sample_count(&self) -> usize {
        self.channels() * self.width * self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_clamped_at_top_left() {
        let w = SearchWindow::new(64, 64, BlockOffset { row: 0, col: 0 }, 8, 8, 16, 16);
        assert_eq!(w.col_start, 0);
        assert_eq!(w.row_start, 0);
        assert_eq!(w.col_stop, 24);
        assert_eq!(w.row_stop, 24);
    }

    #[test]
    fn window_is_clamped_at_bottom_right() {
        let w = SearchWindow::new(32, 48, BlockOffset { row: 24, col: 40 }, 8, 8, 4, 2);
        assert_eq!((w.col_start, w.col_stop), (36, 48));
        assert_eq!((w.row_start, w.row_stop), (22, 32));
    }

    #[test]
    fn interior_window_is_nominal() {
        let w = SearchWindow::new(64, 64, BlockOffset { row: 16, col: 24 }, 8, 4, 3, 5);
        assert_eq!((w.col_start, w.col_stop), (21, 35));
        assert_eq!((w.row_start, w.row_stop), (11, 25));
    }

    #[test]
    fn contains_block_checks_every_side() {
        let w = SearchWindow::new(64, 64, BlockOffset { row: 16, col: 16 }, 8, 8, 4, 4);
        assert!(w.contains_block(PlaneOffset { x: 12, y: 12 }, 8, 8));
        assert!(w.contains_block(PlaneOffset { x: 20, y: 20 }, 8, 8));
        assert!(!w.contains_block(PlaneOffset { x: 11, y: 16 }, 8, 8));
        assert!(!w.contains_block(PlaneOffset { x: 16, y: 11 }, 8, 8));
        assert!(!w.contains_block(PlaneOffset { x: 21, y: 16 }, 8, 8));
        assert!(!w.contains_block(PlaneOffset { x: 16, y: 21 }, 8, 8));
        assert!(!w.contains_block(PlaneOffset { x: -1, y: 0 }, 8, 8));
    }

    #[test]
    fn region_rows_are_views_into_frame() {
        let mut frame = Frame::<u8>::new(8, 8, 2, 255);
        frame.set(1, 5, 6, 9).unwrap();
        let region = BlockRegion::new(&frame, BlockOffset { row: 4, col: 4 }, 4, 4);
        assert_eq!(region.row(1, 1), &[0, 0, 9, 0]);
        assert_eq!(region.rows_iter().count(), 8);
        assert_eq!(region.sample_count(), 32);
    }
}
