use v_frame::{pixel::Pixel, plane::Plane};

/// A multi-channel picture whose channels all share one extent.
///
/// Every channel is stored as an unpadded [`Plane`], so a channel of an
/// RGB pixmap, the luma of a monochrome clip and the chroma of a 4:4:4 clip
/// are all addressed the same way.
#[derive(Debug, Clone)]
pub struct Frame<T: Pixel> {
    planes: Vec<Plane<T>>,
    max_value: u32,
}

impl<T: Pixel> Frame<T> {
    /// Creates a zero-filled frame.
    ///
    /// # Panics
    ///
    /// - If `channels` is 0
    /// - If `max_value` does not fit in `T`
    pub fn new(cols: usize, rows: usize, channels: usize, max_value: u32) -> Self {
        assert!(channels > 0, "a frame needs at least one channel");
        assert!(
            max_value <= (1u32 << (8 * size_of::<T>())) - 1,
            "max value {max_value} does not fit the pixel type"
        );
        let planes = (0..channels)
            .map(|_| {
                let mut plane = Plane::new(cols, rows, 0, 0, 0, 0);
                plane.data.fill(T::cast_from(0i32));
                plane
            })
            .collect();

        Self { planes, max_value }
    }

    /// Creates a zero-filled frame with the same extent and max value as `self`.
    pub fn new_like(&self) -> Self {
        Self::new(self.cols(), self.rows(), self.channels(), self.max_value)
    }

    /// Number of rows (frame height).
    pub fn rows(&self) -> usize {
        self.planes[0].cfg.height
    }

    /// Number of columns (frame width).
    pub fn cols(&self) -> usize {
        self.planes[0].cfg.width
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    /// The largest sample value this frame may hold.
    pub const fn max_value(&self) -> u32 {
        self.max_value
    }

    /// Returns true if both frames have the same rows, columns and channels.
    pub fn same_extent<U: Pixel>(&self, other: &Frame<U>) -> bool {
        self.rows() == other.rows()
            && self.cols() == other.cols()
            && self.channels() == other.channels()
    }

    /// The plane backing `channel`.
    pub fn plane(&self, channel: usize) -> &Plane<T> {
        &self.planes[channel]
    }

    /// Mutable access to the plane backing `channel`.
    pub fn plane_mut(&mut self, channel: usize) -> &mut Plane<T> {
        &mut self.planes[channel]
    }

    /// All channel planes in order.
    pub fn planes(&self) -> &[Plane<T>] {
        &self.planes
    }

    /// Mutable access to all channel planes.
    pub fn planes_mut(&mut self) -> &mut [Plane<T>] {
        &mut self.planes
    }

    /// One row of one channel, `cols()` samples long.
    ///
    /// # Panics
    ///
    /// - If `channel` or `row` is out of bounds
    pub fn row(&self, channel: usize, row: usize) -> &[T] {
        assert!(row < self.rows());
        let plane = &self.planes[channel];
        let start = row * plane.cfg.stride;
        &plane.data_origin()[start..start + plane.cfg.width]
    }

    /// Mutable access to one row of one channel.
    ///
    /// # Panics
    ///
    /// - If `channel` or `row` is out of bounds
    pub fn row_mut(&mut self, channel: usize, row: usize) -> &mut [T] {
        assert!(row < self.rows());
        let plane = &mut self.planes[channel];
        let start = row * plane.cfg.stride;
        let width = plane.cfg.width;
        &mut plane.data_origin_mut()[start..start + width]
    }

    /// Bounds-checked sample read.
    pub fn get(&self, channel: usize, row: usize, col: usize) -> Option<T> {
        if channel >= self.channels() || row >= self.rows() || col >= self.cols() {
            return None;
        }
        Some(self.row(channel, row)[col])
    }

    /// Bounds-checked sample write. Returns `None` if the position is outside
    /// the frame or the value exceeds the frame's max value.
    pub fn set(&mut self, channel: usize, row: usize, col: usize, value: T) -> Option<()> {
        if channel >= self.channels() || row >= self.rows() || col >= self.cols() {
            return None;
        }
        let sample: u32 = value.into();
        if sample > self.max_value {
            return None;
        }
        self.row_mut(channel, row)[col] = value;
        Some(())
    }
}

impl<T: Pixel> PartialEq for Frame<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_extent(other)
            && self.max_value == other.max_value
            && (0..self.channels())
                .all(|c| (0..self.rows()).all(|r| self.row(c, r) == other.row(c, r)))
    }
}

impl<T: Pixel> Eq for Frame<T> {}
