//! Grayscale frame buffers and the channel that retains the previous frame
//! across iterations.

use crate::video::VideoSource;

/// 8-bit luma image backed by a fixed-capacity buffer of `N` pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame<const N: usize> {
    width: u16,
    height: u16,
    pixels: heapless::Vec<u8, N>,
}

impl<const N: usize> Frame<N> {
    pub const fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: heapless::Vec::new(),
        }
    }

    /// `None` when `width × height` exceeds `N`.
    pub fn filled(width: u16, height: u16, luma: u8) -> Option<Self> {
        let mut frame = Self::new();
        frame.reshape(width, height, luma).then_some(frame)
    }

    /// Change the geometry, filling every pixel with `luma`.
    pub fn reshape(&mut self, width: u16, height: u16, luma: u8) -> bool {
        let len = width as usize * height as usize;
        if len > N {
            return false;
        }
        self.pixels.clear();
        if self.pixels.resize(len, luma).is_err() {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Out-of-bounds writes are clipped.
    pub fn set(&mut self, x: i32, y: i32, luma: u8) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = luma;
        }
    }

    pub fn mean_luma(&self) -> u8 {
        if self.pixels.is_empty() {
            return 0;
        }
        let sum: u32 = self.pixels.iter().map(|&p| p as u32).sum();
        (sum / self.pixels.len() as u32) as u8
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

impl<const N: usize> Default for Frame<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds at most one `previous` frame.
///
/// The `current` frame is only ever borrowed from the video source for the
/// iteration that retrieved it; `commit` takes a deep copy of it.
pub struct FrameChannel<F> {
    previous: Option<F>,
}

impl<F: Clone> FrameChannel<F> {
    pub const fn new() -> Self {
        Self { previous: None }
    }

    /// The frame the source retrieved this iteration, if any. No source, or a
    /// source with nothing to hand out, is a normal state.
    pub fn acquire_current<V>(source: Option<&V>) -> Option<&F>
    where
        V: VideoSource<Frame = F>,
    {
        source.and_then(|s| s.retrieve())
    }

    /// Replace `previous` with a copy of `current`. The old buffer is
    /// released before the copy is made. No-op when `current` is `None`.
    pub fn commit(&mut self, current: Option<&F>) {
        if let Some(frame) = current {
            drop(self.previous.take());
            self.previous = Some(frame.clone());
        }
    }

    pub fn previous(&self) -> Option<&F> {
        self.previous.as_ref()
    }

    pub fn previous_mut(&mut self) -> Option<&mut F> {
        self.previous.as_mut()
    }
}

impl<F: Clone> Default for FrameChannel<F> {
    fn default() -> Self {
        Self::new()
    }
}
