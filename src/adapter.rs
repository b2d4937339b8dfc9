//! Bounded random access over forward-only streams.
//!
//! [`WindowedSource`] lets whole-image algorithms read pixels from a
//! [`Source`], and [`TargetAdapter`] lets them write pixels to a [`Sink`],
//! while holding only a few rows in memory.
//!
//! # Lossy fallback
//!
//! Both adapters keep a window of the most recent K rows
//! ([`StreamConfig::window_rows`]). Access inside the window or ahead of it
//! works as on a full image. Access to rows that already left the window is
//! not an error: reads return the encoding's transparent color and writes are
//! dropped. Algorithms that sweep top to bottom with a small vertical reach
//! (flips of narrow bands, convolutions, rotations by small angles) see exact
//! results. Algorithms that jump backwards far enough see the fallback.

use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::pixel::{Color, PixelEncoding};
use crate::row::PixelRow;
use crate::stream::{Sink, Source, StickyError};

/// Random-access read capability.
pub trait ImageView {
    fn size(&self) -> (u32, u32);
    fn encoding(&self) -> PixelEncoding;
    /// Pixel at `(x, y)`. Never fails; see the module docs for the fallback.
    fn pixel(&mut self, x: u32, y: u32) -> Color;
}

/// Random-access write capability.
pub trait ImageViewMut {
    fn size(&self) -> (u32, u32);
    fn encoding(&self) -> PixelEncoding;
    /// Store `color` at `(x, y)`. Writes outside the window are dropped.
    fn set_pixel(&mut self, x: u32, y: u32, color: Color);
}

/// First error of a worker, visible to other threads as soon as it is set.
#[derive(Clone, Debug, Default)]
pub(crate) struct ErrorSlot(Arc<OnceLock<StreamError>>);

impl ErrorSlot {
    /// Record `error` unless one is already recorded.
    pub(crate) fn set(&self, error: StreamError) {
        let _ = self.0.set(error);
    }

    pub(crate) fn get(&self) -> Option<StreamError> {
        self.0.get().cloned()
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0.get().is_some()
    }
}

/// [`ImageView`] over a forward-only [`Source`].
///
/// Keeps the most recent K rows ([`StreamConfig::window_rows`]). Reading a row
/// ahead of the window pulls the source forward. Reading a row that already
/// left the window, a pixel out of bounds, or anything past a read failure
/// returns the encoding's transparent color instead of an error. The failure
/// itself is kept and available from [`error`](Self::error).
pub struct WindowedSource<S: Source = Box<dyn Source>> {
    source: S,
    width: u32,
    height: u32,
    encoding: PixelEncoding,
    ring: Vec<PixelRow>,
    /// Read target; swapped into the ring only once a row arrived intact.
    scratch: PixelRow,
    /// Rows pulled from the source so far.
    loaded: u32,
    ended: bool,
    error: StickyError,
    slot: Option<ErrorSlot>,
}

impl<S: Source> WindowedSource<S> {
    pub fn new(source: S, config: &StreamConfig) -> Self {
        let (width, height) = source.size();
        let rows = config.window().min(height.max(1) as usize);
        let ring = (0..rows).map(|_| source.new_row()).collect();
        Self {
            encoding: source.encoding(),
            scratch: source.new_row(),
            source,
            width,
            height,
            ring,
            loaded: 0,
            ended: false,
            error: StickyError::default(),
            slot: None,
        }
    }

    pub(crate) fn with_error_slot(source: S, config: &StreamConfig, slot: ErrorSlot) -> Self {
        let mut adapter = Self::new(source, config);
        adapter.slot = Some(slot);
        adapter
    }

    /// The first read failure, if any. Truncation shows up as
    /// [`StreamError::UnexpectedEnd`].
    pub fn error(&self) -> Option<&StreamError> {
        self.error.get()
    }

    /// Rows pulled from the source so far.
    pub fn rows_loaded(&self) -> u32 {
        self.loaded
    }

    /// Give back the source along with the first read failure.
    pub fn into_parts(self) -> (S, Option<StreamError>) {
        let error = self.error.get().cloned();
        (self.source, error)
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn fail(&mut self, error: StreamError) {
        warn!(loaded = self.loaded, %error, "windowed source: read failed, serving transparent pixels");
        if let Some(slot) = &self.slot {
            slot.set(error.clone());
        }
        self.error.set(error);
        self.ended = true;
    }

    /// Pull rows until row `y` is loaded. False if the source gave out first.
    fn advance_to(&mut self, y: u32) -> bool {
        let n = self.ring.len();
        while self.loaded <= y {
            if self.ended {
                return false;
            }
            match self.source.read_row(&mut self.scratch) {
                Ok(0) => self.fail(StreamError::UnexpectedEnd),
                Ok(_) => {
                    std::mem::swap(&mut self.ring[self.loaded as usize % n], &mut self.scratch);
                    self.loaded += 1;
                }
                Err(e) => self.fail(e),
            }
        }
        true
    }
}

impl<S: Source> ImageView for WindowedSource<S> {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    fn pixel(&mut self, x: u32, y: u32) -> Color {
        let transparent = self.encoding.transparent();
        if x >= self.width || y >= self.height || !self.advance_to(y) {
            return transparent;
        }
        let n = self.ring.len();
        if self.loaded - y > n as u32 {
            return transparent;
        }
        self.ring[y as usize % n].get(x as usize).unwrap_or(transparent)
    }
}

/// [`ImageViewMut`] over a [`Sink`].
///
/// Holds a window of K rows starting at the first row not yet written to the
/// sink. Setting a pixel below the window moves the window down, writing the
/// rows it leaves behind in order. Unset pixels are transparent.
pub struct TargetAdapter<S: Sink = Box<dyn Sink>> {
    sink: S,
    width: u32,
    height: u32,
    encoding: PixelEncoding,
    ring: Vec<PixelRow>,
    /// First row not yet written to the sink.
    base: u32,
    error: StickyError,
}

impl<S: Sink> TargetAdapter<S> {
    pub fn new(sink: S, config: &StreamConfig) -> Self {
        let (width, height) = sink.size();
        let rows = config.window().min(height.max(1) as usize);
        let ring = (0..rows).map(|_| sink.new_row()).collect();
        Self {
            encoding: sink.encoding(),
            sink,
            width,
            height,
            ring,
            base: 0,
            error: StickyError::default(),
        }
    }

    /// The first sink failure, if any.
    pub fn error(&self) -> Option<&StreamError> {
        self.error.get()
    }

    /// Rows written to the sink so far.
    pub fn rows_flushed(&self) -> u32 {
        self.base
    }

    /// Write the oldest buffered row and recycle its slot.
    fn emit_oldest(&mut self) -> Result<(), StreamError> {
        let n = self.ring.len();
        let slot = self.base as usize % n;
        self.sink.write_row(&self.ring[slot])?;
        self.ring[slot].fill(self.encoding.transparent());
        self.base += 1;
        Ok(())
    }

    /// Write every remaining row, set or not, up to the declared height.
    pub fn flush(&mut self) -> Result<(), StreamError> {
        self.error.check()?;
        while self.base < self.height {
            let result = self.emit_oldest();
            self.error.track(result)?;
        }
        Ok(())
    }

    /// [`flush`](Self::flush), then close the sink.
    pub fn finish(&mut self) -> Result<(), StreamError> {
        self.flush()?;
        self.sink.close()
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}

impl<S: Sink> ImageViewMut for TargetAdapter<S> {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x >= self.width || y >= self.height || y < self.base || self.error.get().is_some() {
            return;
        }
        let n = self.ring.len() as u32;
        while y >= self.base + n {
            let result = self.emit_oldest();
            if let Err(e) = self.error.track(result) {
                debug!(error = %e, "target adapter: sink failed, dropping pixels");
                return;
            }
        }
        self.ring[(y % n) as usize].set(x as usize, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemorySink, MemorySource};

    fn numbered(height: u8) -> MemorySource {
        MemorySource::new((0..height).map(|v| PixelRow::from(vec![v, v + 100])).collect()).unwrap()
    }

    fn small() -> StreamConfig {
        StreamConfig::default().with_window_rows(3)
    }

    #[test]
    fn reads_in_window_and_ahead() {
        let mut view = WindowedSource::new(numbered(10), &small());
        assert_eq!(view.pixel(1, 0), Color::Gray8(100));
        assert_eq!(view.pixel(0, 6), Color::Gray8(6));
        assert_eq!(view.rows_loaded(), 7);
        // Rows 4..=6 are in the window.
        assert_eq!(view.pixel(0, 4), Color::Gray8(4));
        assert_eq!(view.pixel(1, 5), Color::Gray8(105));
    }

    #[test]
    fn behind_window_falls_back_to_transparent() {
        let mut view = WindowedSource::new(numbered(10), &small());
        assert_eq!(view.pixel(0, 6), Color::Gray8(6));
        assert_eq!(view.pixel(0, 3), PixelEncoding::Gray8.transparent());
        assert!(view.error().is_none());
    }

    #[test]
    fn out_of_bounds_is_transparent() {
        let mut view = WindowedSource::new(numbered(2), &small());
        assert_eq!(view.pixel(2, 0), PixelEncoding::Gray8.transparent());
        assert_eq!(view.pixel(0, 2), PixelEncoding::Gray8.transparent());
        assert_eq!(view.rows_loaded(), 0);
    }

    #[test]
    fn read_failure_is_recorded_and_published() {
        let slot = ErrorSlot::default();
        let src = numbered(5).fail_after(2);
        let mut view = WindowedSource::with_error_slot(src, &small(), slot.clone());
        assert_eq!(view.pixel(0, 1), Color::Gray8(1));
        assert!(!slot.is_set());
        assert_eq!(view.pixel(0, 3), PixelEncoding::Gray8.transparent());
        assert!(matches!(slot.get(), Some(StreamError::Io(_))));
        // Rows already in the window are still served.
        assert_eq!(view.pixel(0, 0), Color::Gray8(0));
        let (_, err) = view.into_parts();
        assert!(matches!(err, Some(StreamError::Io(_))));
    }

    #[test]
    fn target_writes_rows_in_order() {
        let sink = MemorySink::new(PixelEncoding::Gray8, 2, 5);
        let mut target = TargetAdapter::new(sink, &small());
        // Setting row 4 first pushes rows 0 and 1 out while still unset.
        for y in (0..5).rev() {
            target.set_pixel(0, y, Color::Gray8(y as u8 + 10));
        }
        target.finish().unwrap();
        let sink = target.into_inner();
        assert!(sink.is_closed());
        let firsts: Vec<_> = sink.rows().iter().map(|r| r.get(0)).collect();
        assert_eq!(
            firsts,
            [0u8, 0, 12, 13, 14].map(|v| Some(Color::Gray8(v))).to_vec()
        );
    }

    #[test]
    fn target_drops_rows_already_flushed() {
        let sink = MemorySink::new(PixelEncoding::Gray8, 1, 6);
        let mut target = TargetAdapter::new(sink, &small());
        for y in 0..6 {
            target.set_pixel(0, y, Color::Gray8(y as u8 + 1));
        }
        assert_eq!(target.rows_flushed(), 3);
        target.set_pixel(0, 1, Color::Gray8(99));
        target.set_pixel(5, 5, Color::Gray8(99));
        target.flush().unwrap();
        let rows = target.into_inner().into_rows();
        let values: Vec<_> = rows.iter().map(|r| r.get(0)).collect();
        assert_eq!(values, (1..=6u8).map(|v| Some(Color::Gray8(v))).collect::<Vec<_>>());
    }

    #[test]
    fn unset_pixels_are_transparent() {
        let sink = MemorySink::new(PixelEncoding::Rgba32, 2, 2);
        let mut target = TargetAdapter::new(sink, &StreamConfig::default());
        target.set_pixel(0, 0, PixelEncoding::Rgba32.white());
        target.flush().unwrap();
        let rows = target.into_inner().into_rows();
        assert_eq!(rows[0].get(1), Some(PixelEncoding::Rgba32.transparent()));
        assert_eq!(rows[1].get(0), Some(PixelEncoding::Rgba32.transparent()));
    }
}
