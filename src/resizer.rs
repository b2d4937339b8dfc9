//! Crop and pad a stream to a rectangle.

use tracing::{debug, trace, warn};

use crate::error::StreamError;
use crate::limits::check_dimensions;
use crate::pixel::PixelEncoding;
use crate::row::PixelRow;
use crate::stream::{Source, StickyError};

/// A rectangle in source coordinates. May extend past the source on any side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering a whole `width` x `height` image.
    pub fn of_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// Wrap `source` so it produces the pixels under `rect`, white outside the source.
///
/// Returns `source` itself when `rect` covers it exactly.
pub fn resize(source: Box<dyn Source>, rect: Rect) -> Result<Box<dyn Source>, StreamError> {
    let (w, h) = source.size();
    if rect == Rect::of_size(w, h) {
        trace!(w, h, "resize: rectangle matches source, passing through");
        return Ok(source);
    }
    Ok(Box::new(Resizer::new(source, rect)?))
}

/// A [`Source`] cropping and padding its upstream to a [`Rect`].
pub struct Resizer {
    source: Box<dyn Source>,
    rect: Rect,
    scratch: PixelRow,
    next_row: u32,
    /// Source rows consumed so far.
    consumed: i64,
    error: StickyError,
    closed: bool,
}

impl Resizer {
    pub fn new(source: Box<dyn Source>, rect: Rect) -> Result<Self, StreamError> {
        check_dimensions(rect.width, rect.height)?;
        debug!(?rect, source = ?source.size(), "resizer configured");
        Ok(Self {
            scratch: source.new_row(),
            source,
            rect,
            next_row: 0,
            consumed: 0,
            error: StickyError::default(),
            closed: false,
        })
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    fn produce(&mut self, row: &mut PixelRow) -> Result<u32, StreamError> {
        let (src_w, src_h) = self.source.size();
        let sy = self.rect.y.saturating_add(i64::from(self.next_row));
        row.fill(row.encoding().white());

        if (0..i64::from(src_h)).contains(&sy) {
            while self.consumed <= sy {
                if self.source.read_row(&mut self.scratch)? == 0 {
                    warn!(consumed = self.consumed, src_h, "resizer: upstream ended early");
                    return Err(StreamError::UnexpectedEnd);
                }
                self.consumed += 1;
            }
            let lo = self.rect.x.max(0);
            let hi = self
                .rect
                .x
                .saturating_add(i64::from(self.rect.width))
                .min(i64::from(src_w));
            if lo < hi {
                let dst_lo = (lo - self.rect.x) as usize;
                let len = ((hi - lo) as usize).min(row.width().saturating_sub(dst_lo));
                if len > 0 {
                    let src = self.scratch.view(lo as usize, lo as usize + len);
                    row.slice(dst_lo, dst_lo + len).copy_from(src);
                }
            }
        }
        self.next_row += 1;
        Ok(1)
    }
}

impl Source for Resizer {
    fn encoding(&self) -> PixelEncoding {
        self.source.encoding()
    }

    fn size(&self) -> (u32, u32) {
        (self.rect.width, self.rect.height)
    }

    fn read_row(&mut self, row: &mut PixelRow) -> Result<u32, StreamError> {
        self.error.check()?;
        if self.closed || self.next_row >= self.rect.height {
            return Ok(0);
        }
        let result = self.produce(row);
        self.error.track(result)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.source.close();
        }
    }
}
