//! Streaming area/linear scaler.
//!
//! Each source row is resampled horizontally as soon as it is read and kept in
//! a ring of `history_depth(vertical) + 1` destination-width rows. Output rows
//! are weighted sums over that ring, so memory stays proportional to the row
//! width regardless of image height.

use tracing::{debug, trace, warn};

use crate::coefficients::{ScaleCoefficient, compute_coefficients, history_depth};
use crate::error::StreamError;
use crate::limits::{Limits, check_dimensions};
use crate::pixel::PixelEncoding;
use crate::row::PixelRow;
use crate::stream::{Source, StickyError};

/// Wrap `source` so it produces `width` x `height` rows.
///
/// Returns `source` itself when it already has that size.
pub fn scale(source: Box<dyn Source>, width: u32, height: u32) -> Result<Box<dyn Source>, StreamError> {
    if source.size() == (width, height) {
        trace!(width, height, "scale: dimensions match, passing through");
        return Ok(source);
    }
    Ok(Box::new(Scaler::new(source, width, height, None)?))
}

/// A [`Source`] resampling its upstream to new dimensions.
pub struct Scaler {
    source: Box<dyn Source>,
    width: u32,
    height: u32,
    encoding: PixelEncoding,
    horizontal: Vec<ScaleCoefficient>,
    vertical: Vec<ScaleCoefficient>,
    next_coefficient: usize,
    next_row: u32,
    /// Source rows pulled so far.
    loaded: u32,
    /// Upstream row in the accumulation encoding.
    scratch: PixelRow,
    history: Vec<PixelRow>,
    acc: PixelRow,
    error: StickyError,
    closed: bool,
}

impl Scaler {
    /// Build a scaler over `source`. Zero dimensions (on either side) and
    /// `limits` violations are rejected before any row is read.
    pub fn new(
        source: Box<dyn Source>,
        width: u32,
        height: u32,
        limits: Option<&Limits>,
    ) -> Result<Self, StreamError> {
        check_dimensions(width, height)?;
        let (src_w, src_h) = source.size();
        check_dimensions(src_w, src_h)?;

        let encoding = source.encoding();
        let acc_encoding = encoding.accumulator();
        let horizontal = compute_coefficients(src_w, width);
        let vertical = compute_coefficients(src_h, height);
        let depth = history_depth(&vertical) + 1;

        if let Some(limits) = limits {
            limits.check(width, height)?;
            let row_bytes = |w: u32| w as usize * acc_encoding.bytes_per_pixel();
            limits.check_memory(row_bytes(src_w) + (depth + 1) * row_bytes(width))?;
        }

        debug!(
            src_w,
            src_h,
            width,
            height,
            ?encoding,
            history = depth,
            "scaler configured"
        );

        Ok(Self {
            source,
            width,
            height,
            encoding,
            horizontal,
            vertical,
            next_coefficient: 0,
            next_row: 0,
            loaded: 0,
            scratch: PixelRow::new(acc_encoding, src_w as usize),
            history: (0..depth)
                .map(|_| PixelRow::new(acc_encoding, width as usize))
                .collect(),
            acc: PixelRow::new(acc_encoding, width as usize),
            error: StickyError::default(),
            closed: false,
        })
    }

    /// Pull source rows until row `index` is in the history ring.
    fn load_through(&mut self, index: u32) -> Result<(), StreamError> {
        while self.loaded <= index {
            if self.source.read_row(&mut self.scratch)? == 0 {
                warn!(
                    loaded = self.loaded,
                    expected = self.source.size().1,
                    "scaler: upstream ended early"
                );
                return Err(StreamError::UnexpectedEnd);
            }
            let n = self.history.len();
            let slot = &mut self.history[self.loaded as usize % n];
            slot.fill(self.encoding.accumulator().transparent());
            slot.accumulate(&self.scratch, &self.horizontal);
            self.loaded += 1;
        }
        Ok(())
    }

    fn produce(&mut self, row: &mut PixelRow) -> Result<u32, StreamError> {
        let dest = self.next_row;
        self.acc.fill(self.encoding.accumulator().transparent());
        while let Some(c) = self.vertical.get(self.next_coefficient).copied() {
            if c.dest != dest {
                break;
            }
            self.load_through(c.source)?;
            let n = self.history.len();
            self.acc.add_scaled(&self.history[c.source as usize % n], c.weight);
            self.next_coefficient += 1;
        }
        row.copy_from(&self.acc);
        self.next_row += 1;
        Ok(1)
    }
}

impl Source for Scaler {
    fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_row(&mut self, row: &mut PixelRow) -> Result<u32, StreamError> {
        self.error.check()?;
        if self.closed || self.next_row >= self.height {
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
