//! Pull/push row stream contract shared by codecs and filters.
//!
//! ```text
//!  codec ──► Source ──► Scaler ──► Resizer ──► ... ──► pump ──► Sink (codec)
//!            (pull)     (Source wrapping Source)               (push)
//! ```
//!
//! # Rules every implementation follows
//!
//! - **Sequential.** `read_row` produces rows top to bottom and never rewinds.
//! - **Sticky errors.** Once `read_row`/`write_row` fails, every later call on
//!   the same object returns the same error. [`StickyError`] does the
//!   bookkeeping.
//! - **Stacking.** A filter owns its upstream `Box<dyn Source>`; closing the
//!   filter closes the upstream. Closing a terminal codec does not close the
//!   reader or writer it was built on. `close` is idempotent.
//! - **Tolerant bounds.** Reading past the declared height returns `Ok(0)`
//!   (end of stream). Writing past it is ignored.

use enough::Stop;

use crate::error::StreamError;
use crate::pixel::PixelEncoding;
use crate::row::PixelRow;

/// Pull side of the stream contract.
pub trait Source: Send {
    /// Encoding of the rows this source produces natively.
    fn encoding(&self) -> PixelEncoding;

    /// `(width, height)` in pixels, fixed for the life of the stream.
    fn size(&self) -> (u32, u32);

    /// Allocate a row matching this source's encoding and width.
    fn new_row(&self) -> PixelRow {
        PixelRow::new(self.encoding(), self.size().0 as usize)
    }

    /// Fill `row` with the next scanline, converted to the row's encoding.
    ///
    /// Returns the number of rows produced: 1, or 0 at end of stream.
    fn read_row(&mut self, row: &mut PixelRow) -> Result<u32, StreamError>;

    /// Release the source and everything it wraps. Idempotent.
    fn close(&mut self);
}

/// Push side of the stream contract.
pub trait Sink: Send {
    /// Encoding the sink stores rows in.
    fn encoding(&self) -> PixelEncoding;

    /// `(width, height)` in pixels, fixed for the life of the stream.
    fn size(&self) -> (u32, u32);

    /// Allocate a row matching this sink's encoding and width.
    fn new_row(&self) -> PixelRow {
        PixelRow::new(self.encoding(), self.size().0 as usize)
    }

    /// Accept the next scanline. Rows past the declared height are ignored.
    fn write_row(&mut self, row: &PixelRow) -> Result<(), StreamError>;

    /// Flush and finalize. Idempotent.
    fn close(&mut self) -> Result<(), StreamError>;
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn encoding(&self) -> PixelEncoding {
        (**self).encoding()
    }

    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn new_row(&self) -> PixelRow {
        (**self).new_row()
    }

    fn read_row(&mut self, row: &mut PixelRow) -> Result<u32, StreamError> {
        (**self).read_row(row)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn encoding(&self) -> PixelEncoding {
        (**self).encoding()
    }

    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn new_row(&self) -> PixelRow {
        (**self).new_row()
    }

    fn write_row(&mut self, row: &PixelRow) -> Result<(), StreamError> {
        (**self).write_row(row)
    }

    fn close(&mut self) -> Result<(), StreamError> {
        (**self).close()
    }
}

/// Remembers the first failure of a stream and replays it.
///
/// ```
/// use zenstream::{StickyError, StreamError};
///
/// let mut sticky = StickyError::default();
/// assert!(sticky.check().is_ok());
/// let _ = sticky.track::<u32>(Err(StreamError::UnexpectedEnd));
/// assert!(matches!(sticky.check(), Err(StreamError::UnexpectedEnd)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct StickyError(Option<StreamError>);

impl StickyError {
    /// `Err` with the recorded error, if any.
    pub fn check(&self) -> Result<(), StreamError> {
        match &self.0 {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Record the error of `result` (first one wins) and pass it through.
    pub fn track<T>(&mut self, result: Result<T, StreamError>) -> Result<T, StreamError> {
        if let Err(e) = &result {
            self.set(e.clone());
        }
        result
    }

    /// Record `error` unless an earlier one is already recorded.
    pub fn set(&mut self, error: StreamError) {
        if self.0.is_none() {
            self.0 = Some(error);
        }
    }

    pub fn get(&self) -> Option<&StreamError> {
        self.0.as_ref()
    }
}

/// Copy every row of `source` into `sink`, returning the number of rows copied.
///
/// Neither end is closed; the caller decides when to finalize. `stop` is
/// checked every 16 rows.
pub fn pump(source: &mut dyn Source, sink: &mut dyn Sink, stop: &dyn Stop) -> Result<u32, StreamError> {
    let mut row = source.new_row();
    let mut rows = 0u32;
    loop {
        if rows % 16 == 0 {
            stop.check()?;
        }
        if source.read_row(&mut row)? == 0 {
            break;
        }
        sink.write_row(&row)?;
        rows += 1;
    }
    Ok(rows)
}
