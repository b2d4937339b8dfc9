//! # zenstream
//!
//! Bounded-memory streaming raster pipeline for scan and print workflows.
//!
//! Images move through the pipeline one row at a time. A decoder exposes
//! itself as a [`Source`], filters wrap sources in further sources, and an
//! encoder consumes the result as a [`Sink`]. No stage holds more than a few
//! rows, so a 600 dpi A3 scan costs about as much memory as a thumbnail.
//!
//! ## Filters
//!
//! - [`Scaler`] / [`scale`]: area-weighted downscaling and linear upscaling
//!   with a row history sized from the resampling weights.
//! - [`Resizer`] / [`resize`]: crop and pad to any rectangle, white outside
//!   the source.
//! - [`Converter`] / [`convert`]: re-declare a stream in another encoding.
//! - [`Transformer`]: run a random-access algorithm (flip, rotate, filter)
//!   on a worker thread over windowed views of the input and output.
//!
//! All filters pass the source through untouched when there is nothing to do.
//!
//! ## Plumbing
//!
//! - [`loopback`]: bounded cross-thread row queue with a sink and a source end.
//! - [`WindowedSource`] / [`TargetAdapter`]: random access over a window of
//!   the most recent rows.
//! - [`MemorySource`] / [`MemorySink`]: in-memory endpoints.
//! - [`pump`]: drain a source into a sink.
//!
//! ## Codecs
//!
//! The `pnm` feature (on by default) provides a streaming P5/P6/P7 codec in
//! [`pnm`]. Other formats plug in by implementing [`Source`] and [`Sink`].
//!
//! ## Usage
//!
//! ```
//! use std::io::Cursor;
//! use zenstream::pnm::{PnmFormat, PnmSink, PnmSource};
//! use zenstream::{Rect, Sink, Source, Unstoppable, pump, resize, scale};
//!
//! let input = b"P5\n4 2\n255\n\x00\x40\x80\xc0\xff\xff\xff\xff";
//! let source: Box<dyn Source> = Box::new(PnmSource::new(Cursor::new(&input[..]))?);
//!
//! // Halve, then pad to 4x2 with white.
//! let half = scale(source, 2, 1)?;
//! let mut padded = resize(half, Rect::new(-1, 0, 4, 2))?;
//!
//! let (w, h) = padded.size();
//! let mut sink = PnmSink::new(Vec::new(), PnmFormat::Pgm, padded.encoding(), w, h)?;
//! pump(&mut padded, &mut sink, &Unstoppable)?;
//! padded.close();
//! let encoded = sink.finish()?;
//! assert!(encoded.starts_with(b"P5\n4 2\n255\n"));
//! # Ok::<(), zenstream::StreamError>(())
//! ```

#![forbid(unsafe_code)]

mod adapter;
mod coefficients;
mod config;
mod convert;
mod error;
mod limits;
mod loopback;
mod memory;
mod pixel;
mod resizer;
mod row;
mod scaler;
mod stream;
mod transformer;

#[cfg(feature = "pnm")]
pub mod pnm;

// Re-exports
pub use adapter::{ImageView, ImageViewMut, TargetAdapter, WindowedSource};
pub use coefficients::{ScaleCoefficient, compute_coefficients, history_depth};
pub use config::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WINDOW_ROWS, StreamConfig};
pub use convert::{Converter, convert};
pub use enough::{Stop, Unstoppable};
pub use error::StreamError;
pub use limits::Limits;
pub use loopback::{LoopbackReader, LoopbackWriter, loopback};
pub use memory::{MemorySink, MemorySource};
pub use pixel::{Color, PixelEncoding};
pub use resizer::{Rect, Resizer, resize};
pub use row::{PixelRow, RowSlice, RowView};
pub use scaler::{Scaler, scale};
pub use stream::{Sink, Source, StickyError, pump};
pub use transformer::Transformer;
