//! PNM encoder: P5, P6, P7.

use std::io::Write;

use rgb::ComponentBytes as _;
use tracing::{debug, trace};

use super::PnmFormat;
use crate::error::StreamError;
use crate::limits::check_dimensions;
use crate::pixel::PixelEncoding;
use crate::row::{PixelRow, RowView};
use crate::stream::{Sink, StickyError};

/// A [`Sink`] encoding rows as binary PNM.
///
/// Accepted encodings: PGM takes `Gray8`/`Gray16`, PPM takes
/// `Rgba32`/`Rgba64` (alpha is dropped), PAM takes all four. 16-bit encodings
/// are written with maxval 65535, big-endian. The header is written on
/// construction. [`close`](Sink::close) pads missing rows with white and
/// flushes, but does not close the writer; [`finish`](Self::finish) closes and
/// hands it back.
pub struct PnmSink<W: Write + Send> {
    writer: W,
    format: PnmFormat,
    encoding: PixelEncoding,
    width: u32,
    height: u32,
    scratch: PixelRow,
    buf: Vec<u8>,
    written: u32,
    error: StickyError,
    closed: bool,
}

fn header_bytes(format: PnmFormat, encoding: PixelEncoding, width: u32, height: u32) -> Vec<u8> {
    let maxval = if encoding.bytes_per_pixel() / encoding.channels() == 2 {
        65535
    } else {
        255
    };
    let header = match format {
        PnmFormat::Pgm => format!("P5\n{width} {height}\n{maxval}\n"),
        PnmFormat::Ppm => format!("P6\n{width} {height}\n{maxval}\n"),
        PnmFormat::Pam => {
            let (depth, tupltype) = if encoding.is_gray() {
                (1, "GRAYSCALE")
            } else {
                (4, "RGB_ALPHA")
            };
            format!(
                "P7\nWIDTH {width}\nHEIGHT {height}\nDEPTH {depth}\nMAXVAL {maxval}\nTUPLTYPE {tupltype}\nENDHDR\n"
            )
        }
    };
    header.into_bytes()
}

impl<W: Write + Send> PnmSink<W> {
    pub fn new(
        mut writer: W,
        format: PnmFormat,
        encoding: PixelEncoding,
        width: u32,
        height: u32,
    ) -> Result<Self, StreamError> {
        check_dimensions(width, height)?;
        let accepted = match format {
            PnmFormat::Pgm => matches!(encoding, PixelEncoding::Gray8 | PixelEncoding::Gray16),
            PnmFormat::Ppm => matches!(encoding, PixelEncoding::Rgba32 | PixelEncoding::Rgba64),
            PnmFormat::Pam => !encoding.is_float(),
        };
        if !accepted {
            return Err(StreamError::UnsupportedEncoding(format!(
                "cannot encode {encoding:?} as {format:?}"
            )));
        }
        writer.write_all(&header_bytes(format, encoding, width, height))?;
        debug!(?format, ?encoding, width, height, "pnm: header written");
        Ok(Self {
            writer,
            format,
            encoding,
            width,
            height,
            scratch: PixelRow::new(encoding, width as usize),
            buf: Vec::new(),
            written: 0,
            error: StickyError::default(),
            closed: false,
        })
    }

    /// Rows encoded so far, padding included.
    pub fn rows_written(&self) -> u32 {
        self.written
    }

    /// Close and return the writer.
    pub fn finish(mut self) -> Result<W, StreamError> {
        self.close()?;
        Ok(self.writer)
    }

    /// Serialize `view` into `buf` in file sample order.
    fn pack(buf: &mut Vec<u8>, view: RowView<'_>, format: PnmFormat) {
        buf.clear();
        match view {
            RowView::Gray8(px) => buf.extend_from_slice(px),
            RowView::Gray16(px) => {
                for v in px {
                    buf.extend_from_slice(&v.to_be_bytes());
                }
            }
            RowView::Rgba32(px) if format == PnmFormat::Pam => buf.extend_from_slice(px.as_bytes()),
            RowView::Rgba32(px) => {
                for p in px {
                    buf.extend_from_slice(&[p.r, p.g, p.b]);
                }
            }
            RowView::Rgba64(px) => {
                for p in px {
                    buf.extend_from_slice(&p.r.to_be_bytes());
                    buf.extend_from_slice(&p.g.to_be_bytes());
                    buf.extend_from_slice(&p.b.to_be_bytes());
                    if format == PnmFormat::Pam {
                        buf.extend_from_slice(&p.a.to_be_bytes());
                    }
                }
            }
            // Rejected at construction.
            RowView::GrayF32(_) | RowView::RgbaF32(_) => {}
        }
    }

    fn encode_row(&mut self, row: &PixelRow) -> Result<(), StreamError> {
        let view = if row.encoding() == self.encoding && row.width() == self.width as usize {
            row.as_view()
        } else {
            self.scratch.fill(self.encoding.white());
            self.scratch.copy_from(row);
            self.scratch.as_view()
        };
        Self::pack(&mut self.buf, view, self.format);
        self.writer.write_all(&self.buf)?;
        self.written += 1;
        Ok(())
    }
}

impl<W: Write + Send> Sink for PnmSink<W> {
    fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn write_row(&mut self, row: &PixelRow) -> Result<(), StreamError> {
        self.error.check()?;
        if self.closed || self.written >= self.height {
            return Ok(());
        }
        let result = self.encode_row(row);
        self.error.track(result)
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.error.check()?;
        if self.closed {
            return Ok(());
        }
        if self.written < self.height {
            trace!(written = self.written, height = self.height, "pnm: padding with white");
            let white = PixelRow::filled(self.encoding, self.width as usize, self.encoding.white());
            while self.written < self.height {
                let result = self.encode_row(&white);
                self.error.track(result)?;
            }
        }
        let result = self.writer.flush().map_err(StreamError::from);
        self.error.track(result)?;
        self.closed = true;
        Ok(())
    }
}
