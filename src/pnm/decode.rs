//! PNM decoder: P5, P6, P7.

use std::io::{BufRead, Read};

use rgb::{AsPixels as _, Rgba};
use tracing::debug;

use super::{PnmFormat, PnmHeader};
use crate::error::StreamError;
use crate::limits::Limits;
use crate::pixel::PixelEncoding;
use crate::row::{PixelRow, RowSlice};
use crate::stream::{Source, StickyError};

/// Longest header token or P7 header line accepted.
const MAX_HEADER_LINE: u64 = 256;

/// Row buffer budget of a [`PnmSource`] whose limits set no memory cap.
pub const DEFAULT_MAX_ROW_BYTES: u64 = 256 * 1024 * 1024;

fn next_byte<R: BufRead>(reader: &mut R) -> Result<Option<u8>, StreamError> {
    let buf = reader.fill_buf()?;
    let Some(&b) = buf.first() else {
        return Ok(None);
    };
    reader.consume(1);
    Ok(Some(b))
}

/// Skip whitespace and `#` comments, then read one decimal number. Consumes
/// exactly one whitespace byte after the number.
fn read_number<R: BufRead>(reader: &mut R, what: &str) -> Result<u32, StreamError> {
    let mut b = loop {
        match next_byte(reader)? {
            None => return Err(StreamError::UnexpectedEnd),
            Some(b'#') => {
                let mut comment = Vec::new();
                reader
                    .by_ref()
                    .take(MAX_HEADER_LINE)
                    .read_until(b'\n', &mut comment)?;
            }
            Some(b) if b.is_ascii_whitespace() => {}
            Some(b) => break b,
        }
    };
    let mut value: u32 = 0;
    let mut digits = 0;
    loop {
        if !b.is_ascii_digit() {
            return Err(StreamError::InvalidHeader(format!(
                "unexpected byte 0x{b:02x} in {what}"
            )));
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u32::from(b - b'0')))
            .ok_or_else(|| StreamError::InvalidHeader(format!("{what} too large")))?;
        digits += 1;
        match next_byte(reader)? {
            None => return Err(StreamError::UnexpectedEnd),
            Some(n) if n.is_ascii_whitespace() => break,
            Some(n) if digits >= 10 => {
                return Err(StreamError::InvalidHeader(format!(
                    "{what} too long (next byte 0x{n:02x})"
                )));
            }
            Some(n) => b = n,
        }
    }
    Ok(value)
}

fn parse_pam_header<R: BufRead>(reader: &mut R) -> Result<PnmHeader, StreamError> {
    let mut width = None;
    let mut height = None;
    let mut depth = None;
    let mut maxval = None;
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = reader
            .by_ref()
            .take(MAX_HEADER_LINE)
            .read_until(b'\n', &mut line)?;
        if n == 0 {
            return Err(StreamError::UnexpectedEnd);
        }
        if line.last() != Some(&b'\n') && n as u64 == MAX_HEADER_LINE {
            return Err(StreamError::InvalidHeader("PAM header line too long".into()));
        }
        let text = core::str::from_utf8(&line)
            .map_err(|_| StreamError::InvalidHeader("non-ASCII PAM header".into()))?
            .trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let (key, value) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        let value = value.trim();
        let number = || {
            value
                .parse::<u32>()
                .map_err(|_| StreamError::InvalidHeader(format!("invalid {key} value {value:?}")))
        };
        match key {
            "WIDTH" => width = Some(number()?),
            "HEIGHT" => height = Some(number()?),
            "DEPTH" => depth = Some(number()?),
            "MAXVAL" => maxval = Some(number()?),
            // The depth alone decides the channel layout.
            "TUPLTYPE" => {}
            "ENDHDR" => break,
            other => {
                return Err(StreamError::InvalidHeader(format!("unknown PAM field {other:?}")));
            }
        }
    }

    let missing = |field: &str| StreamError::InvalidHeader(format!("PAM header missing {field}"));
    Ok(PnmHeader {
        format: PnmFormat::Pam,
        width: width.ok_or_else(|| missing("WIDTH"))?,
        height: height.ok_or_else(|| missing("HEIGHT"))?,
        depth: depth.ok_or_else(|| missing("DEPTH"))?,
        maxval: maxval.ok_or_else(|| missing("MAXVAL"))?,
    })
}

/// Parse a PNM header, leaving `reader` at the first byte of pixel data.
pub(crate) fn parse_header<R: BufRead>(reader: &mut R) -> Result<PnmHeader, StreamError> {
    let mut magic = [0u8; 3];
    reader.read_exact(&mut magic)?;
    if magic[0] != b'P' || !magic[2].is_ascii_whitespace() {
        return Err(StreamError::UnrecognizedFormat);
    }

    let header = match magic[1] {
        b'5' | b'6' => {
            let width = read_number(reader, "width")?;
            let height = read_number(reader, "height")?;
            let maxval = read_number(reader, "maxval")?;
            let (format, depth) = if magic[1] == b'5' {
                (PnmFormat::Pgm, 1)
            } else {
                (PnmFormat::Ppm, 3)
            };
            PnmHeader {
                format,
                width,
                height,
                depth,
                maxval,
            }
        }
        b'7' => parse_pam_header(reader)?,
        _ => return Err(StreamError::UnrecognizedFormat),
    };

    if header.width == 0 || header.height == 0 {
        return Err(StreamError::InvalidDimensions {
            width: header.width,
            height: header.height,
        });
    }
    if header.maxval == 0 || header.maxval > 65535 {
        return Err(StreamError::InvalidHeader(format!(
            "maxval {} out of range 1..=65535",
            header.maxval
        )));
    }
    if !(1..=4).contains(&header.depth) {
        return Err(StreamError::UnsupportedEncoding(format!(
            "PAM depth {}",
            header.depth
        )));
    }
    Ok(header)
}

/// Rescale a sample in `0..=maxval` to `0..=full`.
#[inline]
fn rescale(sample: u32, maxval: u32, full: u32) -> u32 {
    if maxval == full {
        return sample.min(full);
    }
    (sample.min(maxval) * full + maxval / 2) / maxval
}

/// A [`Source`] decoding a binary PNM stream.
///
/// 8-bit files decode to [`PixelEncoding::Gray8`] or
/// [`PixelEncoding::Rgba32`], 16-bit files to `Gray16` or `Rgba64`. Files
/// whose maxval is below the full range of their sample size are rescaled.
/// Closing does not close the reader; [`into_inner`](Self::into_inner) gives
/// it back.
#[derive(Debug)]
pub struct PnmSource<R> {
    reader: R,
    header: PnmHeader,
    raw: Vec<u8>,
    native: PixelRow,
    next_row: u32,
    error: StickyError,
    closed: bool,
}

impl<R: BufRead + Send> PnmSource<R> {
    /// Parse the header. Row buffers are capped at [`DEFAULT_MAX_ROW_BYTES`].
    pub fn new(reader: R) -> Result<Self, StreamError> {
        Self::with_limits(reader, None)
    }

    /// Parse the header and check it against `limits` before allocating.
    ///
    /// The header alone decides how much a row costs, so a missing
    /// `max_memory_bytes` falls back to [`DEFAULT_MAX_ROW_BYTES`].
    pub fn with_limits(mut reader: R, limits: Option<&Limits>) -> Result<Self, StreamError> {
        let header = parse_header(&mut reader)?;
        let row_bytes = header.row_bytes()?;
        let encoding = header.encoding();
        let native_bytes = (header.width as usize).saturating_mul(encoding.bytes_per_pixel());
        if let Some(limits) = limits {
            limits.check(header.width, header.height)?;
        }
        let row_limits = Limits {
            max_memory_bytes: Some(
                limits
                    .and_then(|l| l.max_memory_bytes)
                    .unwrap_or(DEFAULT_MAX_ROW_BYTES),
            ),
            ..Limits::default()
        };
        row_limits.check_memory(row_bytes.saturating_add(native_bytes))?;
        let mut raw = Vec::new();
        raw.try_reserve_exact(row_bytes).map_err(|e| {
            StreamError::LimitExceeded(format!("PNM row buffer of {row_bytes} bytes: {e}"))
        })?;
        raw.resize(row_bytes, 0);
        debug!(
            format = ?header.format,
            width = header.width,
            height = header.height,
            depth = header.depth,
            maxval = header.maxval,
            "pnm: header parsed"
        );
        Ok(Self {
            reader,
            raw,
            native: PixelRow::new(encoding, header.width as usize),
            header,
            next_row: 0,
            error: StickyError::default(),
            closed: false,
        })
    }

    pub fn header(&self) -> &PnmHeader {
        &self.header
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Unpack `self.raw` into `self.native`.
    fn unpack(&mut self) {
        let maxval = self.header.maxval;
        let depth = self.header.depth as usize;
        let raw = &self.raw;
        match self.native.as_slice_mut() {
            RowSlice::Gray8(dst) => {
                if maxval == 255 {
                    dst.copy_from_slice(raw);
                } else {
                    for (d, &s) in dst.iter_mut().zip(raw) {
                        *d = rescale(u32::from(s), maxval, 255) as u8;
                    }
                }
            }
            RowSlice::Gray16(dst) => {
                for (d, s) in dst.iter_mut().zip(raw.chunks_exact(2)) {
                    let v = u32::from(u16::from_be_bytes([s[0], s[1]]));
                    *d = rescale(v, maxval, 65535) as u16;
                }
            }
            RowSlice::Rgba32(dst) if depth == 4 && maxval == 255 => {
                let pixels: &[Rgba<u8>] = raw.as_pixels();
                dst.copy_from_slice(pixels);
            }
            RowSlice::Rgba32(dst) => {
                for (d, s) in dst.iter_mut().zip(raw.chunks_exact(depth)) {
                    let c = |i: usize| rescale(u32::from(s[i]), maxval, 255) as u8;
                    *d = expand(depth, c, u8::MAX);
                }
            }
            RowSlice::Rgba64(dst) => {
                for (d, s) in dst.iter_mut().zip(raw.chunks_exact(depth * 2)) {
                    let c = |i: usize| {
                        let v = u16::from_be_bytes([s[2 * i], s[2 * i + 1]]);
                        rescale(u32::from(v), maxval, 65535) as u16
                    };
                    *d = expand(depth, c, u16::MAX);
                }
            }
            // Headers only map to integer encodings.
            RowSlice::GrayF32(_) | RowSlice::RgbaF32(_) => {}
        }
    }

    fn decode_row(&mut self, row: &mut PixelRow) -> Result<u32, StreamError> {
        self.reader.read_exact(&mut self.raw)?;
        self.unpack();
        row.copy_from(&self.native);
        self.next_row += 1;
        Ok(1)
    }
}

/// Build an RGBA pixel from `depth` samples: gray, gray+alpha, RGB or RGBA.
#[inline]
fn expand<T: Copy>(depth: usize, c: impl Fn(usize) -> T, opaque: T) -> Rgba<T> {
    match depth {
        1 => Rgba {
            r: c(0),
            g: c(0),
            b: c(0),
            a: opaque,
        },
        2 => Rgba {
            r: c(0),
            g: c(0),
            b: c(0),
            a: c(1),
        },
        3 => Rgba {
            r: c(0),
            g: c(1),
            b: c(2),
            a: opaque,
        },
        _ => Rgba {
            r: c(0),
            g: c(1),
            b: c(2),
            a: c(3),
        },
    }
}

impl<R: BufRead + Send> Source for PnmSource<R> {
    fn encoding(&self) -> PixelEncoding {
        self.native.encoding()
    }

    fn size(&self) -> (u32, u32) {
        (self.header.width, self.header.height)
    }

    fn read_row(&mut self, row: &mut PixelRow) -> Result<u32, StreamError> {
        self.error.check()?;
        if self.closed || self.next_row >= self.header.height {
            return Ok(0);
        }
        let result = self.decode_row(row);
        self.error.track(result)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
