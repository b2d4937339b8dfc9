//! Streaming PNM family codec: P5 (PGM), P6 (PPM), P7 (PAM).
//!
//! [`PnmSource`] decodes one row per [`read_row`](crate::Source::read_row)
//! call from any [`BufRead`](std::io::BufRead); [`PnmSink`] encodes one row per
//! [`write_row`](crate::Sink::write_row) into any [`Write`](std::io::Write).
//! Neither holds more than a row of pixel data.

mod decode;
mod encode;

pub use decode::{DEFAULT_MAX_ROW_BYTES, PnmSource};
pub use encode::PnmSink;

use crate::error::StreamError;
use crate::pixel::PixelEncoding;

/// Which PNM sub-format to use.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PnmFormat {
    /// P5: binary grayscale (PGM).
    Pgm,
    /// P6: binary RGB (PPM).
    Ppm,
    /// P7: PAM (1 to 4 channels, with TUPLTYPE header).
    Pam,
}

/// Parsed PNM header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PnmHeader {
    pub format: PnmFormat,
    pub width: u32,
    pub height: u32,
    /// Samples per pixel: 1 gray, 2 gray+alpha, 3 RGB, 4 RGBA.
    pub depth: u32,
    /// Largest sample value, 1..=65535. Above 255, samples are 16-bit big-endian.
    pub maxval: u32,
}

impl PnmHeader {
    /// The encoding rows are decoded to.
    pub fn encoding(&self) -> PixelEncoding {
        match (self.depth, self.maxval > 255) {
            (1, false) => PixelEncoding::Gray8,
            (1, true) => PixelEncoding::Gray16,
            (_, false) => PixelEncoding::Rgba32,
            (_, true) => PixelEncoding::Rgba64,
        }
    }

    pub(crate) fn bytes_per_sample(&self) -> usize {
        if self.maxval > 255 { 2 } else { 1 }
    }

    /// Bytes of one encoded row.
    pub(crate) fn row_bytes(&self) -> Result<usize, StreamError> {
        (self.width as usize)
            .checked_mul(self.depth as usize)
            .and_then(|n| n.checked_mul(self.bytes_per_sample()))
            .ok_or_else(|| {
                StreamError::LimitExceeded(format!(
                    "PNM row of {} x {} samples does not fit in memory",
                    self.width, self.depth
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemorySink, MemorySource};
    use crate::pixel::Color;
    use crate::row::PixelRow;
    use crate::stream::{Sink, Source, pump};
    use enough::Unstoppable;
    use rgb::Rgba;
    use std::io::Cursor;

    fn encode(rows: Vec<PixelRow>, format: PnmFormat) -> Vec<u8> {
        let mut src = MemorySource::new(rows).unwrap();
        let (w, h) = src.size();
        let mut sink = PnmSink::new(Vec::new(), format, src.encoding(), w, h).unwrap();
        pump(&mut src, &mut sink, &Unstoppable).unwrap();
        sink.finish().unwrap()
    }

    fn decode(bytes: &[u8]) -> Vec<PixelRow> {
        let mut src = PnmSource::new(Cursor::new(bytes)).unwrap();
        let (w, h) = src.size();
        let mut sink = MemorySink::new(src.encoding(), w, h);
        pump(&mut src, &mut sink, &Unstoppable).unwrap();
        sink.into_rows()
    }

    #[test]
    fn pgm_8bit_stream_round_trip() {
        let rows = vec![PixelRow::from(vec![0u8, 128, 255]), PixelRow::from(vec![1u8, 2, 3])];
        let bytes = encode(rows.clone(), PnmFormat::Pgm);
        assert!(bytes.starts_with(b"P5\n3 2\n255\n"));
        assert_eq!(decode(&bytes), rows);
    }

    #[test]
    fn pgm_16bit_stream_round_trip() {
        let rows = vec![PixelRow::from(vec![0u16, 1000, 65535])];
        let bytes = encode(rows.clone(), PnmFormat::Pgm);
        assert!(bytes.starts_with(b"P5\n3 1\n65535\n"));
        assert_eq!(decode(&bytes), rows);
    }

    #[test]
    fn pam_rgba_round_trip() {
        let px = |v: u8| Rgba {
            r: v,
            g: v / 2,
            b: 255 - v,
            a: v / 3,
        };
        let rows = vec![PixelRow::from(vec![px(10), px(200)]), PixelRow::from(vec![px(0), px(99)])];
        let bytes = encode(rows.clone(), PnmFormat::Pam);
        assert_eq!(decode(&bytes), rows);
    }

    #[test]
    fn ppm_drops_alpha() {
        let rows = vec![PixelRow::from(vec![Rgba::<u8> {
            r: 9,
            g: 8,
            b: 7,
            a: 0,
        }])];
        let bytes = encode(rows, PnmFormat::Ppm);
        assert_eq!(bytes, b"P6\n1 1\n255\n\x09\x08\x07".to_vec());
        let back = decode(&bytes);
        assert_eq!(
            back[0].get(0),
            Some(Color::Rgba32(Rgba {
                r: 9,
                g: 8,
                b: 7,
                a: 255
            }))
        );
    }

    #[test]
    fn sink_pads_missing_rows_with_white() {
        let mut sink = PnmSink::new(Vec::new(), PnmFormat::Pgm, PixelEncoding::Gray8, 2, 3).unwrap();
        sink.write_row(&PixelRow::from(vec![5u8, 6])).unwrap();
        let bytes = sink.finish().unwrap();
        assert_eq!(bytes, b"P5\n2 3\n255\n\x05\x06\xff\xff\xff\xff".to_vec());
    }

    #[test]
    fn sink_ignores_excess_rows() {
        let mut sink = PnmSink::new(Vec::new(), PnmFormat::Pgm, PixelEncoding::Gray8, 1, 1).unwrap();
        sink.write_row(&PixelRow::from(vec![1u8])).unwrap();
        sink.write_row(&PixelRow::from(vec![2u8])).unwrap();
        assert_eq!(sink.finish().unwrap(), b"P5\n1 1\n255\n\x01".to_vec());
    }

    #[test]
    fn header_reports_encoding() {
        let h = PnmHeader {
            format: PnmFormat::Pam,
            width: 1,
            height: 1,
            depth: 2,
            maxval: 4095,
        };
        assert_eq!(h.encoding(), PixelEncoding::Rgba64);
        assert_eq!(h.row_bytes().unwrap(), 4);
    }
}
