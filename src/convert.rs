//! Re-declare a stream in another pixel encoding.

use tracing::trace;

use crate::error::StreamError;
use crate::pixel::PixelEncoding;
use crate::row::PixelRow;
use crate::stream::{Source, StickyError};

/// Wrap `source` so it declares `encoding`.
///
/// Returns `source` itself when it already produces `encoding`.
pub fn convert(source: Box<dyn Source>, encoding: PixelEncoding) -> Box<dyn Source> {
    if source.encoding() == encoding {
        trace!(?encoding, "convert: encoding matches, passing through");
        return source;
    }
    Box::new(Converter::new(source, encoding))
}

/// A [`Source`] converting every row of its upstream to a fixed encoding.
///
/// Useful in front of a sink that only accepts some encodings, for example a
/// grayscale encoder fed by a color decoder.
pub struct Converter {
    source: Box<dyn Source>,
    encoding: PixelEncoding,
    scratch: PixelRow,
    error: StickyError,
    closed: bool,
}

impl Converter {
    pub fn new(source: Box<dyn Source>, encoding: PixelEncoding) -> Self {
        Self {
            scratch: source.new_row(),
            source,
            encoding,
            error: StickyError::default(),
            closed: false,
        }
    }
}

impl Source for Converter {
    fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    fn size(&self) -> (u32, u32) {
        self.source.size()
    }

    fn read_row(&mut self, row: &mut PixelRow) -> Result<u32, StreamError> {
        self.error.check()?;
        if self.closed {
            return Ok(0);
        }
        let result = self.source.read_row(&mut self.scratch);
        if let Ok(1) = result {
            row.copy_from(&self.scratch);
        }
        self.error.track(result)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.source.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::loopback;
    use crate::memory::MemorySource;
    use crate::stream::Sink;
    use crate::pixel::Color;
    use rgb::Rgba;

    #[test]
    fn same_encoding_passes_through() {
        let src = Box::new(MemorySource::new(vec![PixelRow::from(vec![3u8])]).unwrap());
        let out = convert(src, PixelEncoding::Gray8);
        assert_eq!(out.encoding(), PixelEncoding::Gray8);
    }

    #[test]
    fn color_to_gray_uses_luminance() {
        let px = Rgba::<u8> {
            r: 255,
            g: 0,
            b: 0,
            a: 255,
        };
        let src = Box::new(MemorySource::new(vec![PixelRow::from(vec![px, px])]).unwrap());
        let mut out = convert(src, PixelEncoding::Gray8);
        let mut row = out.new_row();
        assert_eq!(row.encoding(), PixelEncoding::Gray8);
        assert_eq!(out.read_row(&mut row).unwrap(), 1);
        assert_eq!(row.get(1), Some(Color::Gray8(76)));
        assert_eq!(out.read_row(&mut row).unwrap(), 0);
    }

    #[test]
    fn truncated_upstream_stays_failed() {
        let (mut writer, reader) = loopback(1, 3, PixelEncoding::Gray8, 4);
        writer.write_row(&PixelRow::from(vec![9u8])).unwrap();
        writer.close().unwrap();

        let mut out = convert(Box::new(reader), PixelEncoding::Gray16);
        let mut row = out.new_row();
        assert_eq!(out.read_row(&mut row).unwrap(), 1);
        assert_eq!(row.get(0), Some(Color::Gray16(9 * 257)));
        assert!(matches!(out.read_row(&mut row), Err(StreamError::UnexpectedEnd)));
        // The loopback itself reports end of stream now; the converter must not.
        assert!(matches!(out.read_row(&mut row), Err(StreamError::UnexpectedEnd)));
        assert!(matches!(out.read_row(&mut row), Err(StreamError::UnexpectedEnd)));
    }
}
