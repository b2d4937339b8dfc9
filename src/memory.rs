//! In-memory stream endpoints.

use crate::error::StreamError;
use crate::pixel::PixelEncoding;
use crate::row::PixelRow;
use crate::stream::{Sink, Source, StickyError};

/// A [`Source`] serving rows held in memory.
#[derive(Debug)]
pub struct MemorySource {
    rows: Vec<PixelRow>,
    encoding: PixelEncoding,
    width: u32,
    next: usize,
    fail_after: Option<usize>,
    error: StickyError,
    closed: bool,
}

impl MemorySource {
    /// Serve `rows` top to bottom. All rows must share width and encoding.
    pub fn new(rows: Vec<PixelRow>) -> Result<Self, StreamError> {
        let Some(first) = rows.first() else {
            return Err(StreamError::InvalidDimensions { width: 0, height: 0 });
        };
        let encoding = first.encoding();
        let width = first.width();
        if let Some(odd) = rows
            .iter()
            .find(|r| r.encoding() != encoding || r.width() != width)
        {
            return Err(StreamError::InvalidData(format!(
                "row of {} {:?} pixels in a stream of {width} {encoding:?} pixels",
                odd.width(),
                odd.encoding()
            )));
        }
        if width == 0 {
            return Err(StreamError::InvalidDimensions {
                width: 0,
                height: rows.len() as u32,
            });
        }
        Ok(Self {
            rows,
            encoding,
            width: width as u32,
            next: 0,
            fail_after: None,
            error: StickyError::default(),
            closed: false,
        })
    }

    /// Build a source from a 2-D buffer, storing pixels as `encoding`.
    #[cfg(feature = "imgref")]
    pub fn from_img<P>(img: imgref::ImgRef<'_, P>, encoding: PixelEncoding) -> Result<Self, StreamError>
    where
        P: Copy + Into<crate::pixel::Color>,
    {
        let rows = img
            .rows()
            .map(|pixels| {
                let mut row = PixelRow::new(encoding, pixels.len());
                for (x, &p) in pixels.iter().enumerate() {
                    row.set(x, p.into());
                }
                row
            })
            .collect();
        Self::new(rows)
    }

    /// Report an I/O error instead of row `n` and every row after it.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Whether [`Source::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Rows handed out so far.
    pub fn rows_read(&self) -> usize {
        self.next
    }
}

impl Source for MemorySource {
    fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.rows.len() as u32)
    }

    fn read_row(&mut self, row: &mut PixelRow) -> Result<u32, StreamError> {
        self.error.check()?;
        if self.closed {
            return Ok(0);
        }
        if self.fail_after.is_some_and(|n| self.next >= n) {
            let e = std::io::Error::other("injected read failure");
            return self.error.track(Err(e.into()));
        }
        let Some(src) = self.rows.get(self.next) else {
            return Ok(0);
        };
        row.copy_from(src);
        self.next += 1;
        Ok(1)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// A [`Sink`] collecting rows in memory.
///
/// Like a file codec, it pads missing trailing rows with white on close.
#[derive(Debug)]
pub struct MemorySink {
    rows: Vec<PixelRow>,
    encoding: PixelEncoding,
    width: u32,
    height: u32,
    closed: bool,
}

impl MemorySink {
    pub fn new(encoding: PixelEncoding, width: u32, height: u32) -> Self {
        Self {
            rows: Vec::with_capacity(height as usize),
            encoding,
            width,
            height,
            closed: false,
        }
    }

    pub fn rows(&self) -> &[PixelRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<PixelRow> {
        self.rows
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Collected rows as an 8-bit RGBA buffer.
    #[cfg(feature = "imgref")]
    pub fn to_rgba8_img(&self) -> imgref::ImgVec<rgb::Rgba<u8>> {
        let buf = self
            .rows
            .iter()
            .flat_map(|row| (0..row.width()).filter_map(|x| row.get(x)))
            .map(|c| c.to_rgba32())
            .collect();
        imgref::ImgVec::new(buf, self.width as usize, self.rows.len())
    }

    /// Collected rows as an 8-bit grayscale buffer.
    #[cfg(feature = "imgref")]
    pub fn to_gray8_img(&self) -> imgref::ImgVec<u8> {
        let buf = self
            .rows
            .iter()
            .flat_map(|row| (0..row.width()).filter_map(|x| row.get(x)))
            .map(|c| c.to_gray8())
            .collect();
        imgref::ImgVec::new(buf, self.width as usize, self.rows.len())
    }
}

impl Sink for MemorySink {
    fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn write_row(&mut self, row: &PixelRow) -> Result<(), StreamError> {
        if self.closed || self.rows.len() >= self.height as usize {
            return Ok(());
        }
        let mut stored = self.new_row();
        stored.copy_from(row);
        self.rows.push(stored);
        Ok(())
    }

    fn close(&mut self) -> Result<(), StreamError> {
        if self.closed {
            return Ok(());
        }
        let white = PixelRow::filled(self.encoding, self.width as usize, self.encoding.white());
        self.rows.resize(self.height as usize, white);
        self.closed = true;
        Ok(())
    }
}
