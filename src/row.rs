//! Fixed-width scanline buffers and borrowed views into them.
//!
//! A [`PixelRow`] owns one scanline in one [`PixelEncoding`]. Its width never
//! changes. [`RowView`] and [`RowSlice`] borrow all or part of a row without
//! copying; writes through a `RowSlice` land in the parent row.
//!
//! Conversion is always done by the destination: [`RowSlice::set`] and
//! [`RowSlice::copy_from`] accept pixels of any encoding. Identical encodings
//! and the float accumulation import/export have dedicated loops; every other
//! pairing goes pixel by pixel through [`Color`].

use rgb::Rgba;

use crate::coefficients::ScaleCoefficient;
use crate::pixel::{Color, PixelEncoding};

#[derive(Clone, Debug, PartialEq)]
enum Pixels {
    Gray8(Vec<u8>),
    Gray16(Vec<u16>),
    Rgba32(Vec<Rgba<u8>>),
    Rgba64(Vec<Rgba<u16>>),
    GrayF32(Vec<f32>),
    RgbaF32(Vec<Rgba<f32>>),
}

/// Shared view of a row or a horizontal span of it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RowView<'a> {
    Gray8(&'a [u8]),
    Gray16(&'a [u16]),
    Rgba32(&'a [Rgba<u8>]),
    Rgba64(&'a [Rgba<u16>]),
    GrayF32(&'a [f32]),
    RgbaF32(&'a [Rgba<f32>]),
}

/// Mutable view of a row or a horizontal span of it.
#[derive(Debug, PartialEq)]
pub enum RowSlice<'a> {
    Gray8(&'a mut [u8]),
    Gray16(&'a mut [u16]),
    Rgba32(&'a mut [Rgba<u8>]),
    Rgba64(&'a mut [Rgba<u16>]),
    GrayF32(&'a mut [f32]),
    RgbaF32(&'a mut [Rgba<f32>]),
}

/// Apply `$body` to the buffer inside any variant and rewrap the result in the
/// same variant of `$to`.
macro_rules! map_pixels {
    ($value:expr, $from:ident => $to:ident, |$inner:ident| $body:expr) => {
        match $value {
            $from::Gray8($inner) => $to::Gray8($body),
            $from::Gray16($inner) => $to::Gray16($body),
            $from::Rgba32($inner) => $to::Rgba32($body),
            $from::Rgba64($inner) => $to::Rgba64($body),
            $from::GrayF32($inner) => $to::GrayF32($body),
            $from::RgbaF32($inner) => $to::RgbaF32($body),
        }
    };
}

/// Apply `$body` to the buffer inside any variant.
macro_rules! each_pixels {
    ($value:expr, $from:ident, |$inner:ident| $body:expr) => {
        match $value {
            $from::Gray8($inner) => $body,
            $from::Gray16($inner) => $body,
            $from::Rgba32($inner) => $body,
            $from::Rgba64($inner) => $body,
            $from::GrayF32($inner) => $body,
            $from::RgbaF32($inner) => $body,
        }
    };
}

/// One scanline of pixels in a fixed encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelRow {
    pixels: Pixels,
}

impl PixelRow {
    /// Allocate a row of `width` pixels set to the encoding's zero value.
    pub fn new(encoding: PixelEncoding, width: usize) -> Self {
        let pixels = match encoding {
            PixelEncoding::Gray8 => Pixels::Gray8(vec![0; width]),
            PixelEncoding::Gray16 => Pixels::Gray16(vec![0; width]),
            PixelEncoding::Rgba32 => Pixels::Rgba32(vec![Rgba { r: 0, g: 0, b: 0, a: 0 }; width]),
            PixelEncoding::Rgba64 => Pixels::Rgba64(vec![Rgba { r: 0, g: 0, b: 0, a: 0 }; width]),
            PixelEncoding::GrayF32 => Pixels::GrayF32(vec![0.0; width]),
            PixelEncoding::RgbaF32 => Pixels::RgbaF32(vec![
                Rgba {
                    r: 0.0,
                    g: 0.0,
                    b: 0.0,
                    a: 0.0
                };
                width
            ]),
        };
        Self { pixels }
    }

    /// Allocate a row filled with `color` (converted to `encoding`).
    pub fn filled(encoding: PixelEncoding, width: usize, color: Color) -> Self {
        let mut row = Self::new(encoding, width);
        row.fill(color);
        row
    }

    pub fn width(&self) -> usize {
        each_pixels!(&self.pixels, Pixels, |p| p.len())
    }

    pub fn encoding(&self) -> PixelEncoding {
        self.as_view().encoding()
    }

    /// Borrow the whole row.
    pub fn as_view(&self) -> RowView<'_> {
        map_pixels!(&self.pixels, Pixels => RowView, |p| p.as_slice())
    }

    /// Mutably borrow the whole row.
    pub fn as_slice_mut(&mut self) -> RowSlice<'_> {
        map_pixels!(&mut self.pixels, Pixels => RowSlice, |p| p.as_mut_slice())
    }

    /// Borrow pixels `lo..hi`.
    ///
    /// # Panics
    ///
    /// If `lo > hi` or `hi > width`, like slice indexing.
    pub fn view(&self, lo: usize, hi: usize) -> RowView<'_> {
        self.as_view().view(lo, hi)
    }

    /// Mutably borrow pixels `lo..hi`. Writes go to this row.
    ///
    /// # Panics
    ///
    /// If `lo > hi` or `hi > width`, like slice indexing.
    pub fn slice(&mut self, lo: usize, hi: usize) -> RowSlice<'_> {
        map_pixels!(&mut self.pixels, Pixels => RowSlice, |p| &mut p[lo..hi])
    }

    /// Pixel `x`, or `None` past the end of the row.
    pub fn get(&self, x: usize) -> Option<Color> {
        self.as_view().get(x)
    }

    /// Store `color` at `x`, converting it to the row's encoding.
    ///
    /// # Panics
    ///
    /// If `x >= width`.
    pub fn set(&mut self, x: usize, color: Color) {
        self.as_slice_mut().set(x, color);
    }

    pub fn fill(&mut self, color: Color) {
        self.as_slice_mut().fill(color);
    }

    /// Copy `min(self.width(), other.width())` pixels from `other`, converting
    /// as needed. Returns the number of pixels copied.
    pub fn copy_from(&mut self, other: &PixelRow) -> usize {
        self.as_slice_mut().copy_from(other.as_view())
    }

    /// `self[c.dest] += src[c.source] * c.weight` for every coefficient.
    ///
    /// Used by the scaler on accumulation rows.
    pub(crate) fn accumulate(&mut self, src: &PixelRow, coeffs: &[ScaleCoefficient]) {
        match (&mut self.pixels, &src.pixels) {
            (Pixels::GrayF32(d), Pixels::GrayF32(s)) => {
                for c in coeffs {
                    d[c.dest as usize] += s[c.source as usize] * c.weight;
                }
            }
            (Pixels::RgbaF32(d), Pixels::RgbaF32(s)) => {
                for c in coeffs {
                    mul_add(&mut d[c.dest as usize], s[c.source as usize], c.weight);
                }
            }
            _ => {
                for c in coeffs {
                    let (Some(acc), Some(px)) = (self.get(c.dest as usize), src.get(c.source as usize))
                    else {
                        continue;
                    };
                    let mut acc = acc.to_rgba_f32();
                    mul_add(&mut acc, px.to_rgba_f32(), c.weight);
                    self.set(c.dest as usize, Color::RgbaF32(acc));
                }
            }
        }
    }

    /// `self[x] += src[x] * weight` over the common width.
    pub(crate) fn add_scaled(&mut self, src: &PixelRow, weight: f32) {
        match (&mut self.pixels, &src.pixels) {
            (Pixels::GrayF32(d), Pixels::GrayF32(s)) => {
                for (d, s) in d.iter_mut().zip(s) {
                    *d += s * weight;
                }
            }
            (Pixels::RgbaF32(d), Pixels::RgbaF32(s)) => {
                for (d, s) in d.iter_mut().zip(s) {
                    mul_add(d, *s, weight);
                }
            }
            _ => {
                let n = self.width().min(src.width());
                for x in 0..n {
                    let (Some(acc), Some(px)) = (self.get(x), src.get(x)) else {
                        continue;
                    };
                    let mut acc = acc.to_rgba_f32();
                    mul_add(&mut acc, px.to_rgba_f32(), weight);
                    self.set(x, Color::RgbaF32(acc));
                }
            }
        }
    }
}

#[inline]
fn mul_add(acc: &mut Rgba<f32>, px: Rgba<f32>, weight: f32) {
    acc.r += px.r * weight;
    acc.g += px.g * weight;
    acc.b += px.b * weight;
    acc.a += px.a * weight;
}

impl From<Vec<u8>> for PixelRow {
    fn from(v: Vec<u8>) -> Self {
        Self { pixels: Pixels::Gray8(v) }
    }
}

impl From<Vec<u16>> for PixelRow {
    fn from(v: Vec<u16>) -> Self {
        Self { pixels: Pixels::Gray16(v) }
    }
}

impl From<Vec<Rgba<u8>>> for PixelRow {
    fn from(v: Vec<Rgba<u8>>) -> Self {
        Self { pixels: Pixels::Rgba32(v) }
    }
}

impl From<Vec<Rgba<u16>>> for PixelRow {
    fn from(v: Vec<Rgba<u16>>) -> Self {
        Self { pixels: Pixels::Rgba64(v) }
    }
}

impl From<Vec<f32>> for PixelRow {
    fn from(v: Vec<f32>) -> Self {
        Self { pixels: Pixels::GrayF32(v) }
    }
}

impl From<Vec<Rgba<f32>>> for PixelRow {
    fn from(v: Vec<Rgba<f32>>) -> Self {
        Self { pixels: Pixels::RgbaF32(v) }
    }
}

impl<'a> RowView<'a> {
    pub fn width(&self) -> usize {
        each_pixels!(self, RowView, |p| p.len())
    }

    pub fn encoding(&self) -> PixelEncoding {
        match self {
            RowView::Gray8(_) => PixelEncoding::Gray8,
            RowView::Gray16(_) => PixelEncoding::Gray16,
            RowView::Rgba32(_) => PixelEncoding::Rgba32,
            RowView::Rgba64(_) => PixelEncoding::Rgba64,
            RowView::GrayF32(_) => PixelEncoding::GrayF32,
            RowView::RgbaF32(_) => PixelEncoding::RgbaF32,
        }
    }

    /// Narrow the view to pixels `lo..hi`.
    pub fn view(self, lo: usize, hi: usize) -> RowView<'a> {
        map_pixels!(self, RowView => RowView, |p| &p[lo..hi])
    }

    pub fn get(&self, x: usize) -> Option<Color> {
        Some(match self {
            RowView::Gray8(p) => Color::Gray8(*p.get(x)?),
            RowView::Gray16(p) => Color::Gray16(*p.get(x)?),
            RowView::Rgba32(p) => Color::Rgba32(*p.get(x)?),
            RowView::Rgba64(p) => Color::Rgba64(*p.get(x)?),
            RowView::GrayF32(p) => Color::GrayF32(*p.get(x)?),
            RowView::RgbaF32(p) => Color::RgbaF32(*p.get(x)?),
        })
    }
}

impl RowSlice<'_> {
    pub fn width(&self) -> usize {
        self.as_view().width()
    }

    pub fn encoding(&self) -> PixelEncoding {
        self.as_view().encoding()
    }

    pub fn as_view(&self) -> RowView<'_> {
        map_pixels!(self, RowSlice => RowView, |p| &**p)
    }

    /// Narrow to pixels `lo..hi` of this span.
    pub fn slice(&mut self, lo: usize, hi: usize) -> RowSlice<'_> {
        map_pixels!(self, RowSlice => RowSlice, |p| &mut p[lo..hi])
    }

    pub fn get(&self, x: usize) -> Option<Color> {
        self.as_view().get(x)
    }

    /// # Panics
    ///
    /// If `x >= width`.
    pub fn set(&mut self, x: usize, color: Color) {
        match self {
            RowSlice::Gray8(p) => p[x] = color.to_gray8(),
            RowSlice::Gray16(p) => p[x] = color.to_gray16(),
            RowSlice::Rgba32(p) => p[x] = color.to_rgba32(),
            RowSlice::Rgba64(p) => p[x] = color.to_rgba64(),
            RowSlice::GrayF32(p) => p[x] = color.to_gray_f32(),
            RowSlice::RgbaF32(p) => p[x] = color.to_rgba_f32(),
        }
    }

    pub fn fill(&mut self, color: Color) {
        match self {
            RowSlice::Gray8(p) => p.fill(color.to_gray8()),
            RowSlice::Gray16(p) => p.fill(color.to_gray16()),
            RowSlice::Rgba32(p) => p.fill(color.to_rgba32()),
            RowSlice::Rgba64(p) => p.fill(color.to_rgba64()),
            RowSlice::GrayF32(p) => p.fill(color.to_gray_f32()),
            RowSlice::RgbaF32(p) => p.fill(color.to_rgba_f32()),
        }
    }

    /// Copy `min(self.width(), src.width())` pixels, converting as needed.
    /// Returns the number of pixels copied.
    pub fn copy_from(&mut self, src: RowView<'_>) -> usize {
        let n = self.width().min(src.width());
        let done = match (&mut *self, src) {
            (RowSlice::Gray8(d), RowView::Gray8(s)) => {
                d[..n].copy_from_slice(&s[..n]);
                true
            }
            (RowSlice::Gray16(d), RowView::Gray16(s)) => {
                d[..n].copy_from_slice(&s[..n]);
                true
            }
            (RowSlice::Rgba32(d), RowView::Rgba32(s)) => {
                d[..n].copy_from_slice(&s[..n]);
                true
            }
            (RowSlice::Rgba64(d), RowView::Rgba64(s)) => {
                d[..n].copy_from_slice(&s[..n]);
                true
            }
            (RowSlice::GrayF32(d), RowView::GrayF32(s)) => {
                d[..n].copy_from_slice(&s[..n]);
                true
            }
            (RowSlice::RgbaF32(d), RowView::RgbaF32(s)) => {
                d[..n].copy_from_slice(&s[..n]);
                true
            }
            // Scaler import
            (RowSlice::GrayF32(d), RowView::Gray8(s)) => {
                for (d, &s) in d[..n].iter_mut().zip(&s[..n]) {
                    *d = f32::from(s) / 255.0;
                }
                true
            }
            (RowSlice::RgbaF32(d), RowView::Rgba32(s)) => {
                for (d, &s) in d[..n].iter_mut().zip(&s[..n]) {
                    *d = Color::Rgba32(s).to_rgba_f32();
                }
                true
            }
            // Scaler export
            (RowSlice::Gray8(d), RowView::GrayF32(s)) => {
                for (d, &s) in d[..n].iter_mut().zip(&s[..n]) {
                    *d = crate::pixel::unit_to_u8(s);
                }
                true
            }
            (RowSlice::Rgba32(d), RowView::RgbaF32(s)) => {
                for (d, &s) in d[..n].iter_mut().zip(&s[..n]) {
                    *d = Color::RgbaF32(s).to_rgba32();
                }
                true
            }
            _ => false,
        };
        if !done {
            for x in 0..n {
                if let Some(c) = src.get(x) {
                    self.set(x, c);
                }
            }
        }
        n
    }
}
