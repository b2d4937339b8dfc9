use rgb::Rgba;

/// In-memory pixel encoding of a row or stream.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelEncoding {
    /// Single channel, 8-bit grayscale.
    Gray8,
    /// Single channel, 16-bit grayscale (native endian).
    Gray16,
    /// 4 channels, 8-bit RGBA, straight alpha.
    Rgba32,
    /// 4 channels, 16-bit RGBA (native endian), straight alpha.
    Rgba64,
    /// Single channel, 32-bit float grayscale in [0.0, 1.0]. Scaler accumulation.
    GrayF32,
    /// 4 channels, 32-bit float RGBA in [0.0, 1.0]. Scaler accumulation.
    RgbaF32,
}

impl PixelEncoding {
    /// Bytes per pixel for this encoding.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Gray16 => 2,
            Self::Rgba32 => 4,
            Self::Rgba64 => 8,
            Self::GrayF32 => 4,
            Self::RgbaF32 => 16,
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        match self {
            Self::Gray8 | Self::Gray16 | Self::GrayF32 => 1,
            Self::Rgba32 | Self::Rgba64 | Self::RgbaF32 => 4,
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.channels() == 4
    }

    pub fn is_gray(&self) -> bool {
        self.channels() == 1
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::GrayF32 | Self::RgbaF32)
    }

    /// The float encoding the scaler accumulates this encoding in.
    pub fn accumulator(&self) -> PixelEncoding {
        if self.is_gray() {
            Self::GrayF32
        } else {
            Self::RgbaF32
        }
    }

    /// White point: full intensity, fully opaque.
    pub fn white(&self) -> Color {
        match self {
            Self::Gray8 => Color::Gray8(u8::MAX),
            Self::Gray16 => Color::Gray16(u16::MAX),
            Self::Rgba32 => Color::Rgba32(Rgba {
                r: u8::MAX,
                g: u8::MAX,
                b: u8::MAX,
                a: u8::MAX,
            }),
            Self::Rgba64 => Color::Rgba64(Rgba {
                r: u16::MAX,
                g: u16::MAX,
                b: u16::MAX,
                a: u16::MAX,
            }),
            Self::GrayF32 => Color::GrayF32(1.0),
            Self::RgbaF32 => Color::RgbaF32(Rgba {
                r: 1.0,
                g: 1.0,
                b: 1.0,
                a: 1.0,
            }),
        }
    }

    /// The zero value of the encoding.
    ///
    /// Fully transparent for RGBA encodings. Gray encodings carry no alpha,
    /// so their "transparent" color is black.
    pub fn transparent(&self) -> Color {
        match self {
            Self::Gray8 => Color::Gray8(0),
            Self::Gray16 => Color::Gray16(0),
            Self::Rgba32 => Color::Rgba32(Rgba { r: 0, g: 0, b: 0, a: 0 }),
            Self::Rgba64 => Color::Rgba64(Rgba { r: 0, g: 0, b: 0, a: 0 }),
            Self::GrayF32 => Color::GrayF32(0.0),
            Self::RgbaF32 => Color::RgbaF32(Rgba {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 0.0,
            }),
        }
    }
}

/// A single pixel value tagged with its encoding.
///
/// Conversions between encodings never fail. 8-bit values widen to 16 bits by
/// bit replication (`v * 257`) and narrow by truncation (`v >> 8`). Color to
/// gray uses the integer luminance weights `19595/38470/7471` (out of 65536).
/// Float channels are clamped to [0.0, 1.0] and rounded when quantized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Color {
    Gray8(u8),
    Gray16(u16),
    Rgba32(Rgba<u8>),
    Rgba64(Rgba<u16>),
    GrayF32(f32),
    RgbaF32(Rgba<f32>),
}

#[inline]
fn luma8(r: u8, g: u8, b: u8) -> u8 {
    ((19595 * u32::from(r) + 38470 * u32::from(g) + 7471 * u32::from(b) + 32768) >> 16) as u8
}

#[inline]
fn luma16(r: u16, g: u16, b: u16) -> u16 {
    ((19595 * u32::from(r) + 38470 * u32::from(g) + 7471 * u32::from(b) + 32768) >> 16) as u16
}

#[inline]
fn luma_unit(r: f32, g: f32, b: f32) -> f32 {
    (19595.0 * r + 38470.0 * g + 7471.0 * b) / 65536.0
}

#[inline]
pub(crate) fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

#[inline]
pub(crate) fn unit_to_u16(v: f32) -> u16 {
    (v.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16
}

#[inline]
fn u8_to_unit(v: u8) -> f32 {
    f32::from(v) / 255.0
}

#[inline]
fn u16_to_unit(v: u16) -> f32 {
    f32::from(v) / 65535.0
}

impl Color {
    pub fn encoding(&self) -> PixelEncoding {
        match self {
            Color::Gray8(_) => PixelEncoding::Gray8,
            Color::Gray16(_) => PixelEncoding::Gray16,
            Color::Rgba32(_) => PixelEncoding::Rgba32,
            Color::Rgba64(_) => PixelEncoding::Rgba64,
            Color::GrayF32(_) => PixelEncoding::GrayF32,
            Color::RgbaF32(_) => PixelEncoding::RgbaF32,
        }
    }

    /// Convert to another encoding.
    pub fn convert(self, encoding: PixelEncoding) -> Color {
        match encoding {
            PixelEncoding::Gray8 => Color::Gray8(self.to_gray8()),
            PixelEncoding::Gray16 => Color::Gray16(self.to_gray16()),
            PixelEncoding::Rgba32 => Color::Rgba32(self.to_rgba32()),
            PixelEncoding::Rgba64 => Color::Rgba64(self.to_rgba64()),
            PixelEncoding::GrayF32 => Color::GrayF32(self.to_gray_f32()),
            PixelEncoding::RgbaF32 => Color::RgbaF32(self.to_rgba_f32()),
        }
    }

    pub fn to_gray8(self) -> u8 {
        match self {
            Color::Gray8(v) => v,
            Color::Gray16(v) => (v >> 8) as u8,
            Color::Rgba32(p) => luma8(p.r, p.g, p.b),
            Color::Rgba64(p) => (luma16(p.r, p.g, p.b) >> 8) as u8,
            Color::GrayF32(v) => unit_to_u8(v),
            Color::RgbaF32(p) => unit_to_u8(luma_unit(p.r, p.g, p.b)),
        }
    }

    pub fn to_gray16(self) -> u16 {
        match self {
            Color::Gray8(v) => u16::from(v) * 257,
            Color::Gray16(v) => v,
            Color::Rgba32(p) => luma16(
                u16::from(p.r) * 257,
                u16::from(p.g) * 257,
                u16::from(p.b) * 257,
            ),
            Color::Rgba64(p) => luma16(p.r, p.g, p.b),
            Color::GrayF32(v) => unit_to_u16(v),
            Color::RgbaF32(p) => unit_to_u16(luma_unit(p.r, p.g, p.b)),
        }
    }

    pub fn to_rgba32(self) -> Rgba<u8> {
        match self {
            Color::Gray8(v) => Rgba {
                r: v,
                g: v,
                b: v,
                a: u8::MAX,
            },
            Color::Gray16(v) => {
                let v = (v >> 8) as u8;
                Rgba {
                    r: v,
                    g: v,
                    b: v,
                    a: u8::MAX,
                }
            }
            Color::Rgba32(p) => p,
            Color::Rgba64(p) => Rgba {
                r: (p.r >> 8) as u8,
                g: (p.g >> 8) as u8,
                b: (p.b >> 8) as u8,
                a: (p.a >> 8) as u8,
            },
            Color::GrayF32(v) => {
                let v = unit_to_u8(v);
                Rgba {
                    r: v,
                    g: v,
                    b: v,
                    a: u8::MAX,
                }
            }
            Color::RgbaF32(p) => Rgba {
                r: unit_to_u8(p.r),
                g: unit_to_u8(p.g),
                b: unit_to_u8(p.b),
                a: unit_to_u8(p.a),
            },
        }
    }

    pub fn to_rgba64(self) -> Rgba<u16> {
        match self {
            Color::Gray8(v) => {
                let v = u16::from(v) * 257;
                Rgba {
                    r: v,
                    g: v,
                    b: v,
                    a: u16::MAX,
                }
            }
            Color::Gray16(v) => Rgba {
                r: v,
                g: v,
                b: v,
                a: u16::MAX,
            },
            Color::Rgba32(p) => Rgba {
                r: u16::from(p.r) * 257,
                g: u16::from(p.g) * 257,
                b: u16::from(p.b) * 257,
                a: u16::from(p.a) * 257,
            },
            Color::Rgba64(p) => p,
            Color::GrayF32(v) => {
                let v = unit_to_u16(v);
                Rgba {
                    r: v,
                    g: v,
                    b: v,
                    a: u16::MAX,
                }
            }
            Color::RgbaF32(p) => Rgba {
                r: unit_to_u16(p.r),
                g: unit_to_u16(p.g),
                b: unit_to_u16(p.b),
                a: unit_to_u16(p.a),
            },
        }
    }

    pub fn to_gray_f32(self) -> f32 {
        match self {
            Color::Gray8(v) => u8_to_unit(v),
            Color::Gray16(v) => u16_to_unit(v),
            Color::Rgba32(p) => luma_unit(u8_to_unit(p.r), u8_to_unit(p.g), u8_to_unit(p.b)),
            Color::Rgba64(p) => luma_unit(u16_to_unit(p.r), u16_to_unit(p.g), u16_to_unit(p.b)),
            Color::GrayF32(v) => v,
            Color::RgbaF32(p) => luma_unit(p.r, p.g, p.b),
        }
    }

    pub fn to_rgba_f32(self) -> Rgba<f32> {
        match self {
            Color::Gray8(v) => {
                let v = u8_to_unit(v);
                Rgba {
                    r: v,
                    g: v,
                    b: v,
                    a: 1.0,
                }
            }
            Color::Gray16(v) => {
                let v = u16_to_unit(v);
                Rgba {
                    r: v,
                    g: v,
                    b: v,
                    a: 1.0,
                }
            }
            Color::Rgba32(p) => Rgba {
                r: u8_to_unit(p.r),
                g: u8_to_unit(p.g),
                b: u8_to_unit(p.b),
                a: u8_to_unit(p.a),
            },
            Color::Rgba64(p) => Rgba {
                r: u16_to_unit(p.r),
                g: u16_to_unit(p.g),
                b: u16_to_unit(p.b),
                a: u16_to_unit(p.a),
            },
            Color::GrayF32(v) => Rgba {
                r: v,
                g: v,
                b: v,
                a: 1.0,
            },
            Color::RgbaF32(p) => p,
        }
    }
}

impl From<u8> for Color {
    fn from(v: u8) -> Self {
        Color::Gray8(v)
    }
}

impl From<u16> for Color {
    fn from(v: u16) -> Self {
        Color::Gray16(v)
    }
}

impl From<Rgba<u8>> for Color {
    fn from(p: Rgba<u8>) -> Self {
        Color::Rgba32(p)
    }
}

impl From<Rgba<u16>> for Color {
    fn from(p: Rgba<u16>) -> Self {
        Color::Rgba64(p)
    }
}
