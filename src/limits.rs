use crate::error::StreamError;

/// Resource limits checked when a filter or codec is constructed.
///
/// All fields default to `None` (no limit).
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height) of a declared stream.
    pub max_pixels: Option<u64>,
    /// Maximum bytes a single filter may hold in row buffers.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// Check dimensions against limits. Returns Ok(()) or LimitExceeded error.
    pub fn check(&self, width: u32, height: u32) -> Result<(), StreamError> {
        if let Some(max_w) = self.max_width {
            if u64::from(width) > max_w {
                return Err(StreamError::LimitExceeded(format!(
                    "width {width} exceeds limit {max_w}"
                )));
            }
        }
        if let Some(max_h) = self.max_height {
            if u64::from(height) > max_h {
                return Err(StreamError::LimitExceeded(format!(
                    "height {height} exceeds limit {max_h}"
                )));
            }
        }
        if let Some(max_px) = self.max_pixels {
            let pixels = u64::from(width) * u64::from(height);
            if pixels > max_px {
                return Err(StreamError::LimitExceeded(format!(
                    "pixel count {pixels} exceeds limit {max_px}"
                )));
            }
        }
        Ok(())
    }

    /// Check that the row buffers a filter is about to allocate fit the memory limit.
    pub fn check_memory(&self, bytes: usize) -> Result<(), StreamError> {
        if let Some(max_mem) = self.max_memory_bytes {
            if bytes as u64 > max_mem {
                return Err(StreamError::LimitExceeded(format!(
                    "row buffers of {bytes} bytes exceed memory limit {max_mem}"
                )));
            }
        }
        Ok(())
    }
}

/// Reject empty streams up front, before any row is produced.
pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<(), StreamError> {
    if width == 0 || height == 0 {
        return Err(StreamError::InvalidDimensions { width, height });
    }
    Ok(())
}
