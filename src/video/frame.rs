//! Display-ready video frame
//!
//! A borrowed view of the converter's destination buffer. The buffer is
//! reused for every converted frame, so a `DisplayFrame` borrows the engine
//! that produced it and must be consumed (uploaded or copied) before the
//! next `update()` or `seek_to()`.

use serde::{Deserialize, Serialize};

/// Packed pixel layout of the display buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// 3 bytes per pixel, R G B
    #[default]
    Rgb24,
    /// 4 bytes per pixel, R G B A
    Rgba,
    /// 4 bytes per pixel, B G R A
    Bgra,
}

impl OutputFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            OutputFormat::Rgb24 => 3,
            OutputFormat::Rgba | OutputFormat::Bgra => 4,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Rgb24 => write!(f, "rgb24"),
            OutputFormat::Rgba => write!(f, "rgba"),
            OutputFormat::Bgra => write!(f, "bgra"),
        }
    }
}

/// Read-only view of the converted frame
#[derive(Debug, Clone, Copy)]
pub struct DisplayFrame<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
    format: OutputFormat,
}

impl<'a> DisplayFrame<'a> {
    /// Wrap a packed pixel buffer.
    ///
    /// `stride` is the distance in bytes between the starts of two rows and
    /// may include padding past `width * bytes_per_pixel`.
    pub fn new(data: &'a [u8], width: u32, height: u32, stride: usize, format: OutputFormat) -> Self {
        debug_assert!(stride >= Self::row_bytes(width, format));
        debug_assert!(data.len() >= Self::min_len(width, height, stride, format));
        Self {
            data,
            width,
            height,
            stride,
            format,
        }
    }

    /// Bytes needed for a tightly packed frame (no row padding)
    pub fn expected_size(width: u32, height: u32, format: OutputFormat) -> usize {
        Self::row_bytes(width, format) * height as usize
    }

    fn row_bytes(width: u32, format: OutputFormat) -> usize {
        width as usize * format.bytes_per_pixel()
    }

    fn min_len(width: u32, height: u32, stride: usize, format: OutputFormat) -> usize {
        if height == 0 {
            0
        } else {
            stride * (height as usize - 1) + Self::row_bytes(width, format)
        }
    }

    /// The whole buffer including row padding
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row, including padding
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Pixel bytes of row `y` without padding
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + Self::row_bytes(self.width, self.format)]
    }

    /// Bytes of the pixel at (`x`, `y`)
    pub fn pixel(&self, x: u32, y: u32) -> &'a [u8] {
        let bpp = self.format.bytes_per_pixel();
        let start = x as usize * bpp;
        &self.row(y)[start..start + bpp]
    }

    /// Copy into a tightly packed buffer, dropping row padding
    pub fn to_packed(&self) -> Vec<u8> {
        let row_bytes = Self::row_bytes(self.width, self.format);
        if self.stride == row_bytes {
            return self.data[..Self::expected_size(self.width, self.height, self.format)].to_vec();
        }

        let mut output = Vec::with_capacity(Self::expected_size(self.width, self.height, self.format));
        for y in 0..self.height {
            output.extend_from_slice(self.row(y));
        }
        output
    }
}
