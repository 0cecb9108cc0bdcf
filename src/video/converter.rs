//! Frame converter
//!
//! Scales raw decoded frames (any chroma/luma layout) into a packed RGB
//! family format at the decoder's fixed dimensions. The destination frame is
//! allocated once and overwritten by every conversion.

use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame;
use ffmpeg_next::software::scaling;
use serde::{Deserialize, Serialize};

use super::{DisplayFrame, OutputFormat, RawFrame};

/// Interpolation used by the pixel-format conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScalingQuality {
    FastBilinear,
    #[default]
    Bilinear,
    Bicubic,
}

impl ScalingQuality {
    fn flags(self) -> scaling::Flags {
        match self {
            ScalingQuality::FastBilinear => scaling::Flags::FAST_BILINEAR,
            ScalingQuality::Bilinear => scaling::Flags::BILINEAR,
            ScalingQuality::Bicubic => scaling::Flags::BICUBIC,
        }
    }
}

fn output_pixel(format: OutputFormat) -> Pixel {
    match format {
        OutputFormat::Rgb24 => Pixel::RGB24,
        OutputFormat::Rgba => Pixel::RGBA,
        OutputFormat::Bgra => Pixel::BGRA,
    }
}

/// Converts raw frames into the persistent display buffer
pub struct FrameConverter {
    /// `None` until a frame with a known source format arrives
    scaler: Option<scaling::Context>,
    source_format: Pixel,
    output: frame::Video,
    output_format: OutputFormat,
    quality: ScalingQuality,
    width: u32,
    height: u32,
    /// Whether `output` holds a converted picture
    has_frame: bool,
}

impl FrameConverter {
    /// Allocate the destination buffer and, when the source format is
    /// already known, the scaling context
    pub fn new(
        source_format: Pixel,
        width: u32,
        height: u32,
        output_format: OutputFormat,
        quality: ScalingQuality,
    ) -> Result<Self, ffmpeg_next::Error> {
        let scaler = if source_format == Pixel::None {
            None
        } else {
            Some(Self::create_scaler(source_format, width, height, output_format, quality)?)
        };

        let output = frame::Video::new(output_pixel(output_format), width, height);

        Ok(Self {
            scaler,
            source_format,
            output,
            output_format,
            quality,
            width,
            height,
            has_frame: false,
        })
    }

    fn create_scaler(
        source_format: Pixel,
        width: u32,
        height: u32,
        output_format: OutputFormat,
        quality: ScalingQuality,
    ) -> Result<scaling::Context, ffmpeg_next::Error> {
        scaling::Context::get(
            source_format,
            width,
            height,
            output_pixel(output_format),
            width,
            height,
            quality.flags(),
        )
    }

    /// Convert `raw` into the display buffer and return a view of it
    ///
    /// The previous view is invalidated. A frame whose dimensions differ from
    /// the decoder's is a contract violation: debug builds panic, release
    /// builds log it and keep the previous contents.
    pub fn convert(&mut self, raw: &RawFrame) -> Option<DisplayFrame<'_>> {
        if raw.width() != self.width || raw.height() != self.height {
            tracing::error!(
                "Decoded frame is {}x{}, converter was sized for {}x{}",
                raw.width(),
                raw.height(),
                self.width,
                self.height
            );
            debug_assert_eq!(
                (raw.width(), raw.height()),
                (self.width, self.height),
                "decoded frame size changed mid-stream"
            );
            return self.display_frame();
        }

        // Recreate scaler if format changed
        if self.scaler.is_none() || raw.format() != self.source_format {
            match Self::create_scaler(raw.format(), self.width, self.height, self.output_format, self.quality) {
                Ok(scaler) => {
                    tracing::debug!("Scaler rebuilt for {:?} input", raw.format());
                    self.scaler = Some(scaler);
                    self.source_format = raw.format();
                }
                Err(e) => {
                    tracing::warn!("Cannot convert {:?} frames: {}", raw.format(), e);
                    return self.display_frame();
                }
            }
        }

        if let Some(scaler) = self.scaler.as_mut() {
            match scaler.run(raw.video(), &mut self.output) {
                Ok(()) => self.has_frame = true,
                Err(e) => tracing::warn!("Pixel conversion failed: {}", e),
            }
        }

        self.display_frame()
    }

    /// View of the last converted frame, `None` before the first conversion
    pub fn display_frame(&self) -> Option<DisplayFrame<'_>> {
        if !self.has_frame {
            return None;
        }
        Some(DisplayFrame::new(
            self.output.data(0),
            self.width,
            self.height,
            self.output.stride(0),
            self.output_format,
        ))
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Size of the destination buffer in bytes, fixed at construction
    pub fn buffer_len(&self) -> usize {
        self.output.data(0).len()
    }
}
