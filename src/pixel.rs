//! RGBA8 pixel buffers.

use rgb::{FromSlice, RGBA8};

use crate::CodecError;

/// A decoded image: tightly packed 8-bit RGBA pixels.
///
/// Every `Image` produced by this crate satisfies
/// `pixels.len() == width * height * 4`; the constructor rejects anything
/// else. Ownership transfers to the caller on return from decode and
/// preprocessing operations.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Image {
    /// Construct an image, validating the buffer length against the
    /// dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, CodecError> {
        let expected = u64::from(width) * u64::from(height) * 4;
        if pixels.len() as u64 != expected {
            return Err(CodecError::InvalidArguments(format!(
                "pixel buffer of {} bytes does not match {}x{} RGBA8 ({} bytes)",
                pixels.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes, row-major, no padding.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consume the image, returning the raw byte buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Typed view over the pixel bytes.
    pub fn as_rgba(&self) -> &[RGBA8] {
        self.pixels.as_rgba()
    }
}

impl core::fmt::Debug for Image {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}
