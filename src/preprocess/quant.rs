//! Palette quantization.
//!
//! Pure pass-through: all algorithmic work happens in the quantizer module;
//! this layer only marshals the buffer and options.

use serde::{Deserialize, Serialize};

use crate::engine::{CodecEngine, run_backend};
use crate::error::CodecError;
use crate::module::{ModuleKind, ModuleLink};
use crate::pixel::Image;

/// Quantization options.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuantOptions {
    pub max_num_colors: u32,
    pub dither: f32,
}

impl Default for QuantOptions {
    fn default() -> Self {
        Self {
            max_num_colors: 255,
            dither: 1.0,
        }
    }
}

pub(crate) async fn apply(
    engine: &CodecEngine,
    image: Image,
    options: &QuantOptions,
) -> Result<Image, CodecError> {
    let backend = engine
        .loader()
        .load(ModuleKind::Quant, ModuleLink::default())
        .await?
        .quantizer(ModuleKind::Quant)?;

    let QuantOptions {
        max_num_colors,
        dither,
    } = *options;
    let (width, height) = (image.width(), image.height());

    let pixels = run_backend(ModuleKind::Quant, move || {
        backend.quantize(image.pixels(), width, height, max_num_colors, dither)
    })
    .await?;

    Image::new(width, height, pixels)
}
